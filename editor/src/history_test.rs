use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde_json::json;

use super::*;
use crate::element::{ElementKind, PageElement};
use crate::store::ElementStore;

fn element(page_id: Uuid, x: f64) -> PageElement {
    PageElement {
        id: Some(Uuid::new_v4()),
        page_id,
        kind: ElementKind::Emoji,
        x,
        y: 0.0,
        width: 10.0,
        height: 10.0,
        rotation: 0.0,
        z_index: 0,
        content: json!({"emoji": "🌻"}),
        style: json!({}),
        metadata: None,
        sticker_id: None,
    }
}

fn history_with(max_size: usize) -> (History, ElementStore) {
    let store = ElementStore::new(Uuid::new_v4());
    let history = History::new(
        Arc::new(store.clone()),
        HistoryConfig { max_size, debounce: Duration::from_millis(100) },
    );
    (history, store)
}

/// Add one element and record the change.
fn add_step(history: &History, store: &ElementStore, label: &str) {
    let before = history.capture();
    let page_id = store.page_id();
    #[allow(clippy::cast_precision_loss)]
    let x = store.len() as f64;
    store.mutate(|elements| elements.push(element(page_id, x)));
    assert!(history.push(label, before));
}

/// Source whose restore can be made to fail on demand.
struct FlakySource {
    store: ElementStore,
    fail: AtomicBool,
}

impl SnapshotSource for FlakySource {
    fn capture(&self) -> ElementSnapshot {
        self.store.capture()
    }

    fn restore(&self, snapshot: &ElementSnapshot) -> Result<(), RestoreError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RestoreError::Rejected("corrupt snapshot".into()));
        }
        self.store.restore(snapshot)
    }
}

// =============================================================================
// push
// =============================================================================

#[test]
fn push_records_action_with_before_and_after() {
    let (history, store) = history_with(50);
    let before = history.capture();
    add_step(&history, &store, "add emoji");

    let actions = history.undo_actions();
    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].description(), "add emoji");
    assert_eq!(actions[0].before(), &before);
    assert_eq!(actions[0].after(), &store.capture());
}

#[test]
fn push_without_change_is_skipped() {
    let (history, store) = history_with(50);
    add_step(&history, &store, "first");
    history.undo();
    assert_eq!(history.redo_len(), 1);

    let before = history.capture();
    assert!(!history.push("noop", before));
    assert_eq!(history.undo_len(), 0);
    assert_eq!(history.redo_len(), 1, "skipped push must not clear redo");
}

#[test]
fn push_compares_structurally_not_by_identity() {
    let (history, store) = history_with(50);
    add_step(&history, &store, "first");
    let before = ElementSnapshot::new(store.elements());
    assert!(!history.push("same content", before));
    assert_eq!(history.undo_len(), 1);
}

#[test]
fn undo_stack_evicts_oldest_beyond_max() {
    let (history, store) = history_with(3);
    for i in 0..7 {
        add_step(&history, &store, &format!("step {i}"));
        assert!(history.undo_len() <= 3);
    }
    let descriptions: Vec<String> = history
        .undo_actions()
        .iter()
        .map(|a| a.description().to_owned())
        .collect();
    assert_eq!(descriptions, vec!["step 4", "step 5", "step 6"]);
}

#[test]
fn push_after_undo_clears_redo() {
    let (history, store) = history_with(50);
    add_step(&history, &store, "a");
    add_step(&history, &store, "b");
    add_step(&history, &store, "c");
    assert!(history.undo());
    assert!(history.undo());
    assert_eq!(history.redo_len(), 2);

    add_step(&history, &store, "branch");
    assert_eq!(history.redo_len(), 0);
    assert!(!history.can_redo());
    assert_eq!(history.undo_description().as_deref(), Some("branch"));
}

// =============================================================================
// undo / redo
// =============================================================================

#[test]
fn undo_restores_before_state() {
    let (history, store) = history_with(50);
    let initial = store.capture();
    add_step(&history, &store, "add");
    assert!(history.undo());
    assert_eq!(store.capture(), initial);
    assert_eq!(history.redo_description().as_deref(), Some("add"));
}

#[test]
fn undo_then_redo_is_identity() {
    let (history, store) = history_with(50);
    add_step(&history, &store, "a");
    add_step(&history, &store, "b");
    let current = store.capture();

    assert!(history.undo());
    assert_ne!(store.capture(), current);
    assert!(history.redo());
    assert_eq!(store.capture(), current);
    assert_eq!(history.undo_len(), 2);
    assert_eq!(history.redo_len(), 0);
}

#[test]
fn undo_and_redo_on_empty_stacks_return_false() {
    let (history, _store) = history_with(50);
    assert!(!history.undo());
    assert!(!history.redo());
    assert!(!history.can_undo());
}

#[test]
fn failed_undo_puts_action_back() {
    let store = ElementStore::new(Uuid::new_v4());
    let source = Arc::new(FlakySource { store: store.clone(), fail: AtomicBool::new(false) });
    let history = History::new(source.clone(), HistoryConfig::default());
    add_step(&history, &store, "add");
    let live = store.capture();

    source.fail.store(true, Ordering::SeqCst);
    assert!(!history.undo());
    assert_eq!(history.undo_len(), 1);
    assert_eq!(history.redo_len(), 0);
    assert_eq!(store.capture(), live);

    source.fail.store(false, Ordering::SeqCst);
    assert!(history.undo());
}

#[test]
fn failed_redo_puts_action_back() {
    let store = ElementStore::new(Uuid::new_v4());
    let source = Arc::new(FlakySource { store: store.clone(), fail: AtomicBool::new(false) });
    let history = History::new(source.clone(), HistoryConfig::default());
    add_step(&history, &store, "add");
    assert!(history.undo());

    source.fail.store(true, Ordering::SeqCst);
    assert!(!history.redo());
    assert_eq!(history.redo_len(), 1);
    assert_eq!(history.undo_len(), 0);
}

#[test]
fn clear_empties_both_stacks() {
    let (history, store) = history_with(50);
    add_step(&history, &store, "a");
    add_step(&history, &store, "b");
    history.undo();
    history.clear();
    assert_eq!(history.undo_len(), 0);
    assert_eq!(history.redo_len(), 0);
}

// =============================================================================
// push_debounced
// =============================================================================

#[tokio::test(start_paused = true)]
async fn debounced_push_fires_after_window() {
    let (history, store) = history_with(50);
    let before = history.capture();
    let page_id = store.page_id();
    store.mutate(|elements| elements.push(element(page_id, 1.0)));
    history.push_debounced("drag", before);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(history.undo_len(), 0);

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(history.undo_len(), 1);
    assert_eq!(history.undo_description().as_deref(), Some("drag"));
}

#[tokio::test(start_paused = true)]
async fn debounced_push_last_call_wins() {
    let (history, store) = history_with(50);
    let page_id = store.page_id();
    store.mutate(|elements| elements.push(element(page_id, 0.0)));

    for step in 1..=5 {
        let before = history.capture();
        store.mutate(|elements| elements[0].x = f64::from(step));
        history.push_debounced(format!("move {step}"), before);
        tokio::time::sleep(Duration::from_millis(30)).await;
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(history.undo_len(), 1);
    assert_eq!(history.undo_description().as_deref(), Some("move 5"));
}

#[tokio::test(start_paused = true)]
async fn clear_cancels_pending_debounced_push() {
    let (history, store) = history_with(50);
    let before = history.capture();
    let page_id = store.page_id();
    store.mutate(|elements| elements.push(element(page_id, 1.0)));
    history.push_debounced("resize", before);
    history.clear();

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(history.undo_len(), 0);
}

#[tokio::test(start_paused = true)]
async fn undo_inside_window_undoes_the_pending_gesture() {
    let (history, store) = history_with(50);
    add_step(&history, &store, "add 1");
    add_step(&history, &store, "add 2");
    assert!(history.undo());
    assert_eq!(history.redo_len(), 1);

    let before = history.capture();
    store.mutate(|elements| elements[0].x = 42.0);
    history.push_debounced("drag", before.clone());
    assert!(history.has_pending());

    // The gesture is committed first, so redo now starts from it.
    assert!(history.undo());
    assert!(!history.has_pending());
    assert_eq!(history.capture(), before);
    assert_eq!(history.redo_description().as_deref(), Some("drag"));

    tokio::time::sleep(Duration::from_millis(500)).await;
    let descriptions: Vec<_> = history
        .undo_actions()
        .iter()
        .map(|action| action.description().to_owned())
        .collect();
    assert_eq!(descriptions, ["add 1"]);
    assert_eq!(history.redo_len(), 1);
}

#[tokio::test(start_paused = true)]
async fn late_timer_does_not_clear_redo_after_undo() {
    let (history, store) = history_with(50);
    add_step(&history, &store, "add");
    let before = history.capture();
    store.mutate(|elements| elements[0].x = 7.0);
    history.push_debounced("drag", before);

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert!(history.undo());
    assert!(history.undo());
    assert_eq!(history.redo_len(), 2);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(history.redo_len(), 2);
    assert_eq!(history.undo_len(), 0);
    assert!(history.redo());
    assert_eq!(history.redo_description().as_deref(), Some("drag"));
}

#[tokio::test(start_paused = true)]
async fn flush_pending_without_change_records_nothing() {
    let (history, _store) = history_with(50);
    let before = history.capture();
    history.push_debounced("nudge", before);

    assert!(!history.flush_pending());
    assert!(!history.flush_pending());
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(history.undo_len(), 0);
}
