//! Undo/redo history over whole-page element snapshots.
//!
//! DESIGN
//! ======
//! Every recorded action pairs a "before" and an "after" snapshot of all
//! elements on the page, so undo and redo are plain restorations rather
//! than inverse operations. Two bounded deques hold the timeline: the undo
//! stack evicts its oldest entry once it grows past `max_size`, and any new
//! action clears the redo stack because it starts a new branch.
//!
//! Continuous gestures (drag, resize, rotate) go through `push_debounced`,
//! which parks the push on a cancellable timer so the gesture produces one
//! undo step instead of dozens. Undo and redo commit a pending gesture
//! before touching the stacks, so a late timer never lands on top of an
//! undo and wipes the redo branch.
//!
//! ERROR HANDLING
//! ==============
//! A failed restoration puts the popped action back where it came from and
//! reports `false`. The stacks and the live collection are never left
//! half-applied.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, error};
use uuid::Uuid;

use crate::config::HistoryConfig;
use crate::element::ElementSnapshot;

// =============================================================================
// TYPES
// =============================================================================

/// Captures and restores the live element collection.
pub trait SnapshotSource: Send + Sync {
    /// Deep copy of the current state.
    fn capture(&self) -> ElementSnapshot;

    /// Replace the live state with `snapshot`.
    ///
    /// # Errors
    ///
    /// Returns a [`RestoreError`] when the snapshot cannot be applied. The
    /// live state must be unchanged in that case.
    fn restore(&self, snapshot: &ElementSnapshot) -> Result<(), RestoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RestoreError {
    #[error("snapshot element belongs to page {found}, expected {expected}")]
    ForeignPage { expected: Uuid, found: Uuid },
    #[error("snapshot element {index} has invalid geometry")]
    InvalidGeometry { index: usize },
    #[error("restore rejected: {0}")]
    Rejected(String),
}

/// One undoable step.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryAction {
    id: Uuid,
    description: String,
    before: ElementSnapshot,
    after: ElementSnapshot,
}

impl HistoryAction {
    fn new(description: String, before: ElementSnapshot, after: ElementSnapshot) -> Self {
        Self { id: Uuid::new_v4(), description, before, after }
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn before(&self) -> &ElementSnapshot {
        &self.before
    }

    #[must_use]
    pub fn after(&self) -> &ElementSnapshot {
        &self.after
    }
}

/// A debounced push waiting for its timer.
struct PendingPush {
    seq: u64,
    description: String,
    before: ElementSnapshot,
    timer: JoinHandle<()>,
}

#[derive(Default)]
struct HistoryInner {
    undo: VecDeque<HistoryAction>,
    redo: VecDeque<HistoryAction>,
    pending: Option<PendingPush>,
    next_seq: u64,
}

// =============================================================================
// HISTORY
// =============================================================================

/// Undo/redo engine for one editor session. Cloning yields another handle
/// to the same stacks.
#[derive(Clone)]
pub struct History {
    inner: Arc<Mutex<HistoryInner>>,
    source: Arc<dyn SnapshotSource>,
    config: HistoryConfig,
}

impl History {
    #[must_use]
    pub fn new(source: Arc<dyn SnapshotSource>, config: HistoryConfig) -> Self {
        Self { inner: Arc::new(Mutex::new(HistoryInner::default())), source, config }
    }

    /// Snapshot of the live state, to be passed back as `before`.
    #[must_use]
    pub fn capture(&self) -> ElementSnapshot {
        self.source.capture()
    }

    /// Record an action whose "after" is the current live state.
    ///
    /// Returns `false` without touching either stack when nothing changed.
    pub fn push(&self, description: impl Into<String>, before: ElementSnapshot) -> bool {
        let after = self.source.capture();
        if after == before {
            debug!("history push skipped; state unchanged");
            return false;
        }

        let action = HistoryAction::new(description.into(), before, after);
        let mut inner = self.lock();
        inner.undo.push_back(action);
        inner.redo.clear();
        while inner.undo.len() > self.config.max_size {
            inner.undo.pop_front();
        }
        true
    }

    /// Like [`History::push`], deferred by the configured debounce window.
    /// A later call inside the window cancels and replaces this one.
    pub fn push_debounced(&self, description: impl Into<String>, before: ElementSnapshot) {
        let this = self.clone();
        let delay = self.config.debounce;

        let mut inner = self.lock();
        if let Some(previous) = inner.pending.take() {
            previous.timer.abort();
        }
        inner.next_seq += 1;
        let seq = inner.next_seq;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.fire_pending(seq);
        });
        inner.pending = Some(PendingPush { seq, description: description.into(), before, timer });
    }

    /// Commit a pending debounced push now instead of when its timer fires.
    ///
    /// Returns whether an action was recorded.
    pub fn flush_pending(&self) -> bool {
        let Some(pending) = self.lock().pending.take() else {
            return false;
        };
        pending.timer.abort();
        debug!(description = %pending.description, "debounced push flushed");
        self.push(pending.description, pending.before)
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.lock().pending.is_some()
    }

    fn fire_pending(&self, seq: u64) {
        let pending = {
            let mut inner = self.lock();
            let current = inner.pending.as_ref().is_some_and(|p| p.seq == seq);
            if current { inner.pending.take() } else { None }
        };
        if let Some(pending) = pending {
            self.push(pending.description, pending.before);
        }
    }

    /// Restore the newest action's "before" state. A pending debounced push
    /// is committed first so the gesture it covers is what gets undone.
    pub fn undo(&self) -> bool {
        self.flush_pending();
        let mut inner = self.lock();
        let Some(action) = inner.undo.pop_back() else {
            return false;
        };

        match self.source.restore(action.before()) {
            Ok(()) => {
                debug!(description = action.description(), "undo applied");
                inner.redo.push_back(action);
                true
            }
            Err(e) => {
                error!(error = %e, description = action.description(), "undo failed; history rolled back");
                inner.undo.push_back(action);
                false
            }
        }
    }

    /// Re-apply the most recently undone action's "after" state. A pending
    /// debounced push is committed first; being a new action, it clears
    /// the redo stack.
    pub fn redo(&self) -> bool {
        self.flush_pending();
        let mut inner = self.lock();
        let Some(action) = inner.redo.pop_back() else {
            return false;
        };

        match self.source.restore(action.after()) {
            Ok(()) => {
                debug!(description = action.description(), "redo applied");
                inner.undo.push_back(action);
                true
            }
            Err(e) => {
                error!(error = %e, description = action.description(), "redo failed; history rolled back");
                inner.redo.push_back(action);
                false
            }
        }
    }

    /// Drop both stacks and cancel any pending debounced push.
    pub fn clear(&self) {
        let mut inner = self.lock();
        if let Some(pending) = inner.pending.take() {
            pending.timer.abort();
        }
        inner.undo.clear();
        inner.redo.clear();
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.lock().undo.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.lock().redo.is_empty()
    }

    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.lock().undo.len()
    }

    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.lock().redo.len()
    }

    /// Description of the action `undo` would revert.
    #[must_use]
    pub fn undo_description(&self) -> Option<String> {
        self.lock()
            .undo
            .back()
            .map(|action| action.description().to_owned())
    }

    /// Description of the action `redo` would re-apply.
    #[must_use]
    pub fn redo_description(&self) -> Option<String> {
        self.lock()
            .redo
            .back()
            .map(|action| action.description().to_owned())
    }

    /// Undo stack, oldest first.
    #[must_use]
    pub fn undo_actions(&self) -> Vec<HistoryAction> {
        self.lock().undo.iter().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, HistoryInner> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
