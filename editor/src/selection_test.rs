use serde_json::json;

use super::*;
use crate::element::ElementKind;

fn shape_with_id(id: Uuid) -> PageElement {
    PageElement {
        id: Some(id),
        page_id: Uuid::nil(),
        kind: ElementKind::Shape,
        x: 0.0,
        y: 0.0,
        width: 5.0,
        height: 5.0,
        rotation: 0.0,
        z_index: 0,
        content: json!({"shape": "rect"}),
        style: json!({}),
        metadata: None,
        sticker_id: None,
    }
}

#[test]
fn add_never_duplicates() {
    let id = Uuid::new_v4();
    let mut selection = Selection::new();
    assert!(selection.add(id));
    assert!(!selection.add(id));
    assert_eq!(selection.len(), 1);
}

#[test]
fn toggle_flips_membership_completely() {
    let id = Uuid::new_v4();
    let mut selection = Selection::new();
    selection.add(id);
    selection.add(id);
    assert!(!selection.toggle(id));
    assert!(!selection.contains(id));
    assert!(selection.is_empty());
    assert!(selection.toggle(id));
    assert!(selection.contains(id));
}

#[test]
fn select_only_replaces_everything() {
    let mut selection: Selection = (0..3).map(|_| Uuid::new_v4()).collect();
    let only = Uuid::new_v4();
    selection.select_only(only);
    assert_eq!(selection.ids(), &[only]);
}

#[test]
fn collect_dedupes_and_keeps_order() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let selection: Selection = [a, b, a, b, a].into_iter().collect();
    assert_eq!(selection.ids(), &[a, b]);
    assert_eq!(selection.anchor(), Some(a));
}

#[test]
fn remove_reports_membership() {
    let a = Uuid::new_v4();
    let mut selection = Selection::new();
    assert!(!selection.remove(a));
    selection.add(a);
    assert!(selection.remove(a));
}

#[test]
fn retain_existing_prunes_vanished_elements() {
    let kept = Uuid::new_v4();
    let gone = Uuid::new_v4();
    let mut selection: Selection = [kept, gone].into_iter().collect();
    selection.retain_existing(&[shape_with_id(kept)]);
    assert_eq!(selection.ids(), &[kept]);
}
