use serde_json::json;

use super::*;
use crate::element::ElementKind;

fn sticker(page_id: Uuid) -> PageElement {
    PageElement {
        id: None,
        page_id,
        kind: ElementKind::Sticker,
        x: 12.0,
        y: 30.0,
        width: 40.0,
        height: 40.0,
        rotation: -15.0,
        z_index: 3,
        content: json!({"src": "https://cdn.example/stickers/cat.png"}),
        style: json!({"opacity": 0.9}),
        metadata: None,
        sticker_id: Some(Uuid::new_v4()),
    }
}

#[test]
fn key_is_prefixed_with_page_id() {
    let page_id = Uuid::nil();
    assert_eq!(fallback_key(page_id), "unsaved_elements_00000000-0000-0000-0000-000000000000");
}

#[test]
fn memory_store_round_trips_entry() {
    let store = MemoryFallbackStore::new();
    let page_id = Uuid::new_v4();
    let elements = vec![sticker(page_id)];

    store.store(page_id, &elements).unwrap();
    let entry = store.load(page_id).unwrap().unwrap();
    assert_eq!(entry.page_id, page_id);
    assert_eq!(entry.elements, elements);
    assert!(entry.saved_at_ms > 0);
}

#[test]
fn memory_store_keeps_pages_apart_and_clears() {
    let store = MemoryFallbackStore::new();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    store.store(a, &[sticker(a)]).unwrap();
    store.store(b, &[sticker(b)]).unwrap();
    assert_eq!(store.len(), 2);

    store.clear(a).unwrap();
    assert!(store.load(a).unwrap().is_none());
    assert!(store.load(b).unwrap().is_some());

    // Clearing a missing entry is fine.
    store.clear(a).unwrap();
}

#[test]
fn store_overwrites_previous_entry() {
    let store = MemoryFallbackStore::new();
    let page_id = Uuid::new_v4();
    store.store(page_id, &[sticker(page_id), sticker(page_id)]).unwrap();
    store.store(page_id, &[sticker(page_id)]).unwrap();
    assert_eq!(store.load(page_id).unwrap().unwrap().elements.len(), 1);
}

#[test]
fn file_store_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let page_id = Uuid::new_v4();
    let elements = vec![sticker(page_id)];

    FileFallbackStore::open(dir.path())
        .unwrap()
        .store(page_id, &elements)
        .unwrap();

    let reopened = FileFallbackStore::open(dir.path()).unwrap();
    let entry = reopened.load(page_id).unwrap().unwrap();
    assert_eq!(entry.elements, elements);

    reopened.clear(page_id).unwrap();
    assert!(reopened.load(page_id).unwrap().is_none());
    reopened.clear(page_id).unwrap();
}

#[test]
fn file_store_creates_missing_directory() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("offline").join("pages");
    let store = FileFallbackStore::open(&nested).unwrap();
    assert!(nested.is_dir());
    assert!(store.load(Uuid::new_v4()).unwrap().is_none());
}

#[test]
fn file_store_reports_corrupt_entry() {
    let dir = tempfile::tempdir().unwrap();
    let page_id = Uuid::new_v4();
    let store = FileFallbackStore::open(dir.path()).unwrap();
    std::fs::write(dir.path().join(format!("{}.json", fallback_key(page_id))), "{not json").unwrap();
    assert!(matches!(store.load(page_id), Err(FallbackError::Json(_))));
}
