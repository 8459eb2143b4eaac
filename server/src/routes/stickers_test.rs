use super::*;

#[test]
fn sticker_error_maps_duplicate_to_conflict() {
    let err = sticker_error(StickerError::DuplicateAsset);
    assert_eq!(err.status, StatusCode::CONFLICT);
    assert_eq!(err.message, "a sticker with this asset key already exists");
}

#[test]
fn sticker_error_maps_not_found() {
    assert_eq!(sticker_error(StickerError::NotFound(Uuid::nil())).status, StatusCode::NOT_FOUND);
}

#[test]
fn list_query_defaults_to_own_stickers() {
    let query: ListQuery = serde_json::from_str("{}").unwrap();
    assert!(!query.include_public);
}
