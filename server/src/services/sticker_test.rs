use super::*;
#[cfg(feature = "live-db-tests")]
use crate::state::test_helpers::{integration_pool, seed_user};

fn sample() -> NewSticker {
    NewSticker {
        name: " Cactus ".into(),
        asset_url: "https://cdn.example/stickers/cactus.png".into(),
        asset_key: "stickers/cactus.png".into(),
        thumbnail_url: Some("  ".into()),
        tags: vec!["plant".into(), " plant ".into(), "desert".into()],
        is_public: false,
    }
}

#[test]
fn new_sticker_is_normalized() {
    let valid = sample().validate().unwrap();
    assert_eq!(valid.name, "Cactus");
    assert_eq!(valid.thumbnail_url, None);
    assert_eq!(valid.tags, vec!["plant", "desert"]);
}

#[test]
fn new_sticker_requires_fields() {
    let mut missing_key = sample();
    missing_key.asset_key = String::new();
    assert_eq!(missing_key.validate().unwrap_err().to_string(), "asset_key is required");

    let mut bad_url = sample();
    bad_url.asset_url = "ftp://example/cactus.png".into();
    assert!(bad_url.validate().is_err());
}

#[test]
fn new_sticker_body_defaults() {
    let body: NewSticker = serde_json::from_str(
        r#"{"name":"Star","asset_url":"/uploads/star.png","asset_key":"star"}"#,
    )
    .unwrap();
    assert!(body.tags.is_empty());
    assert!(!body.is_public);
}

#[test]
fn patch_validates_only_present_fields() {
    let patch = StickerPatch { is_public: Some(true), ..StickerPatch::default() };
    let valid = patch.validate().unwrap();
    assert_eq!(valid.name, None);
    assert_eq!(valid.is_public, Some(true));

    let blank = StickerPatch { name: Some("  ".into()), ..StickerPatch::default() };
    assert!(blank.validate().is_err());
}

#[test]
fn duplicate_asset_message() {
    assert_eq!(
        StickerError::DuplicateAsset.to_string(),
        "a sticker with this asset key already exists"
    );
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn sticker_library_round_trip() {
    let pool = integration_pool().await;
    let owner = seed_user(&pool).await;
    let other = seed_user(&pool).await;

    let created = create_sticker(&pool, owner, &sample().validate().unwrap()).await.unwrap();
    assert!(matches!(
        create_sticker(&pool, owner, &sample().validate().unwrap()).await,
        Err(StickerError::DuplicateAsset)
    ));

    assert!(list_stickers(&pool, other, true).await.unwrap().iter().all(|s| s.id != created.id));
    assert!(matches!(use_sticker(&pool, other, created.id).await, Err(StickerError::NotFound(_))));

    let patch = StickerPatch { is_public: Some(true), ..StickerPatch::default() };
    update_sticker(&pool, owner, created.id, &patch).await.unwrap();
    let used = use_sticker(&pool, other, created.id).await.unwrap();
    assert_eq!(used.usage_count, 1);
    assert!(list_stickers(&pool, other, true).await.unwrap().iter().any(|s| s.id == created.id));
    assert!(list_stickers(&pool, other, false).await.unwrap().iter().all(|s| s.id != created.id));

    assert!(matches!(delete_sticker(&pool, other, created.id).await, Err(StickerError::NotFound(_))));
    delete_sticker(&pool, owner, created.id).await.unwrap();
}
