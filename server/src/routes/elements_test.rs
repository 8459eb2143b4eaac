use super::*;
use crate::services::validation::ValidationError;

#[test]
fn element_error_maps_statuses() {
    assert_eq!(element_error(ElementError::PageNotFound(Uuid::nil())).status, StatusCode::NOT_FOUND);
    assert_eq!(element_error(ElementError::NotFound(Uuid::nil())).status, StatusCode::NOT_FOUND);
    assert_eq!(element_error(ElementError::UnknownSticker).status, StatusCode::BAD_REQUEST);
    assert_eq!(
        element_error(ElementError::Database(sqlx::Error::PoolTimedOut)).status,
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn element_error_keeps_validation_message() {
    let err = element_error(ElementError::Validation(ValidationError::new("elements[2]: width must be positive")));
    assert_eq!(err.status, StatusCode::BAD_REQUEST);
    assert_eq!(err.message, "elements[2]: width must be positive");
}

#[test]
fn replace_body_parses_autosave_payload() {
    let body: ReplaceBody = serde_json::from_str(
        r#"{"elements":[{"id":"6f1c3a4e-2a0b-4a53-9a55-0d7f4c1e8b21","page_id":"ignored","type":"text",
            "x":10,"y":20,"width":50,"height":10,"rotation":0,"z_index":1,
            "content":{"text":"hi"},"style":{"font_size":16}}]}"#,
    )
    .unwrap();
    assert_eq!(body.elements.len(), 1);
    assert_eq!(body.elements[0].element_type, "text");
}

#[test]
fn replace_body_requires_elements_key() {
    assert!(serde_json::from_str::<ReplaceBody>("{}").is_err());
}
