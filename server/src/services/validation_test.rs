use serde_json::json;

use super::*;

#[test]
fn normalize_email_lowercases_and_trims() {
    assert_eq!(normalize_email("  Ada@Example.COM ").unwrap(), "ada@example.com");
}

#[test]
fn normalize_email_rejects_malformed() {
    for bad in ["", "ada", "@example.com", "ada@", "a@b@c", "ada lovelace@example.com"] {
        assert!(normalize_email(bad).is_err(), "{bad:?} should be rejected");
    }
}

#[test]
fn password_length_bounds() {
    assert!(password("short").is_err());
    assert!(password("exactly8").is_ok());
    assert!(password(&"p".repeat(PASSWORD_MAX_LEN)).is_ok());
    let err = password(&"p".repeat(PASSWORD_MAX_LEN + 1)).unwrap_err();
    assert_eq!(err.to_string(), "password must be at most 128 characters");
}

#[test]
fn display_name_defaults_to_local_part() {
    assert_eq!(display_name(None, "ada@example.com").unwrap(), "ada");
    assert_eq!(display_name(Some("   "), "ada@example.com").unwrap(), "ada");
    assert_eq!(display_name(Some(" Ada L. "), "ada@example.com").unwrap(), "Ada L.");
}

#[test]
fn required_text_trims_and_names_field() {
    assert_eq!(required_text("title", "  Rome  ", 10).unwrap(), "Rome");
    assert_eq!(required_text("title", "   ", 10).unwrap_err().to_string(), "title is required");
    assert_eq!(
        required_text("title", "a very long title", 5).unwrap_err().to_string(),
        "title must be at most 5 characters"
    );
}

#[test]
fn required_text_counts_characters_not_bytes() {
    assert!(required_text("title", "ééééé", 5).is_ok());
}

#[test]
fn optional_text_blank_is_none() {
    assert_eq!(optional_text("description", Some("  "), 10).unwrap(), None);
    assert_eq!(optional_text("description", None, 10).unwrap(), None);
    assert_eq!(optional_text("description", Some(" hi "), 10).unwrap().as_deref(), Some("hi"));
}

#[test]
fn url_accepts_http_and_relative() {
    assert!(url("asset_url", "https://cdn.example/a.png").is_ok());
    assert!(url("asset_url", "/uploads/a.png").is_ok());
    assert!(url("asset_url", "javascript:alert(1)").is_err());
    assert!(url("asset_url", "").is_err());
}

#[test]
fn tags_dedupe_and_drop_blank() {
    let input = vec![" travel ".to_string(), "travel".to_string(), String::new(), "food".to_string()];
    assert_eq!(tags(&input).unwrap(), vec!["travel", "food"]);
}

#[test]
fn tags_limit_count() {
    let input: Vec<String> = (0..=MAX_TAGS).map(|i| format!("t{i}")).collect();
    assert!(tags(&input).is_err());
}

#[test]
fn geometry_accepts_valid_element() {
    assert!(geometry(0.0, 0.0, 10.0, 5.0, -180.0).is_ok());
    assert!(geometry(120.5, 80.25, 0.1, 0.1, 180.0).is_ok());
}

#[test]
fn geometry_rejects_out_of_range() {
    assert_eq!(geometry(-1.0, 0.0, 1.0, 1.0, 0.0).unwrap_err().to_string(), "x must be between 0 and 10000");
    assert_eq!(geometry(0.0, 0.0, 0.0, 1.0, 0.0).unwrap_err().to_string(), "width must be greater than 0");
    assert_eq!(
        geometry(0.0, 0.0, 1.0, 1.0, 181.0).unwrap_err().to_string(),
        "rotation must be between -180 and 180"
    );
    assert_eq!(
        geometry(f64::NAN, 0.0, 1.0, 1.0, 0.0).unwrap_err().to_string(),
        "x must be a finite number"
    );
}

#[test]
fn json_object_requires_object() {
    assert!(json_object("content", &json!({"text": "hi"})).is_ok());
    assert_eq!(
        json_object("style", &json!([1, 2])).unwrap_err().to_string(),
        "style must be a JSON object"
    );
}

#[test]
fn initial_pages_bounds() {
    assert!(initial_pages(0).is_err());
    assert_eq!(initial_pages(1).unwrap(), 1);
    assert!(initial_pages(MAX_INITIAL_PAGES + 1).is_err());
}
