use super::*;

fn parse_flag(raw: &str) -> Option<bool> {
    match raw {
        "on" => Some(true),
        "off" => Some(false),
        _ => None,
    }
}

#[test]
fn decode_text_accepts_known_values() {
    assert!(decode_text("on", parse_flag).unwrap());
    assert!(!decode_text("off", parse_flag).unwrap());
}

#[test]
fn decode_text_reports_unexpected_value() {
    let err = decode_text("maybe", parse_flag).unwrap_err();
    assert!(matches!(err, sqlx::Error::Decode(_)));
    assert!(err.to_string().contains("maybe"));
}

#[test]
fn non_database_errors_are_not_constraint_violations() {
    let err = sqlx::Error::RowNotFound;
    assert!(!is_unique_violation(&err));
    assert!(!is_foreign_key_violation(&err));
}
