use super::*;
use axum::http::HeaderValue;
use axum::response::IntoResponse;

use crate::services::validation::ValidationError;

fn headers_with(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    headers
}

#[test]
fn bearer_token_extracts_value() {
    assert_eq!(bearer_token(&headers_with("Bearer abc.def.ghi")), Some("abc.def.ghi"));
}

#[test]
fn bearer_token_scheme_is_case_insensitive() {
    assert_eq!(bearer_token(&headers_with("bearer tok")), Some("tok"));
}

#[test]
fn bearer_token_rejects_other_schemes() {
    assert_eq!(bearer_token(&headers_with("Basic dXNlcjpwYXNz")), None);
    assert_eq!(bearer_token(&headers_with("Bearer ")), None);
    assert_eq!(bearer_token(&headers_with("tok")), None);
    assert_eq!(bearer_token(&HeaderMap::new()), None);
}

#[test]
fn auth_error_maps_client_errors() {
    assert_eq!(auth_error(AuthError::EmailTaken).status, StatusCode::CONFLICT);
    assert_eq!(auth_error(AuthError::InvalidCredentials).status, StatusCode::UNAUTHORIZED);
    assert_eq!(auth_error(AuthError::InvalidToken).status, StatusCode::UNAUTHORIZED);
    assert_eq!(auth_error(AuthError::Revoked).status, StatusCode::UNAUTHORIZED);
    assert_eq!(auth_error(AuthError::UserNotFound).status, StatusCode::NOT_FOUND);

    let invalid = auth_error(AuthError::Validation(ValidationError::new("email is invalid")));
    assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    assert_eq!(invalid.message, "email is invalid");
}

#[test]
fn auth_error_hides_internal_detail() {
    let err = auth_error(AuthError::Hash("salt exploded".into()));
    assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!err.message.contains("salt"));
}

#[test]
fn throttled_login_sets_retry_after() {
    let err: ApiError = LoginThrottled { retry_after_secs: 30 }.into();
    assert_eq!(err.status, StatusCode::TOO_MANY_REQUESTS);
    let response = err.into_response();
    assert_eq!(response.headers().get("retry-after").unwrap(), "30");
}
