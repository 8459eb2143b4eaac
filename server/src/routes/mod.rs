//! Router assembly and shared HTTP plumbing.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds every REST endpoint under one Axum router. Handlers
//! translate between HTTP and the service layer; ownership checks and
//! persistence live in `services`.
//!
//! ERROR HANDLING
//! ==============
//! Every failure leaves as `ApiError`, rendered as `{"error": message}` with
//! a matching status. Internal errors are logged with their cause and
//! answered with a generic message. Malformed JSON bodies are rejected with
//! 400 through `JsonBody` instead of axum's plain-text rejection.

pub mod audit;
pub mod auth;
pub mod elements;
pub mod notebooks;
pub mod pages;
pub mod stickers;

use std::fmt::Display;

use axum::Router;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::http::header::RETRY_AFTER;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, patch, post};
use serde::de::DeserializeOwned;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::services::validation::ValidationError;
use crate::state::AppState;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub retry_after_secs: Option<u64>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into(), retry_after_secs: None }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Log `err` and hide it from the client.
    pub fn internal(err: impl Display) -> Self {
        tracing::error!(error = %err, "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self::bad_request(err.0)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.message }));
        match self.retry_after_secs {
            Some(secs) => (self.status, [(RETRY_AFTER, secs.to_string())], body).into_response(),
            None => (self.status, body).into_response(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// JSON BODY EXTRACTOR
// =============================================================================

/// `Json<T>` whose rejection is an [`ApiError`].
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::new(rejection.status(), rejection.body_text())),
        }
    }
}

// =============================================================================
// ROUTER
// =============================================================================

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/notebooks", get(notebooks::list).post(notebooks::create))
        .route(
            "/api/notebooks/{id}",
            get(notebooks::get_one)
                .patch(notebooks::update)
                .delete(notebooks::delete),
        )
        .route("/api/notebooks/{id}/archive", post(notebooks::archive))
        .route("/api/notebooks/{id}/restore", post(notebooks::restore))
        .route("/api/notebooks/{id}/pages", get(pages::list).post(pages::append))
        .route(
            "/api/pages/{id}",
            get(pages::get_one).patch(pages::update).delete(pages::delete),
        )
        .route(
            "/api/pages/{id}/elements",
            get(elements::list)
                .post(elements::create)
                .put(elements::replace),
        )
        .route(
            "/api/elements/{id}",
            get(elements::get_one)
                .patch(elements::update)
                .delete(elements::delete),
        )
        .route("/api/elements/{id}/restore", post(elements::restore))
        .route("/api/stickers", get(stickers::list).post(stickers::create))
        .route(
            "/api/stickers/{id}",
            patch(stickers::update).delete(stickers::delete),
        )
        .route("/api/stickers/{id}/use", post(stickers::use_one))
        .route("/api/audit", get(audit::list))
        .route("/healthz", get(healthz))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
