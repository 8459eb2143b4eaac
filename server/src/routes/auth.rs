//! Auth routes: registration, password login, logout, current user.

use axum::extract::{FromRef, FromRequestParts, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rate_limit::LoginThrottled;
use crate::routes::{ApiError, ApiResult, JsonBody};
use crate::services::audit::AuditEvent;
use crate::services::auth::{self as auth_svc, AuthError, Claims, RegisterInput, UserRow};
use crate::services::validation;
use crate::state::AppState;

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated caller, taken from `Authorization: Bearer <jwt>`.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub user_id: Uuid,
    pub claims: Claims,
    pub token: String,
}

pub(crate) fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let raw = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = raw.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(&parts.headers) else {
            return Err(ApiError::unauthorized("missing bearer token"));
        };

        let app_state = AppState::from_ref(state);
        let claims = app_state.jwt.verify(token).map_err(auth_error)?;
        if auth_svc::is_revoked(&app_state.pool, token)
            .await
            .map_err(auth_error)?
        {
            return Err(auth_error(AuthError::Revoked));
        }

        Ok(Self { user_id: claims.sub, claims, token: token.to_owned() })
    }
}

pub(crate) fn auth_error(err: AuthError) -> ApiError {
    match err {
        AuthError::Validation(e) => e.into(),
        AuthError::EmailTaken => ApiError::new(StatusCode::CONFLICT, err.to_string()),
        AuthError::InvalidCredentials | AuthError::InvalidToken | AuthError::Revoked => {
            ApiError::unauthorized(err.to_string())
        }
        AuthError::UserNotFound => ApiError::not_found(err.to_string()),
        AuthError::Hash(_) | AuthError::Token(_) | AuthError::Database(_) => ApiError::internal(err),
    }
}

impl From<LoginThrottled> for ApiError {
    fn from(err: LoginThrottled) -> Self {
        Self {
            status: StatusCode::TOO_MANY_REQUESTS,
            message: err.to_string(),
            retry_after_secs: Some(err.retry_after_secs),
        }
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub expires_at: i64,
    pub user: UserRow,
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

fn session_for(state: &AppState, user: UserRow) -> ApiResult<SessionResponse> {
    let issued = state.jwt.issue(user.id).map_err(auth_error)?;
    Ok(SessionResponse { token: issued.token, expires_at: issued.expires_at, user })
}

/// `POST /api/auth/register`: create an account and sign it in.
pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterInput>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let user = auth_svc::register(&state.pool, body).await.map_err(auth_error)?;
    state.audit.record(AuditEvent::new(user.id, "user.register", "user", user.id));
    Ok((StatusCode::CREATED, Json(session_for(&state, user)?)))
}

/// `POST /api/auth/login`: exchange email and password for a token.
pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<LoginBody>,
) -> ApiResult<Json<SessionResponse>> {
    let key = validation::normalize_email(&body.email)?;
    state.login_limiter.check(&key)?;

    let user = match auth_svc::login(&state.pool, &key, &body.password).await {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => {
            state.login_limiter.record_failure(&key);
            tracing::warn!(email = %key, "login failed");
            return Err(auth_error(AuthError::InvalidCredentials));
        }
        Err(e) => return Err(auth_error(e)),
    };
    state.login_limiter.reset(&key);
    state.audit.record(AuditEvent::new(user.id, "user.login", "user", user.id));
    Ok(Json(session_for(&state, user)?))
}

/// `POST /api/auth/logout`: revoke the presented token.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> ApiResult<StatusCode> {
    auth_svc::revoke(&state.pool, &auth.token, &auth.claims)
        .await
        .map_err(auth_error)?;
    state.audit.record(AuditEvent::new(auth.user_id, "user.logout", "user", auth.user_id));
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/auth/me`: return the current user.
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<UserRow>> {
    let user = auth_svc::find_user(&state.pool, auth.user_id)
        .await
        .map_err(auth_error)?;
    Ok(Json(user))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
