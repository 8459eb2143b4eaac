//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the database pool, the JWT keys, the failed-login throttle and
//! the audit queue handle. All request data lives in Postgres; nothing here
//! is per-notebook.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::LoginLimitConfig;
use crate::rate_limit::LoginLimiter;
use crate::services::audit::AuditLog;
use crate::services::auth::JwtKeys;

/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub jwt: Arc<JwtKeys>,
    pub login_limiter: LoginLimiter,
    pub audit: AuditLog,
}

impl AppState {
    #[must_use]
    pub fn new(pool: PgPool, jwt: JwtKeys, login_limit: LoginLimitConfig, audit: AuditLog) -> Self {
        Self { pool, jwt: Arc::new(jwt), login_limiter: LoginLimiter::new(login_limit), audit }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
#[path = "state_helpers_test.rs"]
pub mod test_helpers;

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
