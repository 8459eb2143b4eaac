//! Audit trail route.

use axum::extract::{Query, State};
use axum::response::Json;
use serde::Deserialize;

use crate::routes::auth::AuthUser;
use crate::routes::{ApiError, ApiResult};
use crate::services::audit::{self, AuditRow};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
}

/// `GET /api/audit?limit=`: the caller's most recent audited actions.
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<AuditRow>>> {
    let rows = audit::list_for_user(&state.pool, auth.user_id, audit::clamp_limit(query.limit))
        .await
        .map_err(ApiError::internal)?;
    Ok(Json(rows))
}
