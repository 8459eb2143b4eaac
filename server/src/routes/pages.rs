//! Page routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde_json::json;
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::routes::{ApiError, ApiResult, JsonBody};
use crate::services::audit::AuditEvent;
use crate::services::page::{self, PageError, PageInput, PageRow};
use crate::state::AppState;

pub(crate) fn page_error(err: PageError) -> ApiError {
    match err {
        PageError::NotebookNotFound(_) | PageError::NotFound(_) => ApiError::not_found(err.to_string()),
        PageError::LastPage => ApiError::new(StatusCode::CONFLICT, err.to_string()),
        PageError::Database(_) => ApiError::internal(err),
    }
}

/// `GET /api/notebooks/{id}/pages`
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(notebook_id): Path<Uuid>,
) -> ApiResult<Json<Vec<PageRow>>> {
    let rows = page::list_pages(&state.pool, auth.user_id, notebook_id)
        .await
        .map_err(page_error)?;
    Ok(Json(rows))
}

/// `POST /api/notebooks/{id}/pages`: append a page at the end.
pub async fn append(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(notebook_id): Path<Uuid>,
    JsonBody(body): JsonBody<PageInput>,
) -> ApiResult<(StatusCode, Json<PageRow>)> {
    let row = page::append_page(&state.pool, auth.user_id, notebook_id, &body)
        .await
        .map_err(page_error)?;
    state.audit.record(
        AuditEvent::new(auth.user_id, "page.create", "page", row.id)
            .with_details(json!({ "notebook_id": notebook_id, "page_number": row.page_number })),
    );
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/pages/{id}`
pub async fn get_one(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PageRow>> {
    let row = page::get_page(&state.pool, auth.user_id, id)
        .await
        .map_err(page_error)?;
    Ok(Json(row))
}

/// `PATCH /api/pages/{id}`
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<PageInput>,
) -> ApiResult<Json<PageRow>> {
    let row = page::update_page(&state.pool, auth.user_id, id, &body)
        .await
        .map_err(page_error)?;
    state.audit.record(AuditEvent::new(auth.user_id, "page.update", "page", id));
    Ok(Json(row))
}

/// `DELETE /api/pages/{id}`: remove a page and renumber the rest.
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let removed = page::delete_page(&state.pool, auth.user_id, id)
        .await
        .map_err(page_error)?;
    state.audit.record(
        AuditEvent::new(auth.user_id, "page.delete", "page", id).with_details(json!({
            "notebook_id": removed.notebook_id,
            "page_number": removed.page_number,
        })),
    );
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "pages_test.rs"]
mod tests;
