//! Notebook routes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::routes::{ApiError, ApiResult, JsonBody};
use crate::services::audit::AuditEvent;
use crate::services::notebook::{
    self, NewNotebook, NotebookError, NotebookPatch, NotebookRow, NotebookStatus,
};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
}

pub(crate) fn notebook_error(err: NotebookError) -> ApiError {
    match err {
        NotebookError::NotFound(_) => ApiError::not_found(err.to_string()),
        NotebookError::Validation(e) => e.into(),
        NotebookError::Database(_) => ApiError::internal(err),
    }
}

/// `GET /api/notebooks?status=`: list the caller's notebooks.
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<NotebookRow>>> {
    let status = query
        .status
        .as_deref()
        .map(notebook::parse_status)
        .transpose()?;
    let rows = notebook::list_notebooks(&state.pool, auth.user_id, status)
        .await
        .map_err(notebook_error)?;
    Ok(Json(rows))
}

/// `POST /api/notebooks`: create a notebook with its initial pages.
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(body): JsonBody<NewNotebook>,
) -> ApiResult<(StatusCode, Json<NotebookRow>)> {
    let draft = body.validate()?;
    let row = notebook::create_notebook(&state.pool, auth.user_id, &draft)
        .await
        .map_err(notebook_error)?;
    state.audit.record(
        AuditEvent::new(auth.user_id, "notebook.create", "notebook", row.id)
            .with_details(json!({ "title": row.title, "page_count": row.page_count })),
    );
    Ok((StatusCode::CREATED, Json(row)))
}

/// `GET /api/notebooks/{id}`
pub async fn get_one(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<NotebookRow>> {
    let row = notebook::get_notebook(&state.pool, auth.user_id, id)
        .await
        .map_err(notebook_error)?;
    Ok(Json(row))
}

/// `PATCH /api/notebooks/{id}`: update metadata.
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<NotebookPatch>,
) -> ApiResult<Json<NotebookRow>> {
    let changes = body.validate()?;
    let row = notebook::update_notebook(&state.pool, auth.user_id, id, &changes)
        .await
        .map_err(notebook_error)?;
    state.audit.record(AuditEvent::new(auth.user_id, "notebook.update", "notebook", id));
    Ok(Json(row))
}

/// `DELETE /api/notebooks/{id}`: soft delete.
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    notebook::delete_notebook(&state.pool, auth.user_id, id)
        .await
        .map_err(notebook_error)?;
    state.audit.record(AuditEvent::new(auth.user_id, "notebook.delete", "notebook", id));
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/notebooks/{id}/archive`
pub async fn archive(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<NotebookRow>> {
    change_status(&state, &auth, id, NotebookStatus::Archived, "notebook.archive").await
}

/// `POST /api/notebooks/{id}/restore`
pub async fn restore(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<NotebookRow>> {
    change_status(&state, &auth, id, NotebookStatus::Active, "notebook.restore").await
}

async fn change_status(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    status: NotebookStatus,
    action: &'static str,
) -> ApiResult<Json<NotebookRow>> {
    let row = notebook::set_status(&state.pool, auth.user_id, id, status)
        .await
        .map_err(notebook_error)?;
    state.audit.record(AuditEvent::new(auth.user_id, action, "notebook", id));
    Ok(Json(row))
}

#[cfg(test)]
#[path = "notebooks_test.rs"]
mod tests;
