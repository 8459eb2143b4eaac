//! Page element routes, including the batch replace used by auto-save.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::routes::{ApiError, ApiResult, JsonBody};
use crate::services::audit::AuditEvent;
use crate::services::element::{self, ElementError, ElementInput, ElementPatch, ElementRow};
use crate::state::AppState;

/// `PUT /api/pages/{id}/elements` body and response.
#[derive(Debug, Deserialize)]
pub struct ReplaceBody {
    pub elements: Vec<ElementInput>,
}

#[derive(Debug, Serialize)]
pub struct ElementsResponse {
    pub elements: Vec<ElementRow>,
}

pub(crate) fn element_error(err: ElementError) -> ApiError {
    match err {
        ElementError::PageNotFound(_) | ElementError::NotFound(_) => ApiError::not_found(err.to_string()),
        ElementError::Validation(e) => e.into(),
        ElementError::UnknownSticker => ApiError::bad_request(err.to_string()),
        ElementError::Database(_) => ApiError::internal(err),
    }
}

/// `GET /api/pages/{id}/elements`: live elements in z order.
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(page_id): Path<Uuid>,
) -> ApiResult<Json<ElementsResponse>> {
    let elements = element::list_elements(&state.pool, auth.user_id, page_id)
        .await
        .map_err(element_error)?;
    Ok(Json(ElementsResponse { elements }))
}

/// `POST /api/pages/{id}/elements`: add one element.
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(page_id): Path<Uuid>,
    JsonBody(body): JsonBody<ElementInput>,
) -> ApiResult<(StatusCode, Json<ElementRow>)> {
    let draft = body.validate()?;
    let row = element::create_element(&state.pool, auth.user_id, page_id, &draft)
        .await
        .map_err(element_error)?;
    state.audit.record(
        AuditEvent::new(auth.user_id, "element.create", "element", row.id)
            .with_details(json!({ "page_id": page_id, "type": row.element_type })),
    );
    Ok((StatusCode::CREATED, Json(row)))
}

/// `PUT /api/pages/{id}/elements`: make the page's elements exactly the
/// submitted set.
pub async fn replace(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(page_id): Path<Uuid>,
    JsonBody(body): JsonBody<ReplaceBody>,
) -> ApiResult<Json<ElementsResponse>> {
    let drafts = element::validate_batch(&body.elements)?;
    let elements = element::replace_elements(&state.pool, auth.user_id, page_id, &drafts)
        .await
        .map_err(element_error)?;
    state.audit.record(
        AuditEvent::new(auth.user_id, "page.replace_elements", "page", page_id)
            .with_details(json!({ "count": elements.len() })),
    );
    Ok(Json(ElementsResponse { elements }))
}

/// `GET /api/elements/{id}`
pub async fn get_one(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ElementRow>> {
    let row = element::get_element(&state.pool, auth.user_id, id)
        .await
        .map_err(element_error)?;
    Ok(Json(row))
}

/// `PATCH /api/elements/{id}`
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<ElementPatch>,
) -> ApiResult<Json<ElementRow>> {
    let row = element::update_element(&state.pool, auth.user_id, id, &body)
        .await
        .map_err(element_error)?;
    state.audit.record(AuditEvent::new(auth.user_id, "element.update", "element", id));
    Ok(Json(row))
}

/// `DELETE /api/elements/{id}`: soft delete.
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    element::delete_element(&state.pool, auth.user_id, id)
        .await
        .map_err(element_error)?;
    state.audit.record(AuditEvent::new(auth.user_id, "element.delete", "element", id));
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/elements/{id}/restore`: undo a soft delete.
pub async fn restore(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ElementRow>> {
    let row = element::restore_element(&state.pool, auth.user_id, id)
        .await
        .map_err(element_error)?;
    state.audit.record(AuditEvent::new(auth.user_id, "element.restore", "element", id));
    Ok(Json(row))
}

#[cfg(test)]
#[path = "elements_test.rs"]
mod tests;
