//! Sticker library routes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::routes::auth::AuthUser;
use crate::routes::{ApiError, ApiResult, JsonBody};
use crate::services::audit::AuditEvent;
use crate::services::sticker::{self, NewSticker, StickerError, StickerPatch, StickerRow};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub include_public: bool,
}

pub(crate) fn sticker_error(err: StickerError) -> ApiError {
    match err {
        StickerError::NotFound(_) => ApiError::not_found(err.to_string()),
        StickerError::DuplicateAsset => ApiError::new(StatusCode::CONFLICT, err.to_string()),
        StickerError::Validation(e) => e.into(),
        StickerError::Database(_) => ApiError::internal(err),
    }
}

/// `GET /api/stickers?include_public=`: the caller's stickers, optionally
/// with everyone's public ones.
pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<StickerRow>>> {
    let rows = sticker::list_stickers(&state.pool, auth.user_id, query.include_public)
        .await
        .map_err(sticker_error)?;
    Ok(Json(rows))
}

/// `POST /api/stickers`
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    JsonBody(body): JsonBody<NewSticker>,
) -> ApiResult<(StatusCode, Json<StickerRow>)> {
    let valid = body.validate()?;
    let row = sticker::create_sticker(&state.pool, auth.user_id, &valid)
        .await
        .map_err(sticker_error)?;
    state.audit.record(AuditEvent::new(auth.user_id, "sticker.create", "sticker", row.id));
    Ok((StatusCode::CREATED, Json(row)))
}

/// `PATCH /api/stickers/{id}`
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    JsonBody(body): JsonBody<StickerPatch>,
) -> ApiResult<Json<StickerRow>> {
    let valid = body.validate()?;
    let row = sticker::update_sticker(&state.pool, auth.user_id, id, &valid)
        .await
        .map_err(sticker_error)?;
    state.audit.record(AuditEvent::new(auth.user_id, "sticker.update", "sticker", id));
    Ok(Json(row))
}

/// `DELETE /api/stickers/{id}`
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    sticker::delete_sticker(&state.pool, auth.user_id, id)
        .await
        .map_err(sticker_error)?;
    state.audit.record(AuditEvent::new(auth.user_id, "sticker.delete", "sticker", id));
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /api/stickers/{id}/use`: bump the usage counter.
pub async fn use_one(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StickerRow>> {
    let row = sticker::use_sticker(&state.pool, auth.user_id, id)
        .await
        .map_err(sticker_error)?;
    Ok(Json(row))
}

#[cfg(test)]
#[path = "stickers_test.rs"]
mod tests;
