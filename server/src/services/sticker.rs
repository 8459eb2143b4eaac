//! Personal sticker library.
//!
//! Users upload sticker assets elsewhere and register them here by URL and
//! asset key; the key is unique per user. Public stickers are visible to
//! everyone but only editable by their owner. `use_sticker` bumps the usage
//! counter that orders the library.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::db::is_unique_violation;
use crate::services::validation::{self, ASSET_KEY_MAX_LEN, STICKER_NAME_MAX_LEN, ValidationError};

const STICKER_COLUMNS: &str = "id, user_id, name, asset_url, asset_key, thumbnail_url, tags, is_public, usage_count,
     (EXTRACT(EPOCH FROM created_at) * 1000)::BIGINT AS created_at,
     (EXTRACT(EPOCH FROM updated_at) * 1000)::BIGINT AS updated_at";

#[derive(Debug, thiserror::Error)]
pub enum StickerError {
    #[error("sticker not found: {0}")]
    NotFound(Uuid),
    #[error("a sticker with this asset key already exists")]
    DuplicateAsset,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StickerError {
    fn from(err: sqlx::Error) -> Self {
        if is_unique_violation(&err) {
            Self::DuplicateAsset
        } else {
            Self::Database(err)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StickerRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub asset_url: String,
    pub asset_key: String,
    pub thumbnail_url: Option<String>,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub usage_count: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

fn sticker_from_row(r: &PgRow) -> Result<StickerRow, sqlx::Error> {
    Ok(StickerRow {
        id: r.try_get("id")?,
        user_id: r.try_get("user_id")?,
        name: r.try_get("name")?,
        asset_url: r.try_get("asset_url")?,
        asset_key: r.try_get("asset_key")?,
        thumbnail_url: r.try_get("thumbnail_url")?,
        tags: r.try_get("tags")?,
        is_public: r.try_get("is_public")?,
        usage_count: r.try_get("usage_count")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

/// `POST /api/stickers` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewSticker {
    pub name: String,
    pub asset_url: String,
    pub asset_key: String,
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_public: bool,
}

impl NewSticker {
    /// Trimmed, validated copy.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: validation::required_text("name", &self.name, STICKER_NAME_MAX_LEN)?,
            asset_url: validation::url("asset_url", &self.asset_url)?,
            asset_key: validation::required_text("asset_key", &self.asset_key, ASSET_KEY_MAX_LEN)?,
            thumbnail_url: self
                .thumbnail_url
                .as_deref()
                .filter(|u| !u.trim().is_empty())
                .map(|u| validation::url("thumbnail_url", u))
                .transpose()?,
            tags: validation::tags(&self.tags)?,
            is_public: self.is_public,
        })
    }
}

/// `PATCH /api/stickers/{id}` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StickerPatch {
    pub name: Option<String>,
    pub thumbnail_url: Option<String>,
    pub tags: Option<Vec<String>>,
    pub is_public: Option<bool>,
}

impl StickerPatch {
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<Self, ValidationError> {
        Ok(Self {
            name: self
                .name
                .as_deref()
                .map(|n| validation::required_text("name", n, STICKER_NAME_MAX_LEN))
                .transpose()?,
            thumbnail_url: self
                .thumbnail_url
                .as_deref()
                .map(|u| validation::url("thumbnail_url", u))
                .transpose()?,
            tags: self.tags.as_deref().map(validation::tags).transpose()?,
            is_public: self.is_public,
        })
    }
}

// =============================================================================
// CRUD
// =============================================================================

/// The user's stickers, plus other users' public stickers when
/// `include_public` is set. Most used first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_stickers(pool: &PgPool, user_id: Uuid, include_public: bool) -> Result<Vec<StickerRow>, StickerError> {
    let sql = format!(
        "SELECT {STICKER_COLUMNS}
         FROM user_stickers
         WHERE user_id = $1 OR ($2 AND is_public)
         ORDER BY usage_count DESC, created_at DESC, id"
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .bind(include_public)
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(sticker_from_row).collect::<Result<_, _>>()?)
}

/// # Errors
///
/// Returns [`StickerError::DuplicateAsset`] or a database error.
pub async fn create_sticker(pool: &PgPool, user_id: Uuid, sticker: &NewSticker) -> Result<StickerRow, StickerError> {
    let sql = format!(
        "INSERT INTO user_stickers (user_id, name, asset_url, asset_key, thumbnail_url, tags, is_public)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING {STICKER_COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(user_id)
        .bind(&sticker.name)
        .bind(&sticker.asset_url)
        .bind(&sticker.asset_key)
        .bind(&sticker.thumbnail_url)
        .bind(&sticker.tags)
        .bind(sticker.is_public)
        .fetch_one(pool)
        .await?;
    let created = sticker_from_row(&row)?;
    info!(sticker_id = %created.id, %user_id, "sticker created");
    Ok(created)
}

/// # Errors
///
/// Returns [`StickerError::NotFound`] for stickers the user does not own, or
/// a database error.
pub async fn update_sticker(
    pool: &PgPool,
    user_id: Uuid,
    sticker_id: Uuid,
    patch: &StickerPatch,
) -> Result<StickerRow, StickerError> {
    let sql = format!(
        "UPDATE user_stickers
         SET name = COALESCE($3, name),
             thumbnail_url = COALESCE($4, thumbnail_url),
             tags = COALESCE($5, tags),
             is_public = COALESCE($6, is_public),
             updated_at = now()
         WHERE id = $1 AND user_id = $2
         RETURNING {STICKER_COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(sticker_id)
        .bind(user_id)
        .bind(&patch.name)
        .bind(&patch.thumbnail_url)
        .bind(&patch.tags)
        .bind(patch.is_public)
        .fetch_optional(pool)
        .await?
        .ok_or(StickerError::NotFound(sticker_id))?;
    Ok(sticker_from_row(&row)?)
}

/// Delete a sticker. Elements that used it keep their geometry and lose the
/// reference (`ON DELETE SET NULL`).
///
/// # Errors
///
/// Returns [`StickerError::NotFound`] or a database error.
pub async fn delete_sticker(pool: &PgPool, user_id: Uuid, sticker_id: Uuid) -> Result<(), StickerError> {
    let result = sqlx::query("DELETE FROM user_stickers WHERE id = $1 AND user_id = $2")
        .bind(sticker_id)
        .bind(user_id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(StickerError::NotFound(sticker_id));
    }
    Ok(())
}

/// Record one use of a sticker the user owns or that is public.
///
/// # Errors
///
/// Returns [`StickerError::NotFound`] or a database error.
pub async fn use_sticker(pool: &PgPool, user_id: Uuid, sticker_id: Uuid) -> Result<StickerRow, StickerError> {
    let sql = format!(
        "UPDATE user_stickers
         SET usage_count = usage_count + 1
         WHERE id = $1 AND (user_id = $2 OR is_public)
         RETURNING {STICKER_COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(sticker_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(StickerError::NotFound(sticker_id))?;
    Ok(sticker_from_row(&row)?)
}

#[cfg(test)]
#[path = "sticker_test.rs"]
mod tests;
