//! Page element service: CRUD, soft delete/restore and the batch replace
//! used by editor auto-save.
//!
//! DESIGN
//! ======
//! Elements are reached through page -> notebook -> owner joins; an element
//! on someone else's page is `NotFound`. Deletes are soft (`deleted_at`)
//! and reversible through `restore_element`; every read skips soft-deleted
//! rows.
//!
//! `replace_elements` makes the stored page equal to the submitted list in
//! one transaction: rows missing from the list are soft-deleted, rows with a
//! known id are updated (and revived if they had been deleted), and rows
//! without an id are inserted. The page row is locked first so two replaces
//! of the same page never interleave.
//!
//! ERROR HANDLING
//! ==============
//! The whole batch is validated before any write, and any failure inside the
//! transaction rolls everything back. A `sticker_id` that does not exist
//! surfaces as `UnknownSticker` instead of a raw foreign-key error.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::db::{decode_text, is_foreign_key_violation};
use crate::services::validation::{self, ValidationError};

const ELEMENT_COLUMNS: &str = "e.id, e.page_id, e.element_type, e.x, e.y, e.width, e.height, e.rotation, e.z_index,
     e.content, e.style, e.metadata, e.sticker_id,
     (EXTRACT(EPOCH FROM e.created_at) * 1000)::BIGINT AS created_at,
     (EXTRACT(EPOCH FROM e.updated_at) * 1000)::BIGINT AS updated_at";

/// Largest batch accepted by `replace_elements`.
pub const MAX_ELEMENTS_PER_PAGE: usize = 500;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ElementError {
    #[error("page not found: {0}")]
    PageNotFound(Uuid),
    #[error("element not found: {0}")]
    NotFound(Uuid),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("sticker does not exist")]
    UnknownSticker,
    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for ElementError {
    fn from(err: sqlx::Error) -> Self {
        if is_foreign_key_violation(&err) {
            Self::UnknownSticker
        } else {
            Self::Database(err)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementType {
    Text,
    Image,
    Shape,
    Emoji,
    Sticker,
    Mood,
}

impl ElementType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Shape => "shape",
            Self::Emoji => "emoji",
            Self::Sticker => "sticker",
            Self::Mood => "mood",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "shape" => Some(Self::Shape),
            "emoji" => Some(Self::Emoji),
            "sticker" => Some(Self::Sticker),
            "mood" => Some(Self::Mood),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementRow {
    pub id: Uuid,
    pub page_id: Uuid,
    #[serde(rename = "type")]
    pub element_type: ElementType,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
    pub z_index: i32,
    pub content: Value,
    pub style: Value,
    pub metadata: Option<Value>,
    pub sticker_id: Option<Uuid>,
    pub created_at: i64,
    pub updated_at: i64,
}

fn element_from_row(r: &PgRow) -> Result<ElementRow, sqlx::Error> {
    Ok(ElementRow {
        id: r.try_get("id")?,
        page_id: r.try_get("page_id")?,
        element_type: decode_text(r.try_get::<&str, _>("element_type")?, ElementType::parse)?,
        x: r.try_get("x")?,
        y: r.try_get("y")?,
        width: r.try_get("width")?,
        height: r.try_get("height")?,
        rotation: r.try_get("rotation")?,
        z_index: r.try_get("z_index")?,
        content: r.try_get("content")?,
        style: r.try_get("style")?,
        metadata: r.try_get("metadata")?,
        sticker_id: r.try_get("sticker_id")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// One element as submitted by a client. A `page_id` in the body is ignored;
/// the page always comes from the URL.
#[derive(Debug, Clone, Deserialize)]
pub struct ElementInput {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(rename = "type")]
    pub element_type: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub z_index: i32,
    #[serde(default = "empty_object")]
    pub content: Value,
    #[serde(default = "empty_object")]
    pub style: Value,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub sticker_id: Option<Uuid>,
}

/// An [`ElementInput`] that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementDraft {
    pub id: Option<Uuid>,
    pub element_type: ElementType,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub rotation: f64,
    pub z_index: i32,
    pub content: Value,
    pub style: Value,
    pub metadata: Option<Value>,
    pub sticker_id: Option<Uuid>,
}

impl ElementInput {
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<ElementDraft, ValidationError> {
        let element_type = ElementType::parse(self.element_type.trim()).ok_or_else(|| {
            ValidationError::new("type must be one of: text, image, shape, emoji, sticker, mood")
        })?;
        validation::geometry(self.x, self.y, self.width, self.height, self.rotation)?;
        validation::json_object("content", &self.content)?;
        validation::json_object("style", &self.style)?;
        if let Some(metadata) = &self.metadata {
            validation::json_object("metadata", metadata)?;
        }
        if element_type == ElementType::Sticker && self.sticker_id.is_none() {
            return Err(ValidationError::new("sticker elements require sticker_id"));
        }
        Ok(ElementDraft {
            id: self.id,
            element_type,
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            rotation: self.rotation,
            z_index: self.z_index,
            content: self.content.clone(),
            style: self.style.clone(),
            metadata: self.metadata.clone(),
            sticker_id: self.sticker_id,
        })
    }
}

/// Validate a whole batch, prefixing errors with the element's position.
///
/// # Errors
///
/// Returns a [`ValidationError`] for an oversized batch, a duplicated id or
/// the first invalid element.
pub fn validate_batch(inputs: &[ElementInput]) -> Result<Vec<ElementDraft>, ValidationError> {
    if inputs.len() > MAX_ELEMENTS_PER_PAGE {
        return Err(ValidationError::new(format!(
            "a page holds at most {MAX_ELEMENTS_PER_PAGE} elements"
        )));
    }
    let mut seen = HashSet::new();
    inputs
        .iter()
        .enumerate()
        .map(|(i, input)| {
            let draft = input
                .validate()
                .map_err(|e| ValidationError::new(format!("elements[{i}]: {e}")))?;
            if let Some(id) = draft.id {
                if !seen.insert(id) {
                    return Err(ValidationError::new(format!("elements[{i}]: duplicate id {id}")));
                }
            }
            Ok(draft)
        })
        .collect()
}

/// `PATCH /api/elements/{id}` body. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ElementPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub rotation: Option<f64>,
    pub z_index: Option<i32>,
    pub content: Option<Value>,
    pub style: Option<Value>,
    pub metadata: Option<Value>,
    pub sticker_id: Option<Uuid>,
}

impl ElementPatch {
    /// Overlay the patch on `current`, validating the merged element.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] if the merged element is invalid.
    pub fn apply(&self, current: &ElementRow) -> Result<ElementDraft, ValidationError> {
        let merged = ElementInput {
            id: Some(current.id),
            element_type: current.element_type.as_str().to_owned(),
            x: self.x.unwrap_or(current.x),
            y: self.y.unwrap_or(current.y),
            width: self.width.unwrap_or(current.width),
            height: self.height.unwrap_or(current.height),
            rotation: self.rotation.unwrap_or(current.rotation),
            z_index: self.z_index.unwrap_or(current.z_index),
            content: self.content.clone().unwrap_or_else(|| current.content.clone()),
            style: self.style.clone().unwrap_or_else(|| current.style.clone()),
            metadata: self.metadata.clone().or_else(|| current.metadata.clone()),
            sticker_id: self.sticker_id.or(current.sticker_id),
        };
        merged.validate()
    }
}

// =============================================================================
// OWNERSHIP
// =============================================================================

/// Lock the page row if `user_id` owns it.
async fn lock_owned_page(conn: &mut PgConnection, user_id: Uuid, page_id: Uuid) -> Result<(), ElementError> {
    sqlx::query(
        "SELECT p.id
         FROM pages p
         JOIN notebooks n ON n.id = p.notebook_id
         WHERE p.id = $1 AND n.user_id = $2 AND n.deleted_at IS NULL
         FOR UPDATE OF p",
    )
    .bind(page_id)
    .bind(user_id)
    .fetch_optional(conn)
    .await?
    .ok_or(ElementError::PageNotFound(page_id))?;
    Ok(())
}

async fn page_is_owned(pool: &PgPool, user_id: Uuid, page_id: Uuid) -> Result<bool, sqlx::Error> {
    let row = sqlx::query(
        "SELECT EXISTS (
             SELECT 1 FROM pages p
             JOIN notebooks n ON n.id = p.notebook_id
             WHERE p.id = $1 AND n.user_id = $2 AND n.deleted_at IS NULL
         ) AS owned",
    )
    .bind(page_id)
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(row.get("owned"))
}

// =============================================================================
// READ
// =============================================================================

/// Live elements of a page, bottom layer first.
///
/// # Errors
///
/// Returns [`ElementError::PageNotFound`] or a database error.
pub async fn list_elements(pool: &PgPool, user_id: Uuid, page_id: Uuid) -> Result<Vec<ElementRow>, ElementError> {
    if !page_is_owned(pool, user_id, page_id).await? {
        return Err(ElementError::PageNotFound(page_id));
    }
    let sql = format!(
        "SELECT {ELEMENT_COLUMNS}
         FROM page_elements e
         WHERE e.page_id = $1 AND e.deleted_at IS NULL
         ORDER BY e.z_index, e.created_at, e.id"
    );
    let rows = sqlx::query(&sql).bind(page_id).fetch_all(pool).await?;
    Ok(rows.iter().map(element_from_row).collect::<Result<_, _>>()?)
}

/// # Errors
///
/// Returns [`ElementError::NotFound`] or a database error.
pub async fn get_element(pool: &PgPool, user_id: Uuid, element_id: Uuid) -> Result<ElementRow, ElementError> {
    let sql = format!(
        "SELECT {ELEMENT_COLUMNS}
         FROM page_elements e
         JOIN pages p ON p.id = e.page_id
         JOIN notebooks n ON n.id = p.notebook_id
         WHERE e.id = $1 AND e.deleted_at IS NULL AND n.user_id = $2 AND n.deleted_at IS NULL"
    );
    let row = sqlx::query(&sql)
        .bind(element_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ElementError::NotFound(element_id))?;
    Ok(element_from_row(&row)?)
}

// =============================================================================
// WRITE
// =============================================================================

/// Insert one element; a client-supplied id is honoured.
///
/// # Errors
///
/// Returns [`ElementError::PageNotFound`], [`ElementError::UnknownSticker`]
/// or a database error.
pub async fn create_element(
    pool: &PgPool,
    user_id: Uuid,
    page_id: Uuid,
    draft: &ElementDraft,
) -> Result<ElementRow, ElementError> {
    let mut tx = pool.begin().await?;
    lock_owned_page(&mut tx, user_id, page_id).await?;
    let row = insert_element(&mut tx, page_id, draft).await?;
    tx.commit().await?;
    info!(element_id = %row.id, %page_id, element_type = row.element_type.as_str(), "element created");
    Ok(row)
}

/// Make the page's live elements exactly `drafts`, in one transaction.
/// Returns the page's elements afterwards.
///
/// # Errors
///
/// Returns [`ElementError::PageNotFound`], a validation error if an id
/// belongs to another page, [`ElementError::UnknownSticker`], or a database
/// error. Nothing is written on error.
pub async fn replace_elements(
    pool: &PgPool,
    user_id: Uuid,
    page_id: Uuid,
    drafts: &[ElementDraft],
) -> Result<Vec<ElementRow>, ElementError> {
    let mut tx = pool.begin().await?;
    lock_owned_page(&mut tx, user_id, page_id).await?;

    let keep: Vec<Uuid> = drafts.iter().filter_map(|d| d.id).collect();
    let removed = sqlx::query(
        "UPDATE page_elements SET deleted_at = now(), updated_at = now()
         WHERE page_id = $1 AND deleted_at IS NULL AND NOT (id = ANY($2))",
    )
    .bind(page_id)
    .bind(&keep)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    let mut saved = Vec::with_capacity(drafts.len());
    for draft in drafts {
        let row = match draft.id {
            Some(id) => upsert_element(&mut tx, page_id, id, draft).await?,
            None => insert_element(&mut tx, page_id, draft).await?,
        };
        saved.push(row);
    }

    tx.commit().await?;
    saved.sort_by_key(|row| row.z_index);
    info!(%page_id, saved = saved.len(), removed, "page elements replaced");
    Ok(saved)
}

/// Apply a validated patch to an element.
///
/// # Errors
///
/// Returns [`ElementError::NotFound`], [`ElementError::UnknownSticker`] or a
/// database error.
pub async fn update_element(
    pool: &PgPool,
    user_id: Uuid,
    element_id: Uuid,
    patch: &ElementPatch,
) -> Result<ElementRow, ElementError> {
    let current = get_element(pool, user_id, element_id).await?;
    let draft = patch.apply(&current)?;

    let sql = format!(
        "UPDATE page_elements AS e
         SET x = $2, y = $3, width = $4, height = $5, rotation = $6, z_index = $7,
             content = $8, style = $9, metadata = $10, sticker_id = $11, updated_at = now()
         WHERE e.id = $1 AND e.deleted_at IS NULL
         RETURNING {ELEMENT_COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(element_id)
        .bind(draft.x)
        .bind(draft.y)
        .bind(draft.width)
        .bind(draft.height)
        .bind(draft.rotation)
        .bind(draft.z_index)
        .bind(&draft.content)
        .bind(&draft.style)
        .bind(&draft.metadata)
        .bind(draft.sticker_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ElementError::NotFound(element_id))?;
    Ok(element_from_row(&row)?)
}

/// Soft-delete an element.
///
/// # Errors
///
/// Returns [`ElementError::NotFound`] or a database error.
pub async fn delete_element(pool: &PgPool, user_id: Uuid, element_id: Uuid) -> Result<(), ElementError> {
    let result = sqlx::query(
        "UPDATE page_elements AS e SET deleted_at = now(), updated_at = now()
         FROM pages p, notebooks n
         WHERE e.id = $1 AND e.deleted_at IS NULL
           AND p.id = e.page_id AND n.id = p.notebook_id
           AND n.user_id = $2 AND n.deleted_at IS NULL",
    )
    .bind(element_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(ElementError::NotFound(element_id));
    }
    Ok(())
}

/// Undo a soft delete.
///
/// # Errors
///
/// Returns [`ElementError::NotFound`] if there is no deleted element with
/// that id on a page the user owns, or a database error.
pub async fn restore_element(pool: &PgPool, user_id: Uuid, element_id: Uuid) -> Result<ElementRow, ElementError> {
    let sql = format!(
        "UPDATE page_elements AS e SET deleted_at = NULL, updated_at = now()
         FROM pages p, notebooks n
         WHERE e.id = $1 AND e.deleted_at IS NOT NULL
           AND p.id = e.page_id AND n.id = p.notebook_id
           AND n.user_id = $2 AND n.deleted_at IS NULL
         RETURNING {ELEMENT_COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(element_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ElementError::NotFound(element_id))?;
    info!(%element_id, "element restored");
    Ok(element_from_row(&row)?)
}

async fn insert_element(conn: &mut PgConnection, page_id: Uuid, draft: &ElementDraft) -> Result<ElementRow, ElementError> {
    let sql = format!(
        "INSERT INTO page_elements AS e
             (id, page_id, element_type, x, y, width, height, rotation, z_index, content, style, metadata, sticker_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
         RETURNING {ELEMENT_COLUMNS}"
    );
    let row = bind_draft(sqlx::query(&sql), draft.id.unwrap_or_else(Uuid::new_v4), page_id, draft)
        .fetch_one(conn)
        .await?;
    Ok(element_from_row(&row)?)
}

/// Update-or-insert under a client id. An id that already belongs to a
/// different page is refused rather than moved.
async fn upsert_element(
    conn: &mut PgConnection,
    page_id: Uuid,
    id: Uuid,
    draft: &ElementDraft,
) -> Result<ElementRow, ElementError> {
    let sql = format!(
        "INSERT INTO page_elements AS e
             (id, page_id, element_type, x, y, width, height, rotation, z_index, content, style, metadata, sticker_id)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
         ON CONFLICT (id) DO UPDATE
         SET element_type = EXCLUDED.element_type, x = EXCLUDED.x, y = EXCLUDED.y,
             width = EXCLUDED.width, height = EXCLUDED.height, rotation = EXCLUDED.rotation,
             z_index = EXCLUDED.z_index, content = EXCLUDED.content, style = EXCLUDED.style,
             metadata = EXCLUDED.metadata, sticker_id = EXCLUDED.sticker_id,
             deleted_at = NULL, updated_at = now()
         WHERE e.page_id = EXCLUDED.page_id
         RETURNING {ELEMENT_COLUMNS}"
    );
    let row = bind_draft(sqlx::query(&sql), id, page_id, draft)
        .fetch_optional(conn)
        .await?
        .ok_or_else(|| ValidationError::new(format!("element {id} belongs to another page")))?;
    Ok(element_from_row(&row)?)
}

fn bind_draft<'q>(
    query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    id: Uuid,
    page_id: Uuid,
    draft: &'q ElementDraft,
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    query
        .bind(id)
        .bind(page_id)
        .bind(draft.element_type.as_str())
        .bind(draft.x)
        .bind(draft.y)
        .bind(draft.width)
        .bind(draft.height)
        .bind(draft.rotation)
        .bind(draft.z_index)
        .bind(&draft.content)
        .bind(&draft.style)
        .bind(&draft.metadata)
        .bind(draft.sticker_id)
}

#[cfg(test)]
#[path = "element_test.rs"]
mod tests;
