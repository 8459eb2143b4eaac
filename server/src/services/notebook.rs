//! Notebook service: CRUD, archive/restore, soft delete.
//!
//! DESIGN
//! ======
//! Every query is scoped by owner, so "not yours" and "does not exist" are
//! the same `NotFound`. Soft-deleted notebooks vanish from every read.
//! A notebook is created together with its initial pages in one
//! transaction, and `page_count` is kept equal to the number of page rows by
//! the page service.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row};
use tracing::info;
use uuid::Uuid;

use crate::db::decode_text;
use crate::services::validation::{self, DESCRIPTION_MAX_LEN, TITLE_MAX_LEN, ValidationError};

const NOTEBOOK_COLUMNS: &str = "id, title, description, notebook_type, format, orientation, page_count, status,
     (EXTRACT(EPOCH FROM created_at) * 1000)::BIGINT AS created_at,
     (EXTRACT(EPOCH FROM updated_at) * 1000)::BIGINT AS updated_at";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum NotebookError {
    #[error("notebook not found: {0}")]
    NotFound(Uuid),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotebookType {
    Voyage,
    Daily,
    Reportage,
}

impl NotebookType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Voyage => "voyage",
            Self::Daily => "daily",
            Self::Reportage => "reportage",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "voyage" => Some(Self::Voyage),
            "daily" => Some(Self::Daily),
            "reportage" => Some(Self::Reportage),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperFormat {
    A4,
    A5,
}

impl PaperFormat {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::A4 => "a4",
            Self::A5 => "a5",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "a4" => Some(Self::A4),
            "a5" => Some(Self::A5),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Portrait => "portrait",
            Self::Landscape => "landscape",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "portrait" => Some(Self::Portrait),
            "landscape" => Some(Self::Landscape),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotebookStatus {
    Active,
    Archived,
}

impl NotebookStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Archived => "archived",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(Self::Active),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

/// Parse a lowercase enum field from a request, naming it in the error.
fn parse_choice<T>(
    field: &str,
    raw: &str,
    parse: impl Fn(&str) -> Option<T>,
    allowed: &str,
) -> Result<T, ValidationError> {
    parse(raw.trim().to_ascii_lowercase().as_str())
        .ok_or_else(|| ValidationError::new(format!("{field} must be one of: {allowed}")))
}

/// # Errors
///
/// Returns a [`ValidationError`] for an unknown status.
pub fn parse_status(raw: &str) -> Result<NotebookStatus, ValidationError> {
    parse_choice("status", raw, NotebookStatus::parse, "active, archived")
}

#[derive(Debug, Clone, Serialize)]
pub struct NotebookRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub notebook_type: NotebookType,
    pub format: PaperFormat,
    pub orientation: Orientation,
    pub page_count: i32,
    pub status: NotebookStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

fn notebook_from_row(r: &PgRow) -> Result<NotebookRow, sqlx::Error> {
    Ok(NotebookRow {
        id: r.try_get("id")?,
        title: r.try_get("title")?,
        description: r.try_get("description")?,
        notebook_type: decode_text(r.try_get::<&str, _>("notebook_type")?, NotebookType::parse)?,
        format: decode_text(r.try_get::<&str, _>("format")?, PaperFormat::parse)?,
        orientation: decode_text(r.try_get::<&str, _>("orientation")?, Orientation::parse)?,
        page_count: r.try_get("page_count")?,
        status: decode_text(r.try_get::<&str, _>("status")?, NotebookStatus::parse)?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

/// `POST /api/notebooks` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewNotebook {
    pub title: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub notebook_type: Option<String>,
    pub format: Option<String>,
    pub orientation: Option<String>,
    /// Pages created up front; defaults to 1.
    pub page_count: Option<i32>,
}

/// A [`NewNotebook`] that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotebookDraft {
    pub title: String,
    pub description: Option<String>,
    pub notebook_type: NotebookType,
    pub format: PaperFormat,
    pub orientation: Orientation,
    pub pages: i32,
}

impl NewNotebook {
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<NotebookDraft, ValidationError> {
        Ok(NotebookDraft {
            title: validation::required_text("title", &self.title, TITLE_MAX_LEN)?,
            description: validation::optional_text("description", self.description.as_deref(), DESCRIPTION_MAX_LEN)?,
            notebook_type: match self.notebook_type.as_deref() {
                Some(raw) => parse_choice("type", raw, NotebookType::parse, "voyage, daily, reportage")?,
                None => NotebookType::Voyage,
            },
            format: match self.format.as_deref() {
                Some(raw) => parse_choice("format", raw, PaperFormat::parse, "a4, a5")?,
                None => PaperFormat::A4,
            },
            orientation: match self.orientation.as_deref() {
                Some(raw) => parse_choice("orientation", raw, Orientation::parse, "portrait, landscape")?,
                None => Orientation::Portrait,
            },
            pages: validation::initial_pages(self.page_count.unwrap_or(1))?,
        })
    }
}

/// `PATCH /api/notebooks/{id}` body. Absent fields are left unchanged; an
/// empty `description` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotebookPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub notebook_type: Option<String>,
    pub format: Option<String>,
    pub orientation: Option<String>,
}

/// A [`NotebookPatch`] that passed validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotebookChanges {
    pub title: Option<String>,
    /// `Some(None)` clears the description.
    pub description: Option<Option<String>>,
    pub notebook_type: Option<NotebookType>,
    pub format: Option<PaperFormat>,
    pub orientation: Option<Orientation>,
}

impl NotebookPatch {
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self) -> Result<NotebookChanges, ValidationError> {
        Ok(NotebookChanges {
            title: self
                .title
                .as_deref()
                .map(|t| validation::required_text("title", t, TITLE_MAX_LEN))
                .transpose()?,
            description: self
                .description
                .as_deref()
                .map(|d| validation::optional_text("description", Some(d), DESCRIPTION_MAX_LEN))
                .transpose()?,
            notebook_type: self
                .notebook_type
                .as_deref()
                .map(|raw| parse_choice("type", raw, NotebookType::parse, "voyage, daily, reportage"))
                .transpose()?,
            format: self
                .format
                .as_deref()
                .map(|raw| parse_choice("format", raw, PaperFormat::parse, "a4, a5"))
                .transpose()?,
            orientation: self
                .orientation
                .as_deref()
                .map(|raw| parse_choice("orientation", raw, Orientation::parse, "portrait, landscape"))
                .transpose()?,
        })
    }
}

// =============================================================================
// CRUD
// =============================================================================

/// Create a notebook and its initial pages, numbered from 1.
///
/// # Errors
///
/// Returns a database error if either insert fails.
pub async fn create_notebook(pool: &PgPool, user_id: Uuid, draft: &NotebookDraft) -> Result<NotebookRow, NotebookError> {
    let mut tx = pool.begin().await?;

    let sql = format!(
        "INSERT INTO notebooks (user_id, title, description, notebook_type, format, orientation, page_count)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING {NOTEBOOK_COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(user_id)
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(draft.notebook_type.as_str())
        .bind(draft.format.as_str())
        .bind(draft.orientation.as_str())
        .bind(draft.pages)
        .fetch_one(&mut *tx)
        .await?;
    let notebook = notebook_from_row(&row)?;

    sqlx::query(
        "INSERT INTO pages (notebook_id, page_number)
         SELECT $1, n FROM generate_series(1, $2) AS n",
    )
    .bind(notebook.id)
    .bind(draft.pages)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    info!(notebook_id = %notebook.id, %user_id, pages = draft.pages, "notebook created");
    Ok(notebook)
}

/// Notebooks owned by `user_id`, most recently updated first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_notebooks(
    pool: &PgPool,
    user_id: Uuid,
    status: Option<NotebookStatus>,
) -> Result<Vec<NotebookRow>, NotebookError> {
    let sql = format!(
        "SELECT {NOTEBOOK_COLUMNS}
         FROM notebooks
         WHERE user_id = $1 AND deleted_at IS NULL AND ($2::TEXT IS NULL OR status = $2)
         ORDER BY updated_at DESC, id"
    );
    let rows = sqlx::query(&sql)
        .bind(user_id)
        .bind(status.map(NotebookStatus::as_str))
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(notebook_from_row).collect::<Result<_, _>>()?)
}

/// # Errors
///
/// Returns [`NotebookError::NotFound`] or a database error.
pub async fn get_notebook(pool: &PgPool, user_id: Uuid, notebook_id: Uuid) -> Result<NotebookRow, NotebookError> {
    let sql = format!(
        "SELECT {NOTEBOOK_COLUMNS}
         FROM notebooks
         WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL"
    );
    let row = sqlx::query(&sql)
        .bind(notebook_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(NotebookError::NotFound(notebook_id))?;
    Ok(notebook_from_row(&row)?)
}

/// Apply validated changes.
///
/// # Errors
///
/// Returns [`NotebookError::NotFound`] or a database error.
pub async fn update_notebook(
    pool: &PgPool,
    user_id: Uuid,
    notebook_id: Uuid,
    changes: &NotebookChanges,
) -> Result<NotebookRow, NotebookError> {
    let sql = format!(
        "UPDATE notebooks
         SET title = COALESCE($3, title),
             description = CASE WHEN $4 THEN $5 ELSE description END,
             notebook_type = COALESCE($6, notebook_type),
             format = COALESCE($7, format),
             orientation = COALESCE($8, orientation),
             updated_at = now()
         WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
         RETURNING {NOTEBOOK_COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(notebook_id)
        .bind(user_id)
        .bind(&changes.title)
        .bind(changes.description.is_some())
        .bind(changes.description.clone().flatten())
        .bind(changes.notebook_type.map(NotebookType::as_str))
        .bind(changes.format.map(PaperFormat::as_str))
        .bind(changes.orientation.map(Orientation::as_str))
        .fetch_optional(pool)
        .await?
        .ok_or(NotebookError::NotFound(notebook_id))?;
    Ok(notebook_from_row(&row)?)
}

/// Archive or restore a notebook.
///
/// # Errors
///
/// Returns [`NotebookError::NotFound`] or a database error.
pub async fn set_status(
    pool: &PgPool,
    user_id: Uuid,
    notebook_id: Uuid,
    status: NotebookStatus,
) -> Result<NotebookRow, NotebookError> {
    let sql = format!(
        "UPDATE notebooks
         SET status = $3, updated_at = now()
         WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
         RETURNING {NOTEBOOK_COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(notebook_id)
        .bind(user_id)
        .bind(status.as_str())
        .fetch_optional(pool)
        .await?
        .ok_or(NotebookError::NotFound(notebook_id))?;
    info!(%notebook_id, status = status.as_str(), "notebook status changed");
    Ok(notebook_from_row(&row)?)
}

/// Soft-delete a notebook. Its pages and elements stay in place but become
/// unreachable through the owner checks.
///
/// # Errors
///
/// Returns [`NotebookError::NotFound`] or a database error.
pub async fn delete_notebook(pool: &PgPool, user_id: Uuid, notebook_id: Uuid) -> Result<(), NotebookError> {
    let result = sqlx::query(
        "UPDATE notebooks SET deleted_at = now(), updated_at = now()
         WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL",
    )
    .bind(notebook_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(NotebookError::NotFound(notebook_id));
    }
    Ok(())
}

/// `true` if `notebook_id` is a live notebook owned by `user_id`.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn is_owned<'e, E>(executor: E, user_id: Uuid, notebook_id: Uuid) -> Result<bool, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let row = sqlx::query(
        "SELECT EXISTS (
             SELECT 1 FROM notebooks WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL
         ) AS owned",
    )
    .bind(notebook_id)
    .bind(user_id)
    .fetch_one(executor)
    .await?;
    Ok(row.get("owned"))
}

#[cfg(test)]
#[path = "notebook_test.rs"]
mod tests;
