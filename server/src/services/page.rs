//! Page service: list, append, flag, delete with renumbering.
//!
//! DESIGN
//! ======
//! Page numbers are contiguous from 1 within a notebook. Appending and
//! deleting lock the parent notebook row first, so concurrent page edits on
//! one notebook serialize and `page_count` stays exact. The
//! `(notebook_id, page_number)` unique constraint is deferred, which lets a
//! delete shift every following page down with a single UPDATE.
//!
//! ERROR HANDLING
//! ==============
//! A notebook always keeps at least one page; deleting the last one is
//! refused with `LastPage` rather than leaving an empty notebook.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::info;
use uuid::Uuid;

use crate::services::notebook;

const PAGE_COLUMNS: &str = "p.id, p.notebook_id, p.page_number, p.is_custom_cover,
     (EXTRACT(EPOCH FROM p.created_at) * 1000)::BIGINT AS created_at,
     (EXTRACT(EPOCH FROM p.updated_at) * 1000)::BIGINT AS updated_at";

#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("notebook not found: {0}")]
    NotebookNotFound(Uuid),
    #[error("page not found: {0}")]
    NotFound(Uuid),
    #[error("a notebook must keep at least one page")]
    LastPage,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageRow {
    pub id: Uuid,
    pub notebook_id: Uuid,
    pub page_number: i32,
    pub is_custom_cover: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

fn page_from_row(r: &PgRow) -> Result<PageRow, sqlx::Error> {
    Ok(PageRow {
        id: r.try_get("id")?,
        notebook_id: r.try_get("notebook_id")?,
        page_number: r.try_get("page_number")?,
        is_custom_cover: r.try_get("is_custom_cover")?,
        created_at: r.try_get("created_at")?,
        updated_at: r.try_get("updated_at")?,
    })
}

/// `POST /api/notebooks/{id}/pages` and `PATCH /api/pages/{id}` body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageInput {
    pub is_custom_cover: Option<bool>,
}

// =============================================================================
// READ
// =============================================================================

/// Pages of a notebook in page-number order.
///
/// # Errors
///
/// Returns [`PageError::NotebookNotFound`] or a database error.
pub async fn list_pages(pool: &PgPool, user_id: Uuid, notebook_id: Uuid) -> Result<Vec<PageRow>, PageError> {
    if !notebook::is_owned(pool, user_id, notebook_id).await? {
        return Err(PageError::NotebookNotFound(notebook_id));
    }
    let sql = format!(
        "SELECT {PAGE_COLUMNS}
         FROM pages p
         WHERE p.notebook_id = $1
         ORDER BY p.page_number"
    );
    let rows = sqlx::query(&sql).bind(notebook_id).fetch_all(pool).await?;
    Ok(rows.iter().map(page_from_row).collect::<Result<_, _>>()?)
}

/// # Errors
///
/// Returns [`PageError::NotFound`] or a database error.
pub async fn get_page(pool: &PgPool, user_id: Uuid, page_id: Uuid) -> Result<PageRow, PageError> {
    let sql = format!(
        "SELECT {PAGE_COLUMNS}
         FROM pages p
         JOIN notebooks n ON n.id = p.notebook_id
         WHERE p.id = $1 AND n.user_id = $2 AND n.deleted_at IS NULL"
    );
    let row = sqlx::query(&sql)
        .bind(page_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(PageError::NotFound(page_id))?;
    Ok(page_from_row(&row)?)
}

// =============================================================================
// WRITE
// =============================================================================

/// Append a page after the current last page.
///
/// # Errors
///
/// Returns [`PageError::NotebookNotFound`] or a database error.
pub async fn append_page(
    pool: &PgPool,
    user_id: Uuid,
    notebook_id: Uuid,
    input: &PageInput,
) -> Result<PageRow, PageError> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT id FROM notebooks WHERE id = $1 AND user_id = $2 AND deleted_at IS NULL FOR UPDATE")
        .bind(notebook_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(PageError::NotebookNotFound(notebook_id))?;

    let sql = format!(
        "INSERT INTO pages AS p (notebook_id, page_number, is_custom_cover)
         SELECT $1, COALESCE(MAX(page_number), 0) + 1, $2 FROM pages WHERE notebook_id = $1
         RETURNING {PAGE_COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(notebook_id)
        .bind(input.is_custom_cover.unwrap_or(false))
        .fetch_one(&mut *tx)
        .await?;
    let page = page_from_row(&row)?;

    sqlx::query("UPDATE notebooks SET page_count = page_count + 1, updated_at = now() WHERE id = $1")
        .bind(notebook_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    info!(page_id = %page.id, %notebook_id, page_number = page.page_number, "page appended");
    Ok(page)
}

/// Update page flags. An empty input is a no-op read.
///
/// # Errors
///
/// Returns [`PageError::NotFound`] or a database error.
pub async fn update_page(pool: &PgPool, user_id: Uuid, page_id: Uuid, input: &PageInput) -> Result<PageRow, PageError> {
    let sql = format!(
        "UPDATE pages AS p
         SET is_custom_cover = COALESCE($3, p.is_custom_cover), updated_at = now()
         FROM notebooks n
         WHERE p.id = $1 AND n.id = p.notebook_id AND n.user_id = $2 AND n.deleted_at IS NULL
         RETURNING {PAGE_COLUMNS}"
    );
    let row = sqlx::query(&sql)
        .bind(page_id)
        .bind(user_id)
        .bind(input.is_custom_cover)
        .fetch_optional(pool)
        .await?
        .ok_or(PageError::NotFound(page_id))?;
    Ok(page_from_row(&row)?)
}

/// Delete a page, its elements (cascade) and close the numbering gap.
/// Returns the deleted page.
///
/// # Errors
///
/// Returns [`PageError::NotFound`], [`PageError::LastPage`] or a database
/// error.
pub async fn delete_page(pool: &PgPool, user_id: Uuid, page_id: Uuid) -> Result<PageRow, PageError> {
    let mut tx = pool.begin().await?;

    let owner = sqlx::query(
        "SELECT n.id AS notebook_id, n.page_count
         FROM pages p
         JOIN notebooks n ON n.id = p.notebook_id
         WHERE p.id = $1 AND n.user_id = $2 AND n.deleted_at IS NULL
         FOR UPDATE OF n",
    )
    .bind(page_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(PageError::NotFound(page_id))?;
    let notebook_id: Uuid = owner.get("notebook_id");
    let page_count: i32 = owner.get("page_count");
    if page_count <= 1 {
        return Err(PageError::LastPage);
    }

    let sql = format!("DELETE FROM pages AS p WHERE p.id = $1 RETURNING {PAGE_COLUMNS}");
    let row = sqlx::query(&sql)
        .bind(page_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(PageError::NotFound(page_id))?;
    let deleted = page_from_row(&row)?;

    sqlx::query("UPDATE pages SET page_number = page_number - 1, updated_at = now() WHERE notebook_id = $1 AND page_number > $2")
        .bind(notebook_id)
        .bind(deleted.page_number)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE notebooks SET page_count = page_count - 1, updated_at = now() WHERE id = $1")
        .bind(notebook_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    info!(%page_id, %notebook_id, page_number = deleted.page_number, "page deleted");
    Ok(deleted)
}

#[cfg(test)]
#[path = "page_test.rs"]
mod tests;
