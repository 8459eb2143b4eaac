//! Local fallback storage for edits the backend could not accept.
//!
//! DESIGN
//! ======
//! When auto-save exhausts its retries the unsaved elements are written to a
//! key-value store addressed by page id, the native counterpart of browser
//! local storage. Entries are plain JSON strings under
//! `unsaved_elements_<page_id>`, so both implementations share one format and
//! an entry written by one can be read back after a restart by the other.
//!
//! A later successful save for the same page purges the entry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::element::PageElement;

const KEY_PREFIX: &str = "unsaved_elements_";

#[derive(Debug, thiserror::Error)]
pub enum FallbackError {
    #[error("fallback io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("fallback entry is not valid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Unsaved elements for one page plus the time they were parked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackEntry {
    pub page_id: Uuid,
    pub saved_at_ms: i64,
    pub elements: Vec<PageElement>,
}

pub trait FallbackStore: Send + Sync {
    /// Overwrite the entry for `page_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be encoded or written.
    fn store(&self, page_id: Uuid, elements: &[PageElement]) -> Result<(), FallbackError>;

    /// Read the entry for `page_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry exists but cannot be read or decoded.
    fn load(&self, page_id: Uuid) -> Result<Option<FallbackEntry>, FallbackError>;

    /// Remove the entry for `page_id`. Missing entries are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing entry cannot be removed.
    fn clear(&self, page_id: Uuid) -> Result<(), FallbackError>;
}

/// Storage key for a page.
#[must_use]
pub fn fallback_key(page_id: Uuid) -> String {
    format!("{KEY_PREFIX}{page_id}")
}

fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

fn encode(page_id: Uuid, elements: &[PageElement]) -> Result<String, FallbackError> {
    let entry = FallbackEntry { page_id, saved_at_ms: now_ms(), elements: elements.to_vec() };
    Ok(serde_json::to_string(&entry)?)
}

// =============================================================================
// IN-MEMORY
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryFallbackStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryFallbackStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FallbackStore for MemoryFallbackStore {
    fn store(&self, page_id: Uuid, elements: &[PageElement]) -> Result<(), FallbackError> {
        let raw = encode(page_id, elements)?;
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(fallback_key(page_id), raw);
        Ok(())
    }

    fn load(&self, page_id: Uuid) -> Result<Option<FallbackEntry>, FallbackError> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match entries.get(&fallback_key(page_id)) {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    fn clear(&self, page_id: Uuid) -> Result<(), FallbackError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&fallback_key(page_id));
        Ok(())
    }
}

// =============================================================================
// FILE-BACKED
// =============================================================================

/// One JSON file per page inside `dir`.
#[derive(Debug, Clone)]
pub struct FileFallbackStore {
    dir: PathBuf,
}

impl FileFallbackStore {
    /// Use `dir` for entries, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, FallbackError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, page_id: Uuid) -> PathBuf {
        self.dir.join(format!("{}.json", fallback_key(page_id)))
    }
}

impl FallbackStore for FileFallbackStore {
    fn store(&self, page_id: Uuid, elements: &[PageElement]) -> Result<(), FallbackError> {
        let raw = encode(page_id, elements)?;
        let path = self.path_for(page_id);
        // Write-then-rename so a crash never leaves a truncated entry.
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, raw)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn load(&self, page_id: Uuid) -> Result<Option<FallbackEntry>, FallbackError> {
        match std::fs::read_to_string(self.path_for(page_id)) {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn clear(&self, page_id: Uuid) -> Result<(), FallbackError> {
        match std::fs::remove_file(self.path_for(page_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "fallback_test.rs"]
mod tests;
