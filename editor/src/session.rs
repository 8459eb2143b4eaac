//! One open page: live elements, history, auto-save and selection.
//!
//! DESIGN
//! ======
//! A session is constructed explicitly by the host for each page it opens
//! and handed to whichever UI code needs it; there is no global editor
//! state. Every mutation goes through `apply` (or `apply_debounced` for
//! continuous gestures), which snapshots the page before the change,
//! records the history step and schedules an auto-save of the new state.
//! Undo and redo schedule a save too, since they change the page.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::info;
use uuid::Uuid;

use crate::autosave::{AutoSave, SaveBackend, SaveOutcome};
use crate::config::EditorConfig;
use crate::element::{ElementSnapshot, PageElement};
use crate::fallback::{FallbackError, FallbackStore};
use crate::history::{History, RestoreError, SnapshotSource};
use crate::notify::Notifier;
use crate::selection::Selection;
use crate::store::ElementStore;

#[derive(Debug, thiserror::Error)]
pub enum RecoverError {
    #[error(transparent)]
    Fallback(#[from] FallbackError),
    #[error(transparent)]
    Restore(#[from] RestoreError),
}

pub struct EditorSession {
    store: ElementStore,
    history: History,
    autosave: AutoSave,
    fallback: Arc<dyn FallbackStore>,
    selection: Mutex<Selection>,
}

impl EditorSession {
    /// Open `page_id` with the elements loaded from the backend.
    #[must_use]
    pub fn new(
        page_id: Uuid,
        elements: Vec<PageElement>,
        backend: Arc<dyn SaveBackend>,
        fallback: Arc<dyn FallbackStore>,
        notifier: Arc<dyn Notifier>,
        config: EditorConfig,
    ) -> Self {
        let store = ElementStore::with_elements(page_id, elements);
        let history = History::new(Arc::new(store.clone()), config.history);
        let autosave = AutoSave::new(backend, fallback.clone(), notifier, config.autosave).with_page(page_id);
        Self { store, history, autosave, fallback, selection: Mutex::new(Selection::new()) }
    }

    #[must_use]
    pub fn page_id(&self) -> Uuid {
        self.store.page_id()
    }

    #[must_use]
    pub fn elements(&self) -> Vec<PageElement> {
        self.store.elements()
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    #[must_use]
    pub fn autosave(&self) -> &AutoSave {
        &self.autosave
    }

    // =========================================================================
    // MUTATION
    // =========================================================================

    /// Mutate the page as one undoable step and schedule a save.
    /// Returns `false` when the mutation changed nothing. An unfinished
    /// gesture is recorded first so the two steps stay separate.
    pub fn apply<F>(&self, description: &str, mutate: F) -> bool
    where
        F: FnOnce(&mut Vec<PageElement>),
    {
        self.history.flush_pending();
        let before = self.history.capture();
        self.store.mutate(mutate);
        if !self.history.push(description, before) {
            return false;
        }
        self.autosave.trigger(self.store.elements());
        true
    }

    /// Mutate the page during a continuous gesture. `before` is the state at
    /// the start of the gesture; only the last step inside the history
    /// debounce window is recorded.
    pub fn apply_debounced<F>(&self, description: &str, before: ElementSnapshot, mutate: F)
    where
        F: FnOnce(&mut Vec<PageElement>),
    {
        self.store.mutate(mutate);
        self.history.push_debounced(description, before);
        self.autosave.trigger(self.store.elements());
    }

    /// Snapshot to hand back to [`EditorSession::apply_debounced`].
    #[must_use]
    pub fn begin_gesture(&self) -> ElementSnapshot {
        self.history.capture()
    }

    /// Remove every selected element as one step.
    pub fn delete_selected(&self) -> bool {
        let selected = self.selection();
        if selected.is_empty() {
            return false;
        }
        let removed = self.apply("Delete elements", |elements| {
            elements.retain(|el| el.id.is_none_or(|id| !selected.contains(id)));
        });
        if removed {
            self.lock_selection().clear();
        }
        removed
    }

    pub fn undo(&self) -> bool {
        if !self.history.undo() {
            return false;
        }
        self.after_restore();
        true
    }

    pub fn redo(&self) -> bool {
        if !self.history.redo() {
            return false;
        }
        self.after_restore();
        true
    }

    fn after_restore(&self) {
        let elements = self.store.elements();
        self.lock_selection().retain_existing(&elements);
        self.autosave.trigger(elements);
    }

    // =========================================================================
    // SAVE / RECOVERY
    // =========================================================================

    /// Save the current page immediately.
    pub async fn save_now(&self) -> SaveOutcome {
        self.autosave.force_save(self.store.elements()).await
    }

    /// Load elements left in the fallback store by a failed save and make
    /// them the live state, as an undoable step. Returns `false` if there
    /// was nothing to recover.
    ///
    /// # Errors
    ///
    /// Returns an error if the fallback entry cannot be read or does not
    /// describe a valid state for this page.
    pub fn recover_unsaved(&self) -> Result<bool, RecoverError> {
        let Some(entry) = self.fallback.load(self.page_id())? else {
            return Ok(false);
        };
        self.history.flush_pending();
        let before = self.history.capture();
        let recovered = ElementSnapshot::new(entry.elements);
        if recovered == before {
            self.fallback.clear(self.page_id())?;
            return Ok(false);
        }

        self.store.restore(&recovered)?;
        self.history.push("Recover unsaved changes", before);
        info!(page_id = %self.page_id(), count = recovered.len(), saved_at_ms = entry.saved_at_ms, "recovered unsaved elements");
        self.autosave.trigger(recovered.into_elements());
        Ok(true)
    }

    // =========================================================================
    // SELECTION
    // =========================================================================

    /// Copy of the current selection.
    #[must_use]
    pub fn selection(&self) -> Selection {
        self.lock_selection().clone()
    }

    /// Edit the selection in place.
    pub fn with_selection<R>(&self, f: impl FnOnce(&mut Selection) -> R) -> R {
        f(&mut self.lock_selection())
    }

    fn lock_selection(&self) -> MutexGuard<'_, Selection> {
        self.selection
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
