//! Live element collection for one open page.
//!
//! DESIGN
//! ======
//! User interaction handlers and undo/redo restoration both mutate the same
//! collection, so it lives behind a shared mutex. Restoration validates the
//! incoming snapshot first and then swaps the whole vector in one step; a
//! rejected snapshot leaves the live state untouched.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use uuid::Uuid;

use crate::element::{ElementSnapshot, PageElement};
use crate::history::{RestoreError, SnapshotSource};

#[derive(Clone)]
pub struct ElementStore {
    page_id: Uuid,
    elements: Arc<Mutex<Vec<PageElement>>>,
}

impl ElementStore {
    #[must_use]
    pub fn new(page_id: Uuid) -> Self {
        Self::with_elements(page_id, Vec::new())
    }

    /// Seed the store with elements loaded from the backend.
    #[must_use]
    pub fn with_elements(page_id: Uuid, mut elements: Vec<PageElement>) -> Self {
        elements.sort_by_key(|el| el.z_index);
        Self { page_id, elements: Arc::new(Mutex::new(elements)) }
    }

    #[must_use]
    pub fn page_id(&self) -> Uuid {
        self.page_id
    }

    /// Clone of the current elements in render order.
    #[must_use]
    pub fn elements(&self) -> Vec<PageElement> {
        self.lock().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Run `f` against the live collection while holding the lock.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut Vec<PageElement>) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }

    /// Replace the whole collection without validation.
    pub fn replace_all(&self, elements: Vec<PageElement>) {
        *self.lock() = elements;
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PageElement>> {
        self.elements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl SnapshotSource for ElementStore {
    fn capture(&self) -> ElementSnapshot {
        ElementSnapshot::new(self.elements())
    }

    fn restore(&self, snapshot: &ElementSnapshot) -> Result<(), RestoreError> {
        for (index, el) in snapshot.elements().iter().enumerate() {
            if el.page_id != self.page_id {
                return Err(RestoreError::ForeignPage { expected: self.page_id, found: el.page_id });
            }
            if !el.has_valid_geometry() {
                return Err(RestoreError::InvalidGeometry { index });
            }
        }
        self.replace_all(snapshot.elements().to_vec());
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
