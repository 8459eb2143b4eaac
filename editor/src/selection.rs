//! Multi-selection of canvas elements.
//!
//! Selection is a set: an id is either selected or not, and toggling always
//! flips membership. Insertion order is kept so the first selected element
//! can act as the anchor for alignment tools.

use uuid::Uuid;

use crate::element::PageElement;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: Vec<Uuid>,
}

impl Selection {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection with exactly `id`.
    pub fn select_only(&mut self, id: Uuid) {
        self.ids.clear();
        self.ids.push(id);
    }

    /// Add `id`; returns `false` if it was already selected.
    pub fn add(&mut self, id: Uuid) -> bool {
        if self.contains(id) {
            return false;
        }
        self.ids.push(id);
        true
    }

    /// Remove `id`; returns `false` if it was not selected.
    pub fn remove(&mut self, id: Uuid) -> bool {
        let before = self.ids.len();
        self.ids.retain(|selected| *selected != id);
        self.ids.len() != before
    }

    /// Flip membership of `id`. Returns whether it is selected afterwards.
    pub fn toggle(&mut self, id: Uuid) -> bool {
        if self.remove(id) {
            false
        } else {
            self.ids.push(id);
            true
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    #[must_use]
    pub fn contains(&self, id: Uuid) -> bool {
        self.ids.contains(&id)
    }

    /// Selected ids in selection order.
    #[must_use]
    pub fn ids(&self) -> &[Uuid] {
        &self.ids
    }

    /// First selected id.
    #[must_use]
    pub fn anchor(&self) -> Option<Uuid> {
        self.ids.first().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Drop ids that no longer name a live element, e.g. after undo removed
    /// them. Unsaved elements without an id can never be selected.
    pub fn retain_existing(&mut self, elements: &[PageElement]) {
        self.ids
            .retain(|id| elements.iter().any(|el| el.id == Some(*id)));
    }
}

impl FromIterator<Uuid> for Selection {
    fn from_iter<I: IntoIterator<Item = Uuid>>(iter: I) -> Self {
        let mut selection = Self::new();
        for id in iter {
            selection.add(id);
        }
        selection
    }
}

#[cfg(test)]
#[path = "selection_test.rs"]
mod tests;
