//! Persisted page element records and point-in-time snapshots.
//!
//! `PageElement` mirrors a row of the server's `page_elements` table as it
//! travels over the wire: geometry in millimeters, type-specific `content`
//! and generic `style` as open JSON objects. An `ElementSnapshot` is an
//! ordered, deep-cloned copy of every element on a page at one instant.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted element type vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Text,
    Image,
    Shape,
    Emoji,
    Sticker,
    Mood,
}

impl ElementKind {
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
}

/// A canvas element as stored by the backend. Position and size are in mm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageElement {
    /// `None` for elements created locally and not yet persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub page_id: Uuid,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Degrees in [-180, 180].
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub z_index: i32,
    #[serde(default = "empty_object")]
    pub content: serde_json::Value,
    #[serde(default = "empty_object")]
    pub style: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticker_id: Option<Uuid>,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl PageElement {
    /// Geometry check shared by snapshot restoration and tests.
    #[must_use]
    pub fn has_valid_geometry(&self) -> bool {
        self.x.is_finite()
            && self.y.is_finite()
            && self.x >= 0.0
            && self.y >= 0.0
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
            && (-180.0..=180.0).contains(&self.rotation)
    }
}

/// Ordered copy of every element on a page. Equality is structural.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementSnapshot(Vec<PageElement>);

impl ElementSnapshot {
    #[must_use]
    pub fn new(elements: Vec<PageElement>) -> Self {
        Self(elements)
    }

    #[must_use]
    pub fn elements(&self) -> &[PageElement] {
        &self.0
    }

    #[must_use]
    pub fn into_elements(self) -> Vec<PageElement> {
        self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Page the snapshot belongs to, taken from its first element.
    #[must_use]
    pub fn page_id(&self) -> Option<Uuid> {
        self.0.first().map(|el| el.page_id)
    }
}

impl From<Vec<PageElement>> for ElementSnapshot {
    fn from(elements: Vec<PageElement>) -> Self {
        Self(elements)
    }
}

#[cfg(test)]
#[path = "element_test.rs"]
mod tests;
