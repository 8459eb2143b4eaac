//! Conversion between live canvas objects and persisted element records.
//!
//! The canvas library describes objects in pixels with a flat, type-dependent
//! property bag (`CanvasObject`). The backend stores millimeters and splits
//! properties into a type-specific `content` blob and a generic `style` blob
//! (`PageElement`). This module is the only place that knows both shapes.
//!
//! Rules applied in both directions:
//!
//! - Geometry converts at 96 DPI (`px = mm * 96 / 25.4`). Font sizes stay in
//!   pixels.
//! - Scaled objects are flattened: the persisted width is `width * scaleX`.
//! - Rotation is normalized into [-180, 180].
//! - Z-order is the object's index in the render list; scenes are rebuilt in
//!   ascending `z_index`.
//! - Records always carry an id; new objects are assigned one on their
//!   first serialization.
//! - Text fill is written to both `content.fill` and `style.fill`; reading
//!   prefers `content.fill`, so records written by older clients still load.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use uuid::Uuid;

use crate::element::{ElementKind, PageElement};

/// Screen resolution assumed for px/mm conversion.
pub const DPI: f64 = 96.0;
/// Millimeters per inch.
pub const MM_PER_INCH: f64 = 25.4;

/// Shape type used when a stored shape record names none.
const DEFAULT_SHAPE: &str = "rect";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SerializeError {
    #[error("unsupported canvas object type: {0}")]
    UnknownType(String),
    #[error("canvas object field {field} is not a finite number")]
    NonFinite { field: &'static str },
    #[error("canvas object has empty size {width}x{height}")]
    EmptySize { width: f64, height: f64 },
}

// =============================================================================
// UNITS
// =============================================================================

/// Pixels to millimeters.
#[must_use]
pub fn px_to_mm(px: f64) -> f64 {
    px * MM_PER_INCH / DPI
}

/// Millimeters to pixels.
#[must_use]
pub fn mm_to_px(mm: f64) -> f64 {
    mm * DPI / MM_PER_INCH
}

/// Fold any angle in degrees into [-180, 180]. Non-finite input becomes 0.
#[must_use]
pub fn normalize_rotation(degrees: f64) -> f64 {
    if !degrees.is_finite() {
        return 0.0;
    }
    if (-180.0..=180.0).contains(&degrees) {
        return degrees;
    }
    (degrees + 180.0).rem_euclid(360.0) - 180.0
}

// =============================================================================
// CANVAS OBJECT
// =============================================================================

/// A live graphic object in pixel space, as exported by the canvas library.
///
/// Only the properties the editor persists are modeled. Type-specific fields
/// are optional and ignored for types that do not use them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasObject {
    /// Library type name (`textbox`, `rect`, `image`, ...).
    #[serde(rename = "type")]
    pub object_type: String,
    /// Persisted element id, when the object was loaded from the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    /// Left edge in pixels.
    pub left: f64,
    /// Top edge in pixels.
    pub top: f64,
    /// Unscaled width in pixels.
    pub width: f64,
    /// Unscaled height in pixels.
    pub height: f64,
    #[serde(default = "unit_scale")]
    pub scale_x: f64,
    #[serde(default = "unit_scale")]
    pub scale_y: f64,
    /// Rotation in degrees, any range.
    #[serde(default)]
    pub angle: f64,
    #[serde(default = "unit_scale")]
    pub opacity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(default)]
    pub stroke_width: f64,

    /// Text body for text objects, the glyph for emoji objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    /// Font size in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f64>,

    /// Image source URL for image and sticker objects.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    /// Library sticker this image was placed from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sticker_id: Option<Uuid>,
    /// Mood payload for mood objects; free-form metadata for the rest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

fn unit_scale() -> f64 {
    1.0
}

impl CanvasObject {
    /// Bare object of `object_type` at the given pixel geometry.
    #[must_use]
    pub fn new(object_type: impl Into<String>, left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            object_type: object_type.into(),
            id: None,
            left,
            top,
            width,
            height,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            opacity: 1.0,
            fill: None,
            stroke: None,
            stroke_width: 0.0,
            text: None,
            font_family: None,
            font_size: None,
            font_weight: None,
            font_style: None,
            text_align: None,
            line_height: None,
            src: None,
            sticker_id: None,
            data: None,
        }
    }
}

// =============================================================================
// TYPE NORMALIZATION
// =============================================================================

/// Map a canvas library type name onto the persisted vocabulary.
///
/// `has_sticker` distinguishes plain images from images placed from the
/// sticker library.
///
/// # Errors
///
/// Returns [`SerializeError::UnknownType`] for names outside the vocabulary.
pub fn normalize_type(object_type: &str, has_sticker: bool) -> Result<ElementKind, SerializeError> {
    let kind = match object_type {
        "textbox" | "i-text" | "text" => ElementKind::Text,
        "rect" | "circle" | "ellipse" | "triangle" | "line" | "polygon" => ElementKind::Shape,
        "image" if has_sticker => ElementKind::Sticker,
        "image" => ElementKind::Image,
        "sticker" => ElementKind::Sticker,
        "emoji" => ElementKind::Emoji,
        "mood" => ElementKind::Mood,
        other => return Err(SerializeError::UnknownType(other.to_owned())),
    };
    Ok(kind)
}

// =============================================================================
// SERIALIZE
// =============================================================================

/// Convert one live object into a persisted record at layer `z_index`.
///
/// An object that has never been saved gets a fresh id here. The record
/// keeps it from then on, so later saves update the same row instead of
/// replacing it.
///
/// # Errors
///
/// Returns an error for unknown types, non-finite geometry, or an object
/// whose scaled size is not positive.
pub fn serialize_object(obj: &CanvasObject, page_id: Uuid, z_index: i32) -> Result<PageElement, SerializeError> {
    let kind = normalize_type(&obj.object_type, obj.sticker_id.is_some())?;

    for (field, value) in [
        ("left", obj.left),
        ("top", obj.top),
        ("width", obj.width),
        ("height", obj.height),
        ("scaleX", obj.scale_x),
        ("scaleY", obj.scale_y),
    ] {
        if !value.is_finite() {
            return Err(SerializeError::NonFinite { field });
        }
    }

    let width_px = obj.width * obj.scale_x;
    let height_px = obj.height * obj.scale_y;
    if width_px <= 0.0 || height_px <= 0.0 {
        return Err(SerializeError::EmptySize { width: width_px, height: height_px });
    }

    let (content, metadata) = match kind {
        ElementKind::Text => (text_content(obj), obj.data.clone()),
        ElementKind::Shape => (json!({ "shape": obj.object_type }), obj.data.clone()),
        ElementKind::Image => (json!({ "src": obj.src }), obj.data.clone()),
        ElementKind::Sticker => (json!({ "src": obj.src, "stickerId": obj.sticker_id }), obj.data.clone()),
        ElementKind::Emoji => (
            json!({ "emoji": obj.text.clone().unwrap_or_default(), "fontSize": obj.font_size }),
            obj.data.clone(),
        ),
        ElementKind::Mood => (obj.data.clone().unwrap_or_else(|| json!({})), None),
    };

    Ok(PageElement {
        id: Some(obj.id.unwrap_or_else(Uuid::new_v4)),
        page_id,
        kind,
        // Objects dragged past the page edge persist at the edge.
        x: px_to_mm(obj.left).max(0.0),
        y: px_to_mm(obj.top).max(0.0),
        width: px_to_mm(width_px),
        height: px_to_mm(height_px),
        rotation: normalize_rotation(obj.angle),
        z_index,
        content: strip_nulls(content),
        style: style_of(obj),
        metadata,
        sticker_id: if kind == ElementKind::Sticker { obj.sticker_id } else { None },
    })
}

/// Serialize a whole render list; each object's index becomes its `z_index`.
///
/// # Errors
///
/// Fails on the first object [`serialize_object`] rejects.
pub fn serialize_scene(objects: &[CanvasObject], page_id: Uuid) -> Result<Vec<PageElement>, SerializeError> {
    objects
        .iter()
        .enumerate()
        .map(|(index, obj)| {
            let z_index = i32::try_from(index).unwrap_or(i32::MAX);
            serialize_object(obj, page_id, z_index)
        })
        .collect()
}

fn text_content(obj: &CanvasObject) -> Value {
    json!({
        "text": obj.text.clone().unwrap_or_default(),
        "fontFamily": obj.font_family,
        "fontSize": obj.font_size,
        "fontWeight": obj.font_weight,
        "fontStyle": obj.font_style,
        "textAlign": obj.text_align,
        "lineHeight": obj.line_height,
        "fill": obj.fill,
    })
}

fn style_of(obj: &CanvasObject) -> Value {
    strip_nulls(json!({
        "opacity": obj.opacity,
        "stroke": obj.stroke,
        "strokeWidth": obj.stroke_width,
        "fill": obj.fill,
    }))
}

/// Drop `null` members so absent options do not bloat stored records.
fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

// =============================================================================
// DESERIALIZE
// =============================================================================

/// Fill color for a stored record: `content.fill` wins over `style.fill`.
#[must_use]
pub fn resolve_fill(content: &Value, style: &Value) -> Option<String> {
    content
        .get("fill")
        .and_then(Value::as_str)
        .or_else(|| style.get("fill").and_then(Value::as_str))
        .map(str::to_owned)
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn f64_field(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(Value::as_f64)
}

/// Rebuild the live object for a stored record. Scale is reset to 1.
#[must_use]
pub fn deserialize_element(el: &PageElement) -> CanvasObject {
    let object_type = match el.kind {
        ElementKind::Text => "textbox".to_owned(),
        ElementKind::Shape => str_field(&el.content, "shape").unwrap_or_else(|| DEFAULT_SHAPE.to_owned()),
        ElementKind::Image | ElementKind::Sticker => "image".to_owned(),
        ElementKind::Emoji => "emoji".to_owned(),
        ElementKind::Mood => "mood".to_owned(),
    };

    let mut obj = CanvasObject::new(object_type, mm_to_px(el.x), mm_to_px(el.y), mm_to_px(el.width), mm_to_px(el.height));
    obj.id = el.id;
    obj.angle = normalize_rotation(el.rotation);
    obj.opacity = f64_field(&el.style, "opacity").unwrap_or(1.0);
    obj.stroke = str_field(&el.style, "stroke");
    obj.stroke_width = f64_field(&el.style, "strokeWidth").unwrap_or(0.0);
    obj.fill = resolve_fill(&el.content, &el.style);
    obj.data = el.metadata.clone();

    match el.kind {
        ElementKind::Text => {
            obj.text = str_field(&el.content, "text");
            obj.font_family = str_field(&el.content, "fontFamily");
            obj.font_size = f64_field(&el.content, "fontSize");
            obj.font_weight = str_field(&el.content, "fontWeight");
            obj.font_style = str_field(&el.content, "fontStyle");
            obj.text_align = str_field(&el.content, "textAlign");
            obj.line_height = f64_field(&el.content, "lineHeight");
        }
        ElementKind::Image => obj.src = str_field(&el.content, "src"),
        ElementKind::Sticker => {
            obj.src = str_field(&el.content, "src");
            obj.sticker_id = el.sticker_id.or_else(|| {
                str_field(&el.content, "stickerId").and_then(|raw| match Uuid::parse_str(&raw) {
                    Ok(id) => Some(id),
                    Err(_) => None,
                })
            });
        }
        ElementKind::Emoji => {
            obj.text = str_field(&el.content, "emoji");
            obj.font_size = f64_field(&el.content, "fontSize");
        }
        ElementKind::Mood => obj.data = Some(el.content.clone()),
        ElementKind::Shape => {}
    }
    obj
}

/// Rebuild a render list from stored records, lowest `z_index` first.
#[must_use]
pub fn reconstruct_scene(elements: &[PageElement]) -> Vec<CanvasObject> {
    let mut ordered: Vec<&PageElement> = elements.iter().collect();
    ordered.sort_by_key(|el| el.z_index);
    ordered.into_iter().map(deserialize_element).collect()
}

#[cfg(test)]
#[path = "serialize_test.rs"]
mod tests;
