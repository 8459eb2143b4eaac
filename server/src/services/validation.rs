//! Request validation shared by every service.
//!
//! Each check returns a [`ValidationError`] whose message is sent back to the
//! client verbatim as `{"error": message}` with status 400, so messages name
//! the offending field in plain words.

use serde_json::Value;

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;
pub const DISPLAY_NAME_MAX_LEN: usize = 100;
pub const TITLE_MAX_LEN: usize = 255;
pub const DESCRIPTION_MAX_LEN: usize = 2000;
pub const STICKER_NAME_MAX_LEN: usize = 100;
pub const URL_MAX_LEN: usize = 2048;
pub const ASSET_KEY_MAX_LEN: usize = 255;
pub const MAX_TAGS: usize = 20;
pub const TAG_MAX_LEN: usize = 50;
pub const MAX_INITIAL_PAGES: i32 = 200;
/// Upper bound for element coordinates and sizes, in millimetres.
pub const MAX_DIMENSION_MM: f64 = 10_000.0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

// =============================================================================
// ACCOUNTS
// =============================================================================

/// Lowercase and trim an email, requiring exactly one `@` with text on both
/// sides.
///
/// # Errors
///
/// Returns a [`ValidationError`] for anything that is not shaped like an
/// email address.
pub fn normalize_email(email: &str) -> Result<String, ValidationError> {
    let normalized = email.trim().to_ascii_lowercase();
    let mut parts = normalized.split('@');
    let valid = matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(local), Some(domain), None) if !local.is_empty() && !domain.is_empty()
    );
    if !valid || normalized.chars().any(char::is_whitespace) {
        return Err(ValidationError::new("email must be a valid email address"));
    }
    Ok(normalized)
}

/// # Errors
///
/// Returns a [`ValidationError`] when the length is outside the allowed range.
pub fn password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if len < PASSWORD_MIN_LEN {
        return Err(ValidationError::new(format!(
            "password must be at least {PASSWORD_MIN_LEN} characters"
        )));
    }
    if len > PASSWORD_MAX_LEN {
        return Err(ValidationError::new(format!(
            "password must be at most {PASSWORD_MAX_LEN} characters"
        )));
    }
    Ok(())
}

/// Trimmed display name; falls back to the email's local part when blank.
///
/// # Errors
///
/// Returns a [`ValidationError`] when the name is too long.
pub fn display_name(name: Option<&str>, email: &str) -> Result<String, ValidationError> {
    let trimmed = name.map(str::trim).unwrap_or_default();
    let resolved = if trimmed.is_empty() {
        email.split('@').next().unwrap_or("user").to_owned()
    } else {
        trimmed.to_owned()
    };
    max_len("display_name", &resolved, DISPLAY_NAME_MAX_LEN)?;
    Ok(resolved)
}

// =============================================================================
// TEXT FIELDS
// =============================================================================

/// Trimmed, non-empty string of at most `max` characters.
///
/// # Errors
///
/// Returns a [`ValidationError`] naming `field`.
pub fn required_text(field: &str, value: &str, max: usize) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(format!("{field} is required")));
    }
    max_len(field, trimmed, max)?;
    Ok(trimmed.to_owned())
}

/// Optional text; blank becomes `None`.
///
/// # Errors
///
/// Returns a [`ValidationError`] naming `field` when too long.
pub fn optional_text(field: &str, value: Option<&str>, max: usize) -> Result<Option<String>, ValidationError> {
    let Some(trimmed) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    max_len(field, trimmed, max)?;
    Ok(Some(trimmed.to_owned()))
}

fn max_len(field: &str, value: &str, max: usize) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::new(format!("{field} must be at most {max} characters")));
    }
    Ok(())
}

/// `http(s)://` or root-relative URL.
///
/// # Errors
///
/// Returns a [`ValidationError`] naming `field`.
pub fn url(field: &str, value: &str) -> Result<String, ValidationError> {
    let trimmed = required_text(field, value, URL_MAX_LEN)?;
    let lower = trimmed.to_ascii_lowercase();
    if !(lower.starts_with("https://") || lower.starts_with("http://") || trimmed.starts_with('/')) {
        return Err(ValidationError::new(format!("{field} must be an http(s) or root-relative URL")));
    }
    Ok(trimmed)
}

/// Trimmed, de-duplicated, non-empty tags.
///
/// # Errors
///
/// Returns a [`ValidationError`] when there are too many tags or one is too
/// long.
pub fn tags(tags: &[String]) -> Result<Vec<String>, ValidationError> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let trimmed = tag.trim();
        if trimmed.is_empty() || out.iter().any(|t| t == trimmed) {
            continue;
        }
        max_len("tag", trimmed, TAG_MAX_LEN)?;
        out.push(trimmed.to_owned());
    }
    if out.len() > MAX_TAGS {
        return Err(ValidationError::new(format!("at most {MAX_TAGS} tags are allowed")));
    }
    Ok(out)
}

// =============================================================================
// ELEMENTS
// =============================================================================

/// Position, size and rotation of a page element, in millimetres/degrees.
///
/// # Errors
///
/// Returns a [`ValidationError`] naming the first field out of range.
pub fn geometry(x: f64, y: f64, width: f64, height: f64, rotation: f64) -> Result<(), ValidationError> {
    for (field, value) in [("x", x), ("y", y), ("width", width), ("height", height), ("rotation", rotation)] {
        if !value.is_finite() {
            return Err(ValidationError::new(format!("{field} must be a finite number")));
        }
    }
    for (field, value) in [("x", x), ("y", y)] {
        if !(0.0..=MAX_DIMENSION_MM).contains(&value) {
            return Err(ValidationError::new(format!("{field} must be between 0 and {MAX_DIMENSION_MM}")));
        }
    }
    for (field, value) in [("width", width), ("height", height)] {
        if value <= 0.0 {
            return Err(ValidationError::new(format!("{field} must be greater than 0")));
        }
        if value > MAX_DIMENSION_MM {
            return Err(ValidationError::new(format!("{field} must be at most {MAX_DIMENSION_MM}")));
        }
    }
    if !(-180.0..=180.0).contains(&rotation) {
        return Err(ValidationError::new("rotation must be between -180 and 180"));
    }
    Ok(())
}

/// Require a JSON object (used for `content`, `style` and `metadata`).
///
/// # Errors
///
/// Returns a [`ValidationError`] naming `field`.
pub fn json_object(field: &str, value: &Value) -> Result<(), ValidationError> {
    if value.is_object() {
        Ok(())
    } else {
        Err(ValidationError::new(format!("{field} must be a JSON object")))
    }
}

/// Number of pages to create with a new notebook.
///
/// # Errors
///
/// Returns a [`ValidationError`] outside `1..=MAX_INITIAL_PAGES`.
pub fn initial_pages(count: i32) -> Result<i32, ValidationError> {
    if !(1..=MAX_INITIAL_PAGES).contains(&count) {
        return Err(ValidationError::new(format!("page_count must be between 1 and {MAX_INITIAL_PAGES}")));
    }
    Ok(count)
}

#[cfg(test)]
#[path = "validation_test.rs"]
mod tests;
