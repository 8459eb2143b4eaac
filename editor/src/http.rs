//! HTTP save backend for the scrapbook server.
//!
//! Thin wrapper over `PUT /api/pages/{id}/elements`, which replaces every
//! element on the page in one transaction. Response handling is split into
//! pure helpers for testability.

use std::time::Duration;

use uuid::Uuid;

use crate::autosave::{SaveBackend, SaveError};
use crate::element::PageElement;

const REQUEST_TIMEOUT_SECS: u64 = 30;
const CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// CLIENT
// =============================================================================

pub struct HttpSaveBackend {
    http: reqwest::Client,
    url: String,
    token: String,
}

impl HttpSaveBackend {
    /// Backend saving `page_id` on the server at `base_url` with a bearer
    /// `token`.
    ///
    /// # Errors
    ///
    /// Returns [`SaveError::Other`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, page_id: Uuid, token: impl Into<String>) -> Result<Self, SaveError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| SaveError::Other(e.to_string()))?;
        Ok(Self { http, url: elements_url(base_url, page_id), token: token.into() })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl SaveBackend for HttpSaveBackend {
    async fn save(&self, elements: &[PageElement]) -> Result<(), SaveError> {
        let response = self
            .http
            .put(&self.url)
            .bearer_auth(&self.token)
            .json(&SaveRequest { elements })
            .send()
            .await
            .map_err(|e| SaveError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        if response.status().is_success() {
            return Ok(());
        }
        let body = response
            .text()
            .await
            .map_err(|e| SaveError::Transport(e.to_string()))?;
        Err(rejection(status, &body))
    }
}

// =============================================================================
// WIRE
// =============================================================================

#[derive(serde::Serialize)]
struct SaveRequest<'a> {
    elements: &'a [PageElement],
}

#[derive(serde::Deserialize)]
struct ErrorBody {
    error: String,
}

pub(crate) fn elements_url(base_url: &str, page_id: Uuid) -> String {
    format!("{}/api/pages/{page_id}/elements", base_url.trim_end_matches('/'))
}

/// Turn a non-2xx response into a [`SaveError`], using the server's
/// `{"error": ...}` message when present.
pub(crate) fn rejection(status: u16, body: &str) -> SaveError {
    let message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) => body.trim().to_owned(),
    };
    SaveError::Rejected { status, message }
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;
