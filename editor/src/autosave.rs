//! Auto-save controller: debounced, retrying, offline-tolerant persistence.
//!
//! DESIGN
//! ======
//! Edits call `trigger` with the full element list. Each call cancels the
//! previous debounce timer, so a burst of edits produces a single save with
//! the newest state. `force_save` skips the timer entirely.
//!
//! A save makes up to `max_attempts` calls to the injected [`SaveBackend`],
//! sleeping `retry_base * 2^(attempt-1)` between failures. Only one save is
//! ever in flight per controller: a request that arrives meanwhile is parked
//! (newest wins) and runs as soon as the current save finishes.
//!
//! Status moves `Idle -> Saving -> Saved | Error`; `Saved` falls back to
//! `Idle` after `saved_reset`. Changes are published on a watch channel.
//!
//! ERROR HANDLING
//! ==============
//! Exhausted retries never drop edits: the elements are written to the
//! [`FallbackStore`] under their page id and the user gets a warning. The
//! next successful save for that page purges the local copy. A fired
//! debounce hands the save to its own task, so cancelling a timer can never
//! cancel a save that already started. The retry loop itself also runs in a
//! spawned task: a caller that stops waiting leaves the save running, and a
//! task that dies mid-save releases the in-flight slot, keeps its batch in
//! the fallback store and restarts any parked request.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::AutoSaveConfig;
use crate::element::PageElement;
use crate::fallback::FallbackStore;
use crate::notify::{NotifyLevel, Notifier};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    Idle,
    Saving,
    Saved,
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error("save request failed: {0}")]
    Transport(String),
    #[error("server rejected save ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("save failed: {0}")]
    Other(String),
}

/// Persists a page's elements. Injected by the host.
#[async_trait::async_trait]
pub trait SaveBackend: Send + Sync {
    /// Save the full element list for one page.
    ///
    /// # Errors
    ///
    /// Returns a [`SaveError`] on any failure; the controller retries.
    async fn save(&self, elements: &[PageElement]) -> Result<(), SaveError>;
}

/// What a call to [`AutoSave::execute_save`] ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The backend accepted the save.
    Saved { attempts: u32 },
    /// Another save was in flight; this request runs after it.
    Queued,
    /// Retries exhausted; elements written to the fallback store.
    StoredLocally,
    /// Retries exhausted and the fallback write failed too.
    Lost,
}

struct Inner {
    status: SaveStatus,
    last_error: Option<String>,
    last_saved_at_ms: Option<i64>,
    in_flight: bool,
    queued: Option<Vec<PageElement>>,
    /// Outcome of a save whose task died before returning one.
    aborted_outcome: Option<SaveOutcome>,
    debounce: Option<JoinHandle<()>>,
    reset: Option<JoinHandle<()>>,
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// Auto-save controller for one page. Cloning yields another handle to the
/// same state.
#[derive(Clone)]
pub struct AutoSave {
    inner: Arc<Mutex<Inner>>,
    status_tx: Arc<watch::Sender<SaveStatus>>,
    backend: Arc<dyn SaveBackend>,
    fallback: Arc<dyn FallbackStore>,
    notifier: Arc<dyn Notifier>,
    config: AutoSaveConfig,
    page_hint: Option<Uuid>,
}

impl AutoSave {
    #[must_use]
    pub fn new(
        backend: Arc<dyn SaveBackend>,
        fallback: Arc<dyn FallbackStore>,
        notifier: Arc<dyn Notifier>,
        config: AutoSaveConfig,
    ) -> Self {
        let (status_tx, _) = watch::channel(SaveStatus::Idle);
        Self {
            inner: Arc::new(Mutex::new(Inner {
                status: SaveStatus::Idle,
                last_error: None,
                last_saved_at_ms: None,
                in_flight: false,
                queued: None,
                aborted_outcome: None,
                debounce: None,
                reset: None,
            })),
            status_tx: Arc::new(status_tx),
            backend,
            fallback,
            notifier,
            config,
            page_hint: None,
        }
    }

    /// Page used for the fallback key when a save carries no elements.
    #[must_use]
    pub fn with_page(mut self, page_id: Uuid) -> Self {
        self.page_hint = Some(page_id);
        self
    }

    #[must_use]
    pub fn status(&self) -> SaveStatus {
        self.lock().status
    }

    #[must_use]
    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    /// Unix ms of the last successful save.
    #[must_use]
    pub fn last_saved_at_ms(&self) -> Option<i64> {
        self.lock().last_saved_at_ms
    }

    #[must_use]
    pub fn is_saving(&self) -> bool {
        self.lock().in_flight
    }

    /// Receive every status transition.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SaveStatus> {
        self.status_tx.subscribe()
    }

    /// Schedule a save after the debounce window, replacing any pending one.
    pub fn trigger(&self, elements: Vec<PageElement>) {
        let this = self.clone();
        let delay = self.config.debounce;

        let mut inner = self.lock();
        if let Some(pending) = inner.debounce.take() {
            pending.abort();
        }
        inner.debounce = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Detach the save from the timer so a later abort cannot cut it short.
            tokio::spawn(async move {
                this.execute_save(elements).await;
            });
        }));
    }

    /// Cancel any pending debounce and save right away.
    pub async fn force_save(&self, elements: Vec<PageElement>) -> SaveOutcome {
        self.cancel_pending();
        self.execute_save(elements).await
    }

    /// Cancel the pending debounce timer, if any. In-flight saves continue.
    pub fn cancel_pending(&self) {
        if let Some(pending) = self.lock().debounce.take() {
            pending.abort();
        }
    }

    /// Save with retries, or park the request if a save is already running.
    ///
    /// The retry loop runs in its own task. Dropping this future stops the
    /// wait, not the save.
    pub async fn execute_save(&self, elements: Vec<PageElement>) -> SaveOutcome {
        {
            let mut inner = self.lock();
            if inner.in_flight {
                debug!(count = elements.len(), "save in flight; request queued");
                inner.queued = Some(elements);
                return SaveOutcome::Queued;
            }
            inner.in_flight = true;
        }

        let this = self.clone();
        match tokio::spawn(async move { this.drain(elements).await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "save task did not complete");
                self.lock().aborted_outcome.take().unwrap_or(SaveOutcome::Lost)
            }
        }
    }

    /// Save `elements`, then every request parked meanwhile, newest first.
    async fn drain(&self, elements: Vec<PageElement>) -> SaveOutcome {
        let mut guard = InFlight { save: self.clone(), batch: elements, done: false };
        loop {
            let outcome = self.save_with_retry(&guard.batch).await;
            let next = {
                let mut inner = self.lock();
                let next = inner.queued.take();
                if next.is_none() {
                    inner.in_flight = false;
                }
                next
            };
            match next {
                Some(queued) => guard.batch = queued,
                None => {
                    guard.done = true;
                    return outcome;
                }
            }
        }
    }

    async fn save_with_retry(&self, elements: &[PageElement]) -> SaveOutcome {
        {
            let mut inner = self.lock();
            if let Some(reset) = inner.reset.take() {
                reset.abort();
            }
            self.set_status(&mut inner, SaveStatus::Saving);
        }

        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.backend.save(elements).await {
                Ok(()) => {
                    self.finish_saved(elements, attempt);
                    return SaveOutcome::Saved { attempts: attempt };
                }
                Err(e) if attempt < max_attempts => {
                    let delay = self.config.backoff(attempt);
                    warn!(
                        error = %e,
                        attempt,
                        total = max_attempts,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "save failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return self.finish_failed(elements, &e),
            }
        }
    }

    fn finish_saved(&self, elements: &[PageElement], attempts: u32) {
        let page_id = self.page_for(elements);
        {
            let mut inner = self.lock();
            inner.last_error = None;
            inner.last_saved_at_ms = Some(now_ms());
            self.set_status(&mut inner, SaveStatus::Saved);

            let this = self.clone();
            let reset_after = self.config.saved_reset;
            inner.reset = Some(tokio::spawn(async move {
                tokio::time::sleep(reset_after).await;
                let mut inner = this.lock();
                if inner.status == SaveStatus::Saved {
                    this.set_status(&mut inner, SaveStatus::Idle);
                }
            }));
        }

        if let Some(page_id) = page_id {
            if let Err(e) = self.fallback.clear(page_id) {
                warn!(error = %e, %page_id, "could not purge local fallback after save");
            }
        }
        info!(count = elements.len(), attempts, "elements saved");
        self.notifier.notify(NotifyLevel::Success, "Changes saved");
    }

    fn finish_failed(&self, elements: &[PageElement], err: &SaveError) -> SaveOutcome {
        {
            let mut inner = self.lock();
            inner.last_error = Some(err.to_string());
            self.set_status(&mut inner, SaveStatus::Error);
        }
        error!(error = %err, count = elements.len(), "save failed after retries");

        let Some(page_id) = self.page_for(elements) else {
            error!("no page id for unsaved elements; cannot store locally");
            self.notifier
                .notify(NotifyLevel::Error, "Could not save your changes");
            return SaveOutcome::Lost;
        };

        match self.fallback.store(page_id, elements) {
            Ok(()) => {
                info!(%page_id, count = elements.len(), "unsaved elements stored locally");
                self.notifier.notify(
                    NotifyLevel::Warning,
                    "Could not reach the server; your changes are kept on this device",
                );
                SaveOutcome::StoredLocally
            }
            Err(e) => {
                error!(error = %e, %page_id, "local fallback write failed");
                self.notifier
                    .notify(NotifyLevel::Error, "Could not save your changes");
                SaveOutcome::Lost
            }
        }
    }

    fn page_for(&self, elements: &[PageElement]) -> Option<Uuid> {
        elements
            .first()
            .map(|el| el.page_id)
            .or(self.page_hint)
    }

    fn set_status(&self, inner: &mut Inner, status: SaveStatus) {
        inner.status = status;
        self.status_tx.send_replace(status);
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Releases the in-flight slot if a save task unwinds before finishing.
/// The batch being saved goes to the fallback store and any parked request
/// is restarted, so neither is dropped.
struct InFlight {
    save: AutoSave,
    batch: Vec<PageElement>,
    done: bool,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let err = SaveError::Other("save task stopped before completing".into());
        let outcome = self.save.finish_failed(&self.batch, &err);
        let queued = {
            let mut inner = self.save.lock();
            inner.in_flight = false;
            inner.aborted_outcome = Some(outcome);
            inner.queued.take()
        };
        if let Some(queued) = queued {
            let save = self.save.clone();
            tokio::spawn(async move {
                save.execute_save(queued).await;
            });
        }
    }
}

fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

#[cfg(test)]
#[path = "autosave_test.rs"]
mod tests;
