//! User-visible notification sink (toasts).
//!
//! Notifications are fire-and-forget: a sink must never block or fail the
//! caller.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Success,
    Warning,
    Error,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, level: NotifyLevel, message: &str);
}

/// Default sink: forwards notifications to the tracing subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        match level {
            NotifyLevel::Success => info!(target: "editor::notify", "{message}"),
            NotifyLevel::Warning => warn!(target: "editor::notify", "{message}"),
            NotifyLevel::Error => error!(target: "editor::notify", "{message}"),
        }
    }
}

/// Keeps every notification in memory. Useful for hosts that render their
/// own toast list, and for tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    entries: Arc<Mutex<Vec<(NotifyLevel, String)>>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> Vec<(NotifyLevel, String)> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn count(&self, level: NotifyLevel) -> usize {
        self.entries()
            .iter()
            .filter(|(l, _)| *l == level)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_owned()));
    }
}
