//! In-memory throttle for failed logins.
//!
//! DESIGN
//! ======
//! Sliding-window counters backed by `HashMap<String, VecDeque<Instant>>`,
//! keyed by normalized email. Only failures are recorded; once an email has
//! `max_failures` inside the window, further attempts are refused until the
//! oldest failure ages out. A successful login clears the email's history.
//!
//! TRADE-OFFS
//! ==========
//! State is per process and lost on restart. That is acceptable for slowing
//! down password guessing; it is not an account lockout mechanism.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::config::LoginLimitConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("too many failed login attempts; retry in {retry_after_secs}s")]
pub struct LoginThrottled {
    pub retry_after_secs: u64,
}

#[derive(Clone)]
pub struct LoginLimiter {
    inner: Arc<Mutex<HashMap<String, VecDeque<Instant>>>>,
    config: LoginLimitConfig,
}

impl LoginLimiter {
    #[must_use]
    pub fn new(config: LoginLimitConfig) -> Self {
        Self { inner: Arc::new(Mutex::new(HashMap::new())), config }
    }

    /// Refuse the attempt if `key` is over its failure budget.
    ///
    /// # Errors
    ///
    /// Returns [`LoginThrottled`] with the time until the oldest failure
    /// leaves the window.
    pub fn check(&self, key: &str) -> Result<(), LoginThrottled> {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> Result<(), LoginThrottled> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(failures) = inner.get_mut(key) else {
            return Ok(());
        };
        prune_window(failures, now, self.config.window);
        if failures.len() < self.config.max_failures {
            if failures.is_empty() {
                inner.remove(key);
            }
            return Ok(());
        }
        let retry_after = failures
            .front()
            .map_or(Duration::ZERO, |&oldest| self.config.window.saturating_sub(now.duration_since(oldest)));
        Err(LoginThrottled { retry_after_secs: retry_after.as_secs().max(1) })
    }

    pub fn record_failure(&self, key: &str) {
        self.record_failure_at(key, Instant::now());
    }

    fn record_failure_at(&self, key: &str, now: Instant) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let failures = inner.entry(key.to_owned()).or_default();
        prune_window(failures, now, self.config.window);
        failures.push_back(now);
    }

    /// Forget `key`'s failures after a successful login.
    pub fn reset(&self, key: &str) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

fn prune_window(deque: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&front) = deque.front() {
        if now.duration_since(front) > window {
            deque.pop_front();
        } else {
            break;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[path = "rate_limit_test.rs"]
mod tests;
