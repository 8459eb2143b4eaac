//! Editor tuning knobs, loaded from environment variables.

use std::time::Duration;

pub(crate) const DEFAULT_HISTORY_MAX_SIZE: usize = 50;
pub(crate) const DEFAULT_HISTORY_DEBOUNCE_MS: u64 = 100;
pub(crate) const DEFAULT_AUTOSAVE_DEBOUNCE_MS: u64 = 2000;
pub(crate) const DEFAULT_AUTOSAVE_MAX_ATTEMPTS: u32 = 3;
pub(crate) const DEFAULT_AUTOSAVE_RETRY_BASE_MS: u64 = 1000;
pub(crate) const DEFAULT_AUTOSAVE_SAVED_RESET_MS: u64 = 3000;

/// Undo/redo history settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum number of undo entries kept before the oldest is evicted.
    pub max_size: usize,
    /// Quiet period for `push_debounced`.
    pub debounce: Duration,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { max_size: DEFAULT_HISTORY_MAX_SIZE, debounce: Duration::from_millis(DEFAULT_HISTORY_DEBOUNCE_MS) }
    }
}

/// Auto-save settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoSaveConfig {
    /// Quiet period before a triggered save fires.
    pub debounce: Duration,
    /// Total save attempts, including the first.
    pub max_attempts: u32,
    /// Backoff unit; attempt `n` waits `retry_base * 2^(n-1)` after failing.
    pub retry_base: Duration,
    /// How long the `Saved` status is shown before reverting to `Idle`.
    pub saved_reset: Duration,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_AUTOSAVE_DEBOUNCE_MS),
            max_attempts: DEFAULT_AUTOSAVE_MAX_ATTEMPTS,
            retry_base: Duration::from_millis(DEFAULT_AUTOSAVE_RETRY_BASE_MS),
            saved_reset: Duration::from_millis(DEFAULT_AUTOSAVE_SAVED_RESET_MS),
        }
    }
}

impl AutoSaveConfig {
    /// Delay after failed attempt `attempt` (1-based).
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.retry_base.saturating_mul(1_u32 << exponent)
    }
}

/// Combined editor configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EditorConfig {
    pub history: HistoryConfig,
    pub autosave: AutoSaveConfig,
}

impl EditorConfig {
    /// Build from `HISTORY_*` and `AUTOSAVE_*` environment variables,
    /// falling back to defaults for missing or unparsable values.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            history: HistoryConfig {
                max_size: env_parse("HISTORY_MAX_SIZE", DEFAULT_HISTORY_MAX_SIZE).max(1),
                debounce: Duration::from_millis(env_parse("HISTORY_DEBOUNCE_MS", DEFAULT_HISTORY_DEBOUNCE_MS)),
            },
            autosave: AutoSaveConfig {
                debounce: Duration::from_millis(env_parse("AUTOSAVE_DEBOUNCE_MS", DEFAULT_AUTOSAVE_DEBOUNCE_MS)),
                max_attempts: env_parse("AUTOSAVE_MAX_ATTEMPTS", DEFAULT_AUTOSAVE_MAX_ATTEMPTS).max(1),
                retry_base: Duration::from_millis(env_parse("AUTOSAVE_RETRY_BASE_MS", DEFAULT_AUTOSAVE_RETRY_BASE_MS)),
                saved_reset: Duration::from_millis(env_parse(
                    "AUTOSAVE_SAVED_RESET_MS",
                    DEFAULT_AUTOSAVE_SAVED_RESET_MS,
                )),
            },
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
