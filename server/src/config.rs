//! Server configuration, loaded from environment variables.
//!
//! SYSTEM CONTEXT
//! ==============
//! `main` builds a `ServerConfig` once at startup. Missing required values
//! (`DATABASE_URL`, `JWT_SECRET`) abort startup with a `ConfigError`; tuning
//! knobs fall back to their `DEFAULT_*` constants when unset or unparsable.

use std::time::Duration;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_JWT_TTL_SECS: u64 = 86_400;
const DEFAULT_LOGIN_MAX_FAILURES: usize = 5;
const DEFAULT_LOGIN_WINDOW_SECS: u64 = 900;
const DEFAULT_REVOCATION_SWEEP_SECS: u64 = 3600;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

/// HS256 secrets shorter than this are rejected at startup.
pub const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Token signing settings.
#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl: Duration,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Failed-login throttle settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginLimitConfig {
    /// Failures allowed per email inside `window` before logins are refused.
    pub max_failures: usize,
    pub window: Duration,
}

impl Default for LoginLimitConfig {
    fn default() -> Self {
        Self { max_failures: DEFAULT_LOGIN_MAX_FAILURES, window: Duration::from_secs(DEFAULT_LOGIN_WINDOW_SECS) }
    }
}

impl LoginLimitConfig {
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            max_failures: env_parse("LOGIN_MAX_FAILURES", DEFAULT_LOGIN_MAX_FAILURES).max(1),
            window: Duration::from_secs(env_parse("LOGIN_WINDOW_SECS", DEFAULT_LOGIN_WINDOW_SECS)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    /// Upper bound on the Postgres pool size.
    pub db_max_connections: u32,
    pub port: u16,
    pub jwt: JwtConfig,
    pub login_limit: LoginLimitConfig,
    /// Interval between sweeps of expired revoked-token rows.
    pub revocation_sweep: Duration,
}

impl ServerConfig {
    /// Read the full server configuration from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required variable is missing or the JWT
    /// secret is too short.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = required("DATABASE_URL")?;
        let secret = required("JWT_SECRET")?;
        Ok(Self {
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS).max(1),
            port: env_parse("PORT", DEFAULT_PORT),
            jwt: jwt_config(secret, env_parse("JWT_TTL_SECS", DEFAULT_JWT_TTL_SECS))?,
            login_limit: LoginLimitConfig::from_env(),
            revocation_sweep: Duration::from_secs(
                env_parse("REVOCATION_SWEEP_SECS", DEFAULT_REVOCATION_SWEEP_SECS).max(1),
            ),
        })
    }
}

/// Validate signing settings.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] for a short secret or zero TTL.
pub fn jwt_config(secret: String, ttl_secs: u64) -> Result<JwtConfig, ConfigError> {
    if secret.len() < MIN_JWT_SECRET_LEN {
        return Err(ConfigError::Invalid {
            key: "JWT_SECRET",
            reason: format!("must be at least {MIN_JWT_SECRET_LEN} characters"),
        });
    }
    if ttl_secs == 0 {
        return Err(ConfigError::Invalid { key: "JWT_TTL_SECS", reason: "must be greater than 0".into() });
    }
    Ok(JwtConfig { secret, ttl: Duration::from_secs(ttl_secs) })
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
