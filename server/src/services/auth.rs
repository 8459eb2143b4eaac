//! Account and token service: registration, password login, JWT issue and
//! verification, logout revocation.
//!
//! DESIGN
//! ======
//! Access tokens are stateless HS256 JWTs carrying the user id (`sub`) and a
//! random `jti`. Logout stores the SHA-256 fingerprint of the presented token
//! in `revoked_tokens` until the token's own expiry; the auth extractor
//! rejects fingerprints found there. A background sweeper deletes rows whose
//! token has expired anyway.
//!
//! ERROR HANDLING
//! ==============
//! Unknown email and wrong password are deliberately the same
//! `InvalidCredentials` error. Argon2 runs on the blocking pool so a burst of
//! logins never stalls the async workers.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};
use uuid::Uuid;

use crate::config::JwtConfig;
use crate::services::validation::{self, ValidationError};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("email already registered")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("token has been revoked")]
    Revoked,
    #[error("user not found")]
    UserNotFound,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("token signing failed: {0}")]
    Token(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// JWT payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub created_at: i64,
}

/// A freshly signed access token.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    /// Unix seconds.
    pub expires_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct RegisterInput {
    pub email: String,
    pub password: String,
    pub display_name: Option<String>,
}

// =============================================================================
// JWT
// =============================================================================

/// Signing and verification keys derived from [`JwtConfig`].
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl JwtKeys {
    #[must_use]
    pub fn new(config: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            ttl: config.ttl,
        }
    }

    /// Sign a token for `user_id` valid for the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Token`] if signing fails.
    pub fn issue(&self, user_id: Uuid) -> Result<IssuedToken, AuthError> {
        self.issue_at(user_id, unix_now())
    }

    pub(crate) fn issue_at(&self, user_id: Uuid, now: i64) -> Result<IssuedToken, AuthError> {
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let claims = Claims { sub: user_id, jti: Uuid::new_v4(), iat: now, exp: now.saturating_add(ttl) };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Token(e.to_string()))?;
        Ok(IssuedToken { token, expires_at: claims.exp })
    }

    /// Check signature and expiry.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidToken`] for any malformed, forged or
    /// expired token.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::InvalidToken)
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

/// SHA-256 hex fingerprint of a raw token, used as the revocation key.
#[must_use]
pub fn token_fingerprint(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    let bytes = hasher.finalize();
    bytes.iter().map(|b| format!("{b:02x}")).collect::<String>()
}

// =============================================================================
// PASSWORDS
// =============================================================================

/// Argon2id PHC string for `password` with a random salt.
///
/// # Errors
///
/// Returns [`AuthError::Hash`] if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let mut salt_bytes = [0_u8; 16];
    rand::rng().fill(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| AuthError::Hash(e.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

/// `true` if `password` matches the stored PHC string. An unparsable hash
/// never matches.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

async fn hash_password_blocking(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AuthError::Hash(e.to_string()))?
}

async fn verify_password_blocking(password: String, hash: String) -> Result<bool, AuthError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AuthError::Hash(e.to_string()))
}

// =============================================================================
// ACCOUNTS
// =============================================================================

/// Create an account.
///
/// # Errors
///
/// Returns a validation error for bad input, [`AuthError::EmailTaken`] if
/// the email is registered, or a database error.
pub async fn register(pool: &PgPool, input: RegisterInput) -> Result<UserRow, AuthError> {
    let email = validation::normalize_email(&input.email)?;
    validation::password(&input.password)?;
    let display_name = validation::display_name(input.display_name.as_deref(), &email)?;
    let password_hash = hash_password_blocking(input.password).await?;

    let row = sqlx::query(
        r"INSERT INTO users (email, display_name, password_hash)
          VALUES ($1, $2, $3)
          ON CONFLICT (email) DO NOTHING
          RETURNING id, (EXTRACT(EPOCH FROM created_at) * 1000)::BIGINT AS created_at",
    )
    .bind(&email)
    .bind(&display_name)
    .bind(&password_hash)
    .fetch_optional(pool)
    .await?
    .ok_or(AuthError::EmailTaken)?;

    info!(user_id = %row.get::<Uuid, _>("id"), "user registered");
    Ok(UserRow { id: row.get("id"), email, display_name, created_at: row.get("created_at") })
}

/// Check credentials and return the user.
///
/// # Errors
///
/// Returns [`AuthError::InvalidCredentials`] for an unknown email or wrong
/// password.
pub async fn login(pool: &PgPool, email: &str, password: &str) -> Result<UserRow, AuthError> {
    let email = validation::normalize_email(email).map_err(|_| AuthError::InvalidCredentials)?;
    let row = sqlx::query(
        r"SELECT id, email, display_name, password_hash,
                 (EXTRACT(EPOCH FROM created_at) * 1000)::BIGINT AS created_at
          FROM users
          WHERE email = $1",
    )
    .bind(&email)
    .fetch_optional(pool)
    .await?
    .ok_or(AuthError::InvalidCredentials)?;

    let hash: String = row.get("password_hash");
    if !verify_password_blocking(password.to_owned(), hash).await? {
        return Err(AuthError::InvalidCredentials);
    }
    Ok(UserRow {
        id: row.get("id"),
        email: row.get("email"),
        display_name: row.get("display_name"),
        created_at: row.get("created_at"),
    })
}

/// # Errors
///
/// Returns [`AuthError::UserNotFound`] or a database error.
pub async fn find_user(pool: &PgPool, user_id: Uuid) -> Result<UserRow, AuthError> {
    let row = sqlx::query(
        r"SELECT id, email, display_name,
                 (EXTRACT(EPOCH FROM created_at) * 1000)::BIGINT AS created_at
          FROM users
          WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AuthError::UserNotFound)?;

    Ok(UserRow {
        id: row.get("id"),
        email: row.get("email"),
        display_name: row.get("display_name"),
        created_at: row.get("created_at"),
    })
}

// =============================================================================
// REVOCATION
// =============================================================================

/// Revoke a token until its expiry. Revoking twice is a no-op.
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn revoke(pool: &PgPool, token: &str, claims: &Claims) -> Result<(), AuthError> {
    sqlx::query(
        r"INSERT INTO revoked_tokens (token_hash, user_id, expires_at)
          VALUES ($1, $2, to_timestamp($3::float8))
          ON CONFLICT (token_hash) DO NOTHING",
    )
    .bind(token_fingerprint(token))
    .bind(claims.sub)
    .bind(claims.exp)
    .execute(pool)
    .await?;
    Ok(())
}

/// # Errors
///
/// Returns a database error if the lookup fails.
pub async fn is_revoked(pool: &PgPool, token: &str) -> Result<bool, AuthError> {
    let row = sqlx::query("SELECT EXISTS (SELECT 1 FROM revoked_tokens WHERE token_hash = $1) AS revoked")
        .bind(token_fingerprint(token))
        .fetch_one(pool)
        .await?;
    Ok(row.get("revoked"))
}

/// Delete revocation rows for tokens that have expired on their own.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn purge_expired_revocations(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at <= now()")
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Spawn the periodic revocation sweeper. Returns a handle for shutdown.
pub fn spawn_revocation_sweeper(pool: PgPool, every: Duration) -> JoinHandle<()> {
    info!(interval_secs = every.as_secs(), "revocation sweeper configured");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match purge_expired_revocations(&pool).await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "expired revocations purged"),
                Err(e) => error!(error = %e, "revocation sweep failed"),
            }
        }
    })
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
