//! Audit log: who changed what, written off the request path.
//!
//! DESIGN
//! ======
//! Handlers call [`AuditLog::record`] after a successful mutation. Events go
//! through a bounded queue to a batched writer task, so request latency never
//! includes the audit insert.
//!
//! ERROR HANDLING
//! ==============
//! Auditing is best-effort. A full or closed queue drops the event with a
//! warning; a batch that still fails after its retries is dropped with a
//! warning. Neither ever fails the originating request.

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use sqlx::{PgPool, QueryBuilder, Row};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::env_parse;

const DEFAULT_AUDIT_QUEUE_CAPACITY: usize = 1024;
const DEFAULT_AUDIT_BATCH_SIZE: usize = 64;
const DEFAULT_AUDIT_FLUSH_MS: u64 = 250;
const DEFAULT_AUDIT_RETRIES: usize = 3;
const DEFAULT_AUDIT_RETRY_BASE_MS: u64 = 50;

pub const DEFAULT_LIST_LIMIT: i64 = 50;
pub const MAX_LIST_LIMIT: i64 = 200;

// =============================================================================
// TYPES
// =============================================================================

/// One audited mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub user_id: Option<Uuid>,
    pub action: &'static str,
    pub entity_type: &'static str,
    pub entity_id: Option<Uuid>,
    pub details: Value,
}

impl AuditEvent {
    #[must_use]
    pub fn new(user_id: Uuid, action: &'static str, entity_type: &'static str, entity_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            action,
            entity_type,
            entity_id: Some(entity_id),
            details: Value::Object(serde_json::Map::new()),
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }
}

/// Row returned by `GET /api/audit`.
#[derive(Debug, Clone, Serialize)]
pub struct AuditRow {
    pub id: i64,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<Uuid>,
    pub details: Value,
    pub created_at: i64,
}

/// Tuning knobs for the audit writer, loaded from environment variables.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AuditConfig {
    pub(crate) queue_capacity: usize,
    pub(crate) batch_size: usize,
    pub(crate) flush_ms: u64,
    pub(crate) retries: usize,
    pub(crate) retry_base_ms: u64,
}

impl AuditConfig {
    pub(crate) fn from_env() -> Self {
        Self {
            queue_capacity: env_parse("AUDIT_QUEUE_CAPACITY", DEFAULT_AUDIT_QUEUE_CAPACITY).max(1),
            batch_size: env_parse("AUDIT_BATCH_SIZE", DEFAULT_AUDIT_BATCH_SIZE).max(1),
            flush_ms: env_parse("AUDIT_FLUSH_MS", DEFAULT_AUDIT_FLUSH_MS).max(1),
            retries: env_parse("AUDIT_RETRIES", DEFAULT_AUDIT_RETRIES).max(1),
            retry_base_ms: env_parse("AUDIT_RETRY_BASE_MS", DEFAULT_AUDIT_RETRY_BASE_MS),
        }
    }
}

// =============================================================================
// QUEUE
// =============================================================================

/// Cheap, cloneable handle for enqueueing audit events.
#[derive(Clone)]
pub struct AuditLog {
    tx: Option<mpsc::Sender<AuditEvent>>,
}

impl AuditLog {
    /// A log that discards every event. Used when no writer is running.
    #[must_use]
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// A log feeding `capacity` events into the returned receiver.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<AuditEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx: Some(tx) }, rx)
    }

    /// Best-effort, non-blocking enqueue.
    pub fn record(&self, event: AuditEvent) {
        let Some(tx) = &self.tx else {
            return;
        };
        match tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(action = event.action, entity_type = event.entity_type, "audit queue full; dropping event");
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                warn!(action = event.action, entity_type = event.entity_type, "audit queue closed; dropping event");
            }
        }
    }
}

/// Spawn the batched audit writer and return its queue handle.
pub fn spawn_audit_writer(pool: PgPool) -> (AuditLog, JoinHandle<()>) {
    let config = AuditConfig::from_env();
    let (log, mut rx) = AuditLog::channel(config.queue_capacity);

    info!(
        queue_capacity = config.queue_capacity,
        batch_size = config.batch_size,
        flush_ms = config.flush_ms,
        retries = config.retries,
        "audit writer configured"
    );

    let handle = tokio::spawn(async move {
        let mut batch: Vec<AuditEvent> = Vec::with_capacity(config.batch_size);
        let mut ticker = tokio::time::interval(Duration::from_millis(config.flush_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                maybe_event = rx.recv() => {
                    if let Some(event) = maybe_event {
                        batch.push(event);
                        if batch.len() >= config.batch_size {
                            flush_with_retry(&pool, &mut batch, config).await;
                        }
                    } else {
                        flush_with_retry(&pool, &mut batch, config).await;
                        break;
                    }
                }
                _ = ticker.tick() => {
                    flush_with_retry(&pool, &mut batch, config).await;
                }
            }
        }
    });

    (log, handle)
}

async fn flush_with_retry(pool: &PgPool, batch: &mut Vec<AuditEvent>, config: AuditConfig) {
    if batch.is_empty() {
        return;
    }

    let drained = std::mem::take(batch);
    for attempt in 1..=config.retries {
        match insert_batch(pool, &drained).await {
            Ok(()) => return,
            Err(e) if attempt < config.retries => {
                warn!(error = %e, attempt, total = config.retries, count = drained.len(), "audit insert failed; retrying");
                tokio::time::sleep(Duration::from_millis((attempt as u64) * config.retry_base_ms)).await;
            }
            Err(e) => {
                warn!(error = %e, count = drained.len(), "audit insert failed after retries; dropping events");
                return;
            }
        }
    }
}

async fn insert_batch(pool: &PgPool, events: &[AuditEvent]) -> Result<(), sqlx::Error> {
    let mut builder = QueryBuilder::new("INSERT INTO audit_logs (user_id, action, entity_type, entity_id, details) ");
    builder.push_values(events, |mut row, event| {
        row.push_bind(event.user_id)
            .push_bind(event.action)
            .push_bind(event.entity_type)
            .push_bind(event.entity_id)
            .push_bind(&event.details);
    });
    builder.build().execute(pool).await?;
    Ok(())
}

// =============================================================================
// READ
// =============================================================================

/// Clamp a requested page size into `1..=MAX_LIST_LIMIT`.
#[must_use]
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, MAX_LIST_LIMIT)
}

/// Most recent audit entries for `user_id`, newest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_for_user(pool: &PgPool, user_id: Uuid, limit: i64) -> Result<Vec<AuditRow>, sqlx::Error> {
    let rows = sqlx::query(
        r"SELECT id, action, entity_type, entity_id, details,
                 (EXTRACT(EPOCH FROM created_at) * 1000)::BIGINT AS created_at
          FROM audit_logs
          WHERE user_id = $1
          ORDER BY created_at DESC, id DESC
          LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| AuditRow {
            id: r.get("id"),
            action: r.get("action"),
            entity_type: r.get("entity_type"),
            entity_id: r.get("entity_id"),
            details: r.get("details"),
            created_at: r.get("created_at"),
        })
        .collect())
}

#[cfg(test)]
#[path = "audit_test.rs"]
mod tests;
