use serde_json::json;

use super::*;

#[test]
fn new_event_has_empty_details() {
    let user = Uuid::new_v4();
    let entity = Uuid::new_v4();
    let event = AuditEvent::new(user, "notebook.create", "notebook", entity);
    assert_eq!(event.user_id, Some(user));
    assert_eq!(event.entity_id, Some(entity));
    assert_eq!(event.details, json!({}));
}

#[tokio::test]
async fn record_enqueues_event() {
    let (log, mut rx) = AuditLog::channel(4);
    let event = AuditEvent::new(Uuid::new_v4(), "page.delete", "page", Uuid::new_v4())
        .with_details(json!({"page_number": 3}));
    log.record(event.clone());
    assert_eq!(rx.recv().await, Some(event));
}

#[tokio::test]
async fn full_queue_drops_without_blocking() {
    let (log, mut rx) = AuditLog::channel(1);
    let first = AuditEvent::new(Uuid::new_v4(), "a", "notebook", Uuid::new_v4());
    let second = AuditEvent::new(Uuid::new_v4(), "b", "notebook", Uuid::new_v4());
    log.record(first.clone());
    log.record(second);
    assert_eq!(rx.recv().await, Some(first));
    assert!(rx.try_recv().is_err());
}

#[test]
fn closed_queue_is_tolerated() {
    let (log, rx) = AuditLog::channel(1);
    drop(rx);
    log.record(AuditEvent::new(Uuid::new_v4(), "a", "notebook", Uuid::new_v4()));
}

#[test]
fn disabled_log_discards() {
    AuditLog::disabled().record(AuditEvent::new(Uuid::new_v4(), "a", "notebook", Uuid::new_v4()));
}

#[test]
fn clamp_limit_bounds() {
    assert_eq!(clamp_limit(None), DEFAULT_LIST_LIMIT);
    assert_eq!(clamp_limit(Some(0)), 1);
    assert_eq!(clamp_limit(Some(-5)), 1);
    assert_eq!(clamp_limit(Some(10_000)), MAX_LIST_LIMIT);
    assert_eq!(clamp_limit(Some(25)), 25);
}

#[test]
fn config_defaults_are_sane() {
    let cfg = AuditConfig::from_env();
    assert!(cfg.queue_capacity >= 1);
    assert!(cfg.batch_size >= 1);
    assert!(cfg.retries >= 1);
}
