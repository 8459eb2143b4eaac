use super::*;

fn limiter(max_failures: usize, window_secs: u64) -> LoginLimiter {
    LoginLimiter::new(LoginLimitConfig { max_failures, window: Duration::from_secs(window_secs) })
}

#[test]
fn allows_until_budget_spent() {
    let rl = limiter(3, 60);
    let now = Instant::now();

    for i in 0..3 {
        assert!(rl.check_at("ada@example.com", now).is_ok(), "attempt {i} should be allowed");
        rl.record_failure_at("ada@example.com", now);
    }
    let err = rl.check_at("ada@example.com", now).unwrap_err();
    assert_eq!(err.retry_after_secs, 60);
}

#[test]
fn other_keys_unaffected() {
    let rl = limiter(1, 60);
    let now = Instant::now();
    rl.record_failure_at("ada@example.com", now);
    assert!(rl.check_at("ada@example.com", now).is_err());
    assert!(rl.check_at("grace@example.com", now).is_ok());
}

#[test]
fn window_expiry_allows_new_attempts() {
    let rl = limiter(2, 60);
    let start = Instant::now();
    rl.record_failure_at("ada@example.com", start);
    rl.record_failure_at("ada@example.com", start + Duration::from_secs(30));
    assert!(rl.check_at("ada@example.com", start + Duration::from_secs(31)).is_err());

    // First failure ages out; one slot frees up.
    let later = start + Duration::from_secs(61);
    assert!(rl.check_at("ada@example.com", later).is_ok());
}

#[test]
fn retry_after_counts_down() {
    let rl = limiter(1, 100);
    let start = Instant::now();
    rl.record_failure_at("ada@example.com", start);
    let err = rl.check_at("ada@example.com", start + Duration::from_secs(40)).unwrap_err();
    assert_eq!(err.retry_after_secs, 60);
}

#[test]
fn reset_clears_history() {
    let rl = limiter(1, 60);
    let now = Instant::now();
    rl.record_failure_at("ada@example.com", now);
    rl.reset("ada@example.com");
    assert!(rl.check_at("ada@example.com", now).is_ok());
    assert_eq!(rl.tracked_keys(), 0);
}

#[test]
fn expired_entries_are_dropped_on_check() {
    let rl = limiter(5, 10);
    let start = Instant::now();
    rl.record_failure_at("ada@example.com", start);
    assert!(rl.check_at("ada@example.com", start + Duration::from_secs(11)).is_ok());
    assert_eq!(rl.tracked_keys(), 0);
}

#[test]
fn clones_share_state() {
    let rl = limiter(1, 60);
    let clone = rl.clone();
    let now = Instant::now();
    clone.record_failure_at("ada@example.com", now);
    assert!(rl.check_at("ada@example.com", now).is_err());
}

#[test]
fn throttled_message_mentions_wait() {
    let err = LoginThrottled { retry_after_secs: 42 };
    assert_eq!(err.to_string(), "too many failed login attempts; retry in 42s");
}
