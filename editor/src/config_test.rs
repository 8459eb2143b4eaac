use super::*;

#[test]
fn env_parse_missing_returns_default() {
    let val: usize = env_parse("__EDITOR_TEST_MISSING_KEY__", 42);
    assert_eq!(val, 42);
}

#[test]
fn env_parse_present_valid() {
    unsafe { std::env::set_var("__EDITOR_TEST_VALID__", " 17 ") };
    let val: u64 = env_parse("__EDITOR_TEST_VALID__", 0);
    assert_eq!(val, 17);
    unsafe { std::env::remove_var("__EDITOR_TEST_VALID__") };
}

#[test]
fn env_parse_present_invalid_returns_default() {
    unsafe { std::env::set_var("__EDITOR_TEST_INVALID__", "soon") };
    let val: u32 = env_parse("__EDITOR_TEST_INVALID__", 3);
    assert_eq!(val, 3);
    unsafe { std::env::remove_var("__EDITOR_TEST_INVALID__") };
}

#[test]
fn defaults_match_constants() {
    let config = EditorConfig::default();
    assert_eq!(config.history.max_size, 50);
    assert_eq!(config.history.debounce, Duration::from_millis(100));
    assert_eq!(config.autosave.debounce, Duration::from_millis(2000));
    assert_eq!(config.autosave.max_attempts, 3);
    assert_eq!(config.autosave.saved_reset, Duration::from_secs(3));
}

#[test]
fn backoff_doubles_per_attempt() {
    let config = AutoSaveConfig::default();
    assert_eq!(config.backoff(1), Duration::from_secs(1));
    assert_eq!(config.backoff(2), Duration::from_secs(2));
    assert_eq!(config.backoff(3), Duration::from_secs(4));
}

#[test]
fn backoff_exponent_is_capped() {
    let config = AutoSaveConfig { retry_base: Duration::from_millis(1), ..AutoSaveConfig::default() };
    assert_eq!(config.backoff(100), Duration::from_millis(1 << 16));
}
