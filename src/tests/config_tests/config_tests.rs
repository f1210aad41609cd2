//! Tests for loading, saving and clamping the persisted meter config

use super::*;
use crate::usage_reset::ResetTimestamp;
use proptest::prelude::*;
use tempfile::TempDir;

#[test]
fn test_defaults() {
    let config = MeterConfig::default();
    assert_eq!(config.position, Position { x: 20, y: 80 });
    assert_eq!(config.opacity, 0.9);
    assert_eq!(config.poll_interval, 60);
    assert!(!config.has_session());
    assert!(!config.logged_in);
    assert_eq!(config.current_usage, 0);
    assert_eq!(config.usage_limit, 100);
    assert_eq!(config.plan_type, "free");
    assert_eq!(config.reset_time, None);
}

#[test]
fn test_load_missing_file_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let config = MeterConfig::load(&dir.path().join("nope.json"));
    assert_eq!(config, MeterConfig::default());
}

#[test]
fn test_load_malformed_file_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ this is not json").unwrap();
    assert_eq!(MeterConfig::load(&path), MeterConfig::default());
}

#[test]
fn test_load_drops_only_mistyped_keys() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
  "poll_interval": 60.0,
  "opacity": "high",
  "session_key": "sk-keep",
  "position": {"x": 5, "y": 6},
  "theme": "dark"
}"#,
    )
    .unwrap();

    let config = MeterConfig::load(&path);
    assert_eq!(config.session_key.as_deref(), Some("sk-keep"));
    assert_eq!(config.position, Position { x: 5, y: 6 });
    assert_eq!(config.poll_interval, 60);
    assert_eq!(config.opacity, 0.9);
    assert_eq!(config.extra.get("theme"), Some(&serde_json::json!("dark")));

    config.save(&path).unwrap();
    assert_eq!(MeterConfig::load(&path).session_key.as_deref(), Some("sk-keep"));
}

#[test]
fn test_load_non_object_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "[1, 2, 3]").unwrap();
    assert_eq!(MeterConfig::load(&path), MeterConfig::default());
}

#[test]
fn test_load_merges_partial_file_with_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"opacity": 0.5, "session_key": "abc"}"#).unwrap();

    let config = MeterConfig::load(&path);
    assert_eq!(config.opacity, 0.5);
    assert_eq!(config.session_key.as_deref(), Some("abc"));
    assert_eq!(config.poll_interval, 60);
    assert_eq!(config.position, Position::default());
}

#[test]
fn test_load_clamps_out_of_range_values() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{"opacity": 0.05, "poll_interval": 5000, "current_usage": 900, "usage_limit": 50}"#,
    )
    .unwrap();

    let config = MeterConfig::load(&path);
    assert_eq!(config.opacity, MIN_OPACITY);
    assert_eq!(config.poll_interval, MAX_POLL_INTERVAL_SECS);
    assert_eq!(config.current_usage, 50);
}

#[test]
fn test_save_load_roundtrip_preserves_unknown_keys() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.json");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, r#"{"theme": "dark", "poll_interval": 30}"#).unwrap();

    let mut config = MeterConfig::load(&path);
    config.set_position(5, 7);
    config.store_session("sk-test", Some("sessionKey=sk-test; cf=1"));
    config.save(&path).unwrap();

    let reloaded = MeterConfig::load(&path);
    assert_eq!(reloaded, config);
    assert_eq!(reloaded.extra.get("theme"), Some(&serde_json::json!("dark")));
    assert_eq!(reloaded.poll_interval, 30);
    assert_eq!(reloaded.position, Position { x: 5, y: 7 });
}

#[test]
fn test_save_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("a").join("b").join("config.json");
    MeterConfig::default().save(&path).unwrap();
    assert!(path.exists());
}

#[test]
fn test_setters_clamp() {
    let mut config = MeterConfig::default();
    config.set_opacity(2.0);
    assert_eq!(config.opacity, MAX_OPACITY);
    config.set_opacity(0.0);
    assert_eq!(config.opacity, MIN_OPACITY);
    config.set_poll_interval(1);
    assert_eq!(config.poll_interval, MIN_POLL_INTERVAL_SECS);
    assert_eq!(config.poll_interval_duration(), Duration::from_secs(10));
    config.set_position(-4, 3);
    assert_eq!(config.position, Position { x: 0, y: 3 });
}

#[test]
fn test_store_and_clear_session() {
    let mut config = MeterConfig::default();
    config.store_session("  sk-key  ", Some("   "));
    assert!(config.has_session());
    assert_eq!(config.session_key.as_deref(), Some("sk-key"));
    assert_eq!(config.cookie_string, None);

    config.cached_utilization = Some(12.0);
    config.clear_session();
    assert!(!config.has_session());
    assert_eq!(config.cached_utilization, None);
}

#[test]
fn test_blank_session_key_is_not_a_session() {
    let config = MeterConfig {
        session_key: Some("   ".to_string()),
        ..Default::default()
    };
    assert!(!config.has_session());
}

#[test]
fn test_cache_usage_roundtrip() {
    let mut config = MeterConfig::default();
    assert!(config.cached_window().is_none());

    let ts = ResetTimestamp::from_epoch_seconds(1_700_000_000);
    config.cache_usage(&UsageWindow::new(64.0, Some(ts)));

    let window = config.cached_window().unwrap();
    assert_eq!(window.utilization, 64.0);
    assert_eq!(window.resets_at, Some(ts));
}

#[test]
fn test_cache_usage_keeps_raw_reset() {
    let mut config = MeterConfig::default();
    config.cache_usage(&UsageWindow::from_reported(
        5.0,
        Some("soon"),
        UsageWindowSpan::Hours(5),
    ));
    assert_eq!(config.cached_resets_at.as_deref(), Some("soon"));
}

#[test]
fn test_reads_manual_tracking_file_with_naive_reset_time() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
        &path,
        r#"{
  "position": {"x": 412, "y": 33},
  "opacity": 0.75,
  "logged_in": true,
  "api_key": "",
  "current_usage": 12,
  "usage_limit": 500,
  "reset_time": "2025-10-19T18:30:00.123456",
  "plan_type": "pro"
}"#,
    )
    .unwrap();

    let config = MeterConfig::load(&path);
    assert!(config.logged_in);
    assert_eq!(config.plan_type, "pro");
    assert_eq!(config.usage_limit, 500);
    assert_eq!(config.position, Position { x: 412, y: 33 });
    assert!(config.extra.contains_key("api_key"));
}

proptest! {
    #[test]
    fn prop_opacity_always_in_range(value in proptest::num::f64::ANY) {
        let mut config = MeterConfig::default();
        config.set_opacity(value);
        prop_assert!((MIN_OPACITY..=MAX_OPACITY).contains(&config.opacity));
    }

    #[test]
    fn prop_poll_interval_always_in_range(value in any::<u64>()) {
        let mut config = MeterConfig::default();
        config.set_poll_interval(value);
        prop_assert!((MIN_POLL_INTERVAL_SECS..=MAX_POLL_INTERVAL_SECS).contains(&config.poll_interval));
    }
}

#[test]
#[serial_test::serial]
fn test_load_default_uses_meter_home() {
    let home = TempDir::new().unwrap();
    let _guard = crate::meter_paths::set_home_for_test(home.path().to_path_buf());

    let (config, path) = MeterConfig::load_default(None).unwrap();
    assert_eq!(path, home.path().join(".usage-meter").join("config.json"));
    assert_eq!(config, MeterConfig::default());
}

#[test]
fn test_load_default_prefers_override() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("custom.json");
    let (_, resolved) = MeterConfig::load_default(Some(&path)).unwrap();
    assert_eq!(resolved, path);
}
