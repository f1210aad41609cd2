use super::*;
use chrono::TimeZone;
use proptest::prelude::*;

fn at(epoch: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(epoch, 0).unwrap()
}

fn tracking(plan: PlanTier, usage: u32, now: DateTime<Utc>) -> ManualTracker {
    let mut tracker = ManualTracker::default();
    tracker.start_tracking(plan, usage, now);
    tracker
}

#[test]
fn test_plan_limits() {
    assert_eq!(PlanTier::Free.message_limit(), 50);
    assert_eq!(PlanTier::Pro.message_limit(), 500);
    assert_eq!(PlanTier::Team.message_limit(), 1000);
}

#[test]
fn test_plan_parse_and_cycle() {
    assert_eq!(PlanTier::parse("PRO"), PlanTier::Pro);
    assert_eq!(PlanTier::parse("team"), PlanTier::Team);
    assert_eq!(PlanTier::parse("enterprise"), PlanTier::Free);
    for plan in PlanTier::ALL {
        assert_eq!(plan.next().previous(), plan);
        assert_eq!(PlanTier::parse(plan.as_str()), plan);
    }
}

#[test]
fn test_start_tracking_sets_limit_and_reset() {
    let now = at(1_000);
    let tracker = tracking(PlanTier::Pro, 12, now);
    assert!(tracker.logged_in);
    assert_eq!(tracker.usage_limit(), 500);
    assert_eq!(tracker.current_usage(), 12);
    assert_eq!(
        tracker.reset_at,
        Some(ResetTimestamp::from_epoch_seconds(1_000 + 5 * 3600))
    );
}

#[test]
fn test_start_tracking_clamps_initial_usage() {
    let tracker = tracking(PlanTier::Free, 75, at(0));
    assert_eq!(tracker.current_usage(), 50);
}

#[test]
fn test_increment_stops_at_limit() {
    let mut tracker = tracking(PlanTier::Free, 49, at(0));
    tracker.increment();
    assert_eq!(tracker.current_usage(), 50);
    tracker.increment();
    assert_eq!(tracker.current_usage(), 50);
    assert_eq!(tracker.percentage(), 100.0);
}

#[test]
fn test_set_and_reset_usage() {
    let mut tracker = tracking(PlanTier::Free, 0, at(0));
    tracker.set_usage(20);
    assert_eq!(tracker.current_usage(), 20);
    tracker.set_usage(9999);
    assert_eq!(tracker.current_usage(), 50);
    tracker.reset_usage();
    assert_eq!(tracker.current_usage(), 0);
}

#[test]
fn test_tick_before_reset_does_nothing() {
    let mut tracker = tracking(PlanTier::Free, 10, at(0));
    assert!(!tracker.tick(at(5 * 3600 - 1)));
    assert_eq!(tracker.current_usage(), 10);
}

#[test]
fn test_tick_at_reset_zeroes_counter_and_reschedules() {
    let mut tracker = tracking(PlanTier::Free, 10, at(0));
    let reset_moment = at(5 * 3600);
    assert!(tracker.tick(reset_moment));
    assert_eq!(tracker.current_usage(), 0);
    assert_eq!(
        tracker.reset_at,
        Some(ResetTimestamp::from_epoch_seconds(10 * 3600))
    );
    // The new reset is in the future, so a second tick is a no-op.
    assert!(!tracker.tick(reset_moment));
}

#[test]
fn test_tick_without_reset_time() {
    let mut tracker = ManualTracker::default();
    assert!(!tracker.tick(at(0)));
}

#[test]
fn test_labels() {
    let now = at(0);
    let tracker = tracking(PlanTier::Free, 25, now);
    assert_eq!(tracker.usage_label(), "25 / 50 messages (50%)");
    assert_eq!(tracker.countdown_label(now), "Resets in: 05:00:00");
    assert_eq!(tracker.countdown_label(at(5 * 3600)), "Resetting...");
    assert_eq!(
        ManualTracker::default().countdown_label(now),
        "Resets in: --:--:--"
    );
}

#[test]
fn test_severity_follows_percentage() {
    let mut tracker = tracking(PlanTier::Free, 0, at(0));
    assert_eq!(tracker.severity(), UsageSeverity::Normal);
    tracker.set_usage(35);
    assert_eq!(tracker.severity(), UsageSeverity::Elevated);
    tracker.set_usage(45);
    assert_eq!(tracker.severity(), UsageSeverity::Critical);
}

#[test]
fn test_logout_clears_counter() {
    let mut tracker = tracking(PlanTier::Team, 300, at(0));
    tracker.logout();
    assert!(!tracker.logged_in);
    assert_eq!(tracker.current_usage(), 0);
}

#[test]
fn test_config_roundtrip() {
    let mut config = MeterConfig::default();
    let tracker = tracking(PlanTier::Pro, 42, at(1_700_000_000));
    tracker.write_to(&mut config);

    assert!(config.logged_in);
    assert_eq!(config.plan_type, "pro");
    assert_eq!(config.current_usage, 42);
    assert_eq!(config.usage_limit, 500);

    let restored = ManualTracker::from_config(&config);
    assert_eq!(restored, tracker);
}

#[test]
fn test_from_config_reads_naive_reset_time() {
    let config = MeterConfig {
        reset_time: Some("2025-10-19T18:30:00.123456".to_string()),
        ..Default::default()
    };
    assert!(ManualTracker::from_config(&config).reset_at.is_some());
}

proptest! {
    #[test]
    fn prop_usage_never_exceeds_limit(
        start in 0u32..2000,
        increments in 0usize..1200,
        plan_index in 0usize..3,
    ) {
        let mut tracker = tracking(PlanTier::ALL[plan_index], start, at(0));
        for _ in 0..increments {
            tracker.increment();
        }
        prop_assert!(tracker.current_usage() <= tracker.usage_limit());
        prop_assert!((0.0..=100.0).contains(&tracker.percentage()));
    }
}
