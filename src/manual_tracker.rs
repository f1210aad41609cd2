//! Manually tracked message counter.
//!
//! Without a session the meter can still count messages by hand: the user
//! picks a plan tier (which fixes the limit), bumps the counter as they go,
//! and the counter drops back to zero every five hours.

use crate::config::MeterConfig;
use crate::usage_reset::{clamp_percent, format_countdown, ResetTimestamp, UsageSeverity};
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Length of a manual tracking window.
pub const RESET_WINDOW: Duration = Duration::from_secs(5 * 3600);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlanTier {
    #[default]
    Free,
    Pro,
    Team,
}

impl PlanTier {
    pub const ALL: [PlanTier; 3] = [PlanTier::Free, PlanTier::Pro, PlanTier::Team];

    /// Approximate messages allowed per window.
    pub fn message_limit(&self) -> u32 {
        match self {
            PlanTier::Free => 50,
            PlanTier::Pro => 500,
            PlanTier::Team => 1000,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Free => "free",
            PlanTier::Pro => "pro",
            PlanTier::Team => "team",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PlanTier::Free => "Free",
            PlanTier::Pro => "Pro",
            PlanTier::Team => "Team",
        }
    }

    /// Unknown values fall back to `Free`.
    pub fn parse(value: &str) -> Self {
        let value = value.trim().to_lowercase();
        PlanTier::ALL
            .into_iter()
            .find(|plan| plan.as_str() == value)
            .unwrap_or_default()
    }

    pub fn next(&self) -> Self {
        match self {
            PlanTier::Free => PlanTier::Pro,
            PlanTier::Pro => PlanTier::Team,
            PlanTier::Team => PlanTier::Free,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            PlanTier::Free => PlanTier::Team,
            PlanTier::Pro => PlanTier::Free,
            PlanTier::Team => PlanTier::Pro,
        }
    }
}

impl std::fmt::Display for PlanTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Counter state; always holds `current_usage <= usage_limit`.
#[derive(Debug, Clone, PartialEq)]
pub struct ManualTracker {
    pub logged_in: bool,
    pub plan: PlanTier,
    current_usage: u32,
    usage_limit: u32,
    pub reset_at: Option<ResetTimestamp>,
}

impl ManualTracker {
    pub fn from_config(config: &MeterConfig) -> Self {
        let usage_limit = config.usage_limit.max(1);
        Self {
            logged_in: config.logged_in,
            plan: PlanTier::parse(&config.plan_type),
            current_usage: config.current_usage.min(usage_limit),
            usage_limit,
            reset_at: config.reset_time.as_deref().and_then(ResetTimestamp::parse),
        }
    }

    pub fn write_to(&self, config: &mut MeterConfig) {
        config.logged_in = self.logged_in;
        config.plan_type = self.plan.as_str().to_string();
        config.current_usage = self.current_usage;
        config.usage_limit = self.usage_limit;
        config.reset_time = self.reset_at.and_then(|ts| ts.to_rfc3339());
    }

    pub fn current_usage(&self) -> u32 {
        self.current_usage
    }

    pub fn usage_limit(&self) -> u32 {
        self.usage_limit
    }

    /// Begins tracking on `plan` with `usage` messages already sent.
    pub fn start_tracking(&mut self, plan: PlanTier, usage: u32, now: DateTime<Utc>) {
        self.logged_in = true;
        self.plan = plan;
        self.usage_limit = plan.message_limit();
        self.current_usage = usage.min(self.usage_limit);
        self.reset_at = Some(ResetTimestamp::after(now, RESET_WINDOW));
        tracing::info!(
            "Manual tracking started on {} plan at {}/{}",
            plan,
            self.current_usage,
            self.usage_limit
        );
    }

    /// Counts one more message, stopping at the limit.
    pub fn increment(&mut self) {
        self.current_usage = self.current_usage.saturating_add(1).min(self.usage_limit);
    }

    pub fn set_usage(&mut self, usage: u32) {
        self.current_usage = usage.min(self.usage_limit);
    }

    pub fn reset_usage(&mut self) {
        self.current_usage = 0;
    }

    /// Applies an expired reset: once `now` reaches the reset time the counter
    /// returns to zero and the next reset is scheduled. Returns true when the
    /// state changed and should be saved.
    pub fn tick(&mut self, now: DateTime<Utc>) -> bool {
        match self.reset_at {
            Some(ts) if ts.has_passed(now) => {
                self.current_usage = 0;
                self.reset_at = Some(ResetTimestamp::after(now, RESET_WINDOW));
                tracing::info!("Manual usage window reset");
                true
            }
            _ => false,
        }
    }

    pub fn percentage(&self) -> f64 {
        clamp_percent(self.current_usage as f64 / self.usage_limit.max(1) as f64 * 100.0)
    }

    pub fn ratio(&self) -> f64 {
        self.percentage() / 100.0
    }

    pub fn severity(&self) -> UsageSeverity {
        UsageSeverity::from_percent(self.percentage())
    }

    pub fn usage_label(&self) -> String {
        format!(
            "{} / {} messages ({:.0}%)",
            self.current_usage,
            self.usage_limit,
            self.percentage()
        )
    }

    pub fn countdown_label(&self, now: DateTime<Utc>) -> String {
        match self.reset_at {
            Some(ts) => match ts.duration_from(now) {
                Some(left) => format!("Resets in: {}", format_countdown(left)),
                None => "Resetting...".to_string(),
            },
            None => "Resets in: --:--:--".to_string(),
        }
    }

    /// Stops tracking and clears the counter.
    pub fn logout(&mut self) {
        self.logged_in = false;
        self.current_usage = 0;
    }
}

impl Default for ManualTracker {
    fn default() -> Self {
        Self::from_config(&MeterConfig::default())
    }
}

#[cfg(test)]
#[path = "tests/manual_tracker_tests.rs"]
mod tests;
