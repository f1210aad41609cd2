//! Usage windows with reset timestamps.
//!
//! `UsageWindow` pairs a utilization percentage with the moment its rate-limit
//! window restarts, and knows how to render the two labels the meter shows:
//! the usage text and the reset countdown.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Utilization at or above this percentage is shown as critical.
pub const CRITICAL_PERCENT: f64 = 90.0;
/// Utilization at or above this percentage is shown as elevated.
pub const ELEVATED_PERCENT: f64 = 70.0;

/// Represents the span/duration of a usage window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum UsageWindowSpan {
    /// Window duration is not known
    #[default]
    Unknown,
    Hours(u16),
    Days(u16),
}

impl UsageWindowSpan {
    /// Short label such as "5h" or "7d"; None when unknown.
    pub fn label(&self) -> Option<String> {
        match self {
            UsageWindowSpan::Unknown => None,
            UsageWindowSpan::Hours(h) if *h >= 24 && *h % 24 == 0 => Some(format!("{}d", h / 24)),
            UsageWindowSpan::Hours(h) => Some(format!("{}h", h)),
            UsageWindowSpan::Days(d) => Some(format!("{}d", d)),
        }
    }
}

/// Colour band for a utilization value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageSeverity {
    Normal,
    Elevated,
    Critical,
}

impl UsageSeverity {
    pub fn from_percent(percent: f64) -> Self {
        let percent = clamp_percent(percent);
        if percent >= CRITICAL_PERCENT {
            UsageSeverity::Critical
        } else if percent >= ELEVATED_PERCENT {
            UsageSeverity::Elevated
        } else {
            UsageSeverity::Normal
        }
    }
}

/// Clamps a utilization percentage into `[0, 100]`. NaN maps to 0.
pub fn clamp_percent(percent: f64) -> f64 {
    if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    }
}

/// An absolute reset timestamp stored as Unix epoch seconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResetTimestamp {
    pub epoch_seconds: i64,
}

impl ResetTimestamp {
    pub fn from_epoch_seconds(seconds: i64) -> Self {
        Self {
            epoch_seconds: seconds,
        }
    }

    pub fn from_datetime<Tz: TimeZone>(dt: &DateTime<Tz>) -> Self {
        Self::from_epoch_seconds(dt.timestamp())
    }

    /// Creates a reset timestamp `duration` after `now`.
    pub fn after(now: DateTime<Utc>, duration: Duration) -> Self {
        Self::from_epoch_seconds(now.timestamp().saturating_add(duration.as_secs() as i64))
    }

    /// Parses an RFC 3339 timestamp, or a naive ISO-8601 timestamp taken as
    /// local time. Returns None for anything else.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
            return Some(Self::from_datetime(&dt));
        }
        let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| Self::from_datetime(&dt))
    }

    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.epoch_seconds, 0)
    }

    pub fn to_rfc3339(self) -> Option<String> {
        self.to_datetime().map(|dt| dt.to_rfc3339())
    }

    /// Time left between `now` and this timestamp, or None once it has passed.
    pub fn duration_from(&self, now: DateTime<Utc>) -> Option<Duration> {
        let diff = self.epoch_seconds - now.timestamp();
        if diff > 0 {
            Some(Duration::from_secs(diff as u64))
        } else {
            None
        }
    }

    /// True once `now` has reached this timestamp.
    pub fn has_passed(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.epoch_seconds
    }
}

/// A usage window: percent of the limit used and when it resets.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UsageWindow {
    /// Percentage used, always within `[0, 100]`
    pub utilization: f64,
    pub resets_at: Option<ResetTimestamp>,
    /// The reset value as received, kept when it could not be parsed
    #[serde(default)]
    pub raw_resets_at: Option<String>,
    #[serde(default)]
    pub window_span: UsageWindowSpan,
}

impl UsageWindow {
    #[cfg(test)]
    pub fn new(utilization: f64, resets_at: Option<ResetTimestamp>) -> Self {
        Self {
            utilization: clamp_percent(utilization),
            resets_at,
            raw_resets_at: None,
            window_span: UsageWindowSpan::Unknown,
        }
    }

    pub fn with_span(mut self, span: UsageWindowSpan) -> Self {
        self.window_span = span;
        self
    }

    /// Builds a window from a utilization value and the textual reset time
    /// reported by the server. Unparseable reset values are kept verbatim.
    pub fn from_reported(utilization: f64, resets_at: Option<&str>, span: UsageWindowSpan) -> Self {
        let parsed = resets_at.and_then(ResetTimestamp::parse);
        let raw = match (parsed, resets_at) {
            (None, Some(raw)) if !raw.trim().is_empty() => Some(raw.to_string()),
            _ => None,
        };
        Self {
            utilization: clamp_percent(utilization),
            resets_at: parsed,
            raw_resets_at: raw,
            window_span: span,
        }
    }

    pub fn severity(&self) -> UsageSeverity {
        UsageSeverity::from_percent(self.utilization)
    }

    /// Fraction of the bar to fill, in `[0.0, 1.0]`.
    pub fn ratio(&self) -> f64 {
        clamp_percent(self.utilization) / 100.0
    }

    pub fn usage_label(&self) -> String {
        format!("{:.1}% of limit used", clamp_percent(self.utilization))
    }

    pub fn countdown_label_at(&self, now: DateTime<Utc>) -> String {
        match (self.resets_at, self.raw_resets_at.as_deref()) {
            (Some(ts), _) => match ts.duration_from(now) {
                Some(left) => format!("Resets in: {}", format_countdown(left)),
                None => "Resetting soon...".to_string(),
            },
            (None, Some(raw)) => format!("Resets at: {}", raw),
            (None, None) if self.utilization == 0.0 => "No usage in current period".to_string(),
            (None, None) => "Resets: Not available".to_string(),
        }
    }
}

/// Formats a duration as a zero-padded `HH:MM:SS` countdown.
///
/// Hours are not folded into days, so a 30 hour wait renders as `30:00:00`.
pub fn format_countdown(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

#[cfg(test)]
#[path = "tests/usage_reset_tests.rs"]
mod tests;
