use crate::meter_paths;
use crate::usage_reset::{UsageWindow, UsageWindowSpan};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const MIN_OPACITY: f64 = 0.3;
pub const MAX_OPACITY: f64 = 1.0;
pub const MIN_POLL_INTERVAL_SECS: u64 = 10;
pub const MAX_POLL_INTERVAL_SECS: u64 = 300;

/// Where the meter panel sits, in terminal cells from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Default for Position {
    fn default() -> Self {
        Self { x: 20, y: 80 }
    }
}

/// The single persisted record behind both meter modes.
///
/// Keys missing from the file take their defaults and keys this version does
/// not know about are carried through `extra` so a save never drops them.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MeterConfig {
    pub position: Position,
    pub opacity: f64,
    /// Seconds between usage fetches
    pub poll_interval: u64,

    // Remote meter
    pub session_key: Option<String>,
    /// Full `name=value; ...` cookie string captured alongside the session key
    pub cookie_string: Option<String>,
    /// Last successfully fetched utilization, shown until the first fetch lands
    pub cached_utilization: Option<f64>,
    pub cached_resets_at: Option<String>,

    // Manual tracker
    pub logged_in: bool,
    pub current_usage: u32,
    pub usage_limit: u32,
    /// ISO-8601 timestamp of the next counter reset
    pub reset_time: Option<String>,
    pub plan_type: String,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            position: Position::default(),
            opacity: 0.9,
            poll_interval: 60,
            session_key: None,
            cookie_string: None,
            cached_utilization: None,
            cached_resets_at: None,
            logged_in: false,
            current_usage: 0,
            usage_limit: 100,
            reset_time: None,
            plan_type: "free".to_string(),
            extra: serde_json::Map::new(),
        }
    }
}

impl MeterConfig {
    /// Loads the config at `path`, merging defaults for missing keys.
    ///
    /// A missing file yields the defaults. An unreadable or malformed file is
    /// logged and also yields the defaults; the next save overwrites it.
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match Self::try_load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Ignoring unreadable config {}: {:#}", path.display(), e);
                Self::default()
            }
        }
    }

    fn try_load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let value: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        let mut config = Self::from_fields(value)?;
        config.normalize();
        Ok(config)
    }

    /// Deserializes a config object key by key, dropping keys whose value has
    /// the wrong type so one bad field cannot discard the stored session.
    fn from_fields(value: serde_json::Value) -> Result<Self> {
        let serde_json::Value::Object(fields) = value else {
            anyhow::bail!("Config root is not a JSON object");
        };
        if let Ok(config) = serde_json::from_value(serde_json::Value::Object(fields.clone())) {
            return Ok(config);
        }

        let mut accepted = serde_json::Map::new();
        for (key, field) in fields {
            let mut candidate = accepted.clone();
            candidate.insert(key.clone(), field);
            let parsed: Result<Self, _> =
                serde_json::from_value(serde_json::Value::Object(candidate.clone()));
            match parsed {
                Ok(_) => accepted = candidate,
                Err(e) => tracing::warn!("Ignoring config key {:?}: {}", key, e),
            }
        }
        serde_json::from_value(serde_json::Value::Object(accepted))
            .context("Failed to parse config fields")
    }

    /// Resolves the config path (explicit override or `~/.usage-meter/config.json`)
    /// and loads it.
    pub fn load_default(override_path: Option<&Path>) -> Result<(Self, PathBuf)> {
        let path = match override_path {
            Some(p) => p.to_path_buf(),
            None => meter_paths::config_path()?,
        };
        Ok((Self::load(&path), path))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create config directory: {}", parent.display())
                })?;
            }
        }
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize meter config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        tracing::debug!("Saved config to {}", path.display());
        Ok(())
    }

    /// Pulls every bounded field back into range.
    fn normalize(&mut self) {
        self.set_opacity(self.opacity);
        self.set_poll_interval(self.poll_interval);
        self.usage_limit = self.usage_limit.max(1);
        self.current_usage = self.current_usage.min(self.usage_limit);
    }

    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = if opacity.is_nan() {
            MAX_OPACITY
        } else {
            opacity.clamp(MIN_OPACITY, MAX_OPACITY)
        };
    }

    pub fn set_poll_interval(&mut self, seconds: u64) {
        self.poll_interval = seconds.clamp(MIN_POLL_INTERVAL_SECS, MAX_POLL_INTERVAL_SECS);
    }

    pub fn set_position(&mut self, x: i32, y: i32) {
        self.position = Position {
            x: x.max(0),
            y: y.max(0),
        };
    }

    pub fn poll_interval_duration(&self) -> Duration {
        Duration::from_secs(
            self.poll_interval
                .clamp(MIN_POLL_INTERVAL_SECS, MAX_POLL_INTERVAL_SECS),
        )
    }

    pub fn has_session(&self) -> bool {
        self.session_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    /// Stores a freshly entered session key. An empty cookie string is
    /// treated as absent.
    pub fn store_session(&mut self, session_key: &str, cookie_string: Option<&str>) {
        self.session_key = Some(session_key.trim().to_string());
        self.cookie_string = cookie_string
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from);
    }

    pub fn clear_session(&mut self) {
        self.session_key = None;
        self.cookie_string = None;
        self.cached_utilization = None;
        self.cached_resets_at = None;
    }

    /// Remembers the latest reading so the next start paints it immediately.
    pub fn cache_usage(&mut self, window: &UsageWindow) {
        self.cached_utilization = Some(window.utilization);
        self.cached_resets_at = window
            .resets_at
            .and_then(|ts| ts.to_rfc3339())
            .or_else(|| window.raw_resets_at.clone());
    }

    pub fn cached_window(&self) -> Option<UsageWindow> {
        self.cached_utilization.map(|utilization| {
            UsageWindow::from_reported(
                utilization,
                self.cached_resets_at.as_deref(),
                UsageWindowSpan::Hours(5),
            )
        })
    }
}

#[cfg(test)]
#[path = "tests/config_tests/config_tests.rs"]
mod tests;
