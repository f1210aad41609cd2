//! Tracing setup for the meter.
//!
//! The TUI owns stdout, so all tracing output goes to
//! `~/.usage-meter/logs/usage-meter.log`. The filter is taken from
//! `USAGE_METER_LOG` when set, otherwise `info` (or `debug` with `--debug`).

use crate::meter_paths;
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter directive.
pub const LOG_ENV_VAR: &str = "USAGE_METER_LOG";

/// Number of leading characters of a secret that are safe to display.
const SECRET_PREFIX_LEN: usize = 15;

/// Installs the global file subscriber.
pub fn init(debug: bool) -> Result<()> {
    let log_path = meter_paths::log_file_path()?;
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file: {}", log_path.display()))?;

    let default_level = if debug {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::default().add_directive(default_level.into()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::info!("usage-meter {} starting", env!("CARGO_PKG_VERSION"));
    Ok(())
}

/// Masks a secret for display: the first 15 characters followed by `...`.
///
/// Values of 15 characters or fewer are returned unchanged.
pub fn mask_secret(secret: &str) -> String {
    if secret.chars().count() > SECRET_PREFIX_LEN {
        let prefix: String = secret.chars().take(SECRET_PREFIX_LEN).collect();
        format!("{}...", prefix)
    } else {
        secret.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_secret_long_value() {
        let key = "sk-ant-REDACTED";
        assert_eq!(mask_secret(key), "sk-ant-sid01-ab...");
    }

    #[test]
    fn test_mask_secret_short_value() {
        assert_eq!(mask_secret("short"), "short");
        assert_eq!(mask_secret("exactly15chars!"), "exactly15chars!");
        assert_eq!(mask_secret(""), "");
    }

    #[test]
    fn test_mask_secret_multibyte() {
        let key = "ééééééééééééééééééé";
        assert_eq!(mask_secret(key), format!("{}...", "é".repeat(15)));
    }
}
