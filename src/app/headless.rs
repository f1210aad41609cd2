//! One-shot subcommands that run without the TUI.

use crate::account_usage::{ApiClient, SessionCredentials, UsageFetcher, UsageReport};
use crate::config::MeterConfig;
use crate::logging::mask_secret;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;

pub async fn run_status(config_override: Option<&Path>, json: bool) -> Result<()> {
    let (mut config, path) = MeterConfig::load_default(config_override)?;
    let fetcher: Arc<dyn UsageFetcher> = Arc::new(ApiClient::default());
    let report = fetch_and_cache(fetcher, &mut config).await?;
    config.save(&path)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize usage report")?
        );
    } else {
        for line in status_lines(&report, Utc::now()) {
            println!("{}", line);
        }
    }
    Ok(())
}

/// Fetches once with the stored session and caches the reading in `config`.
pub async fn fetch_and_cache(
    fetcher: Arc<dyn UsageFetcher>,
    config: &mut MeterConfig,
) -> Result<UsageReport> {
    let credentials = SessionCredentials::from_config(config)
        .context("No session key stored. Run `usage-meter login` first")?;

    let result = tokio::task::spawn_blocking(move || fetcher.fetch(&credentials))
        .await
        .context("Usage fetch task failed")?;

    let report = match result {
        Ok(report) => report,
        Err(err) if err.is_auth_failure() => {
            anyhow::bail!(
                "{}. Run `usage-meter login` to store a new session key",
                err
            )
        }
        Err(err) => return Err(err.into()),
    };

    config.cache_usage(&report.session_window);
    Ok(report)
}

pub fn status_lines(report: &UsageReport, now: DateTime<Utc>) -> Vec<String> {
    let mut lines = vec![
        report.session_window.usage_label(),
        report.session_window.countdown_label_at(now),
    ];
    if let Some(weekly) = &report.weekly_window {
        lines.push(format!(
            "Weekly ({}): {}",
            weekly.window_span.label().unwrap_or_else(|| "7d".to_string()),
            weekly.usage_label()
        ));
    }
    lines
}

pub fn run_login(
    config_override: Option<&Path>,
    session_key: Option<String>,
    cookie: Option<String>,
) -> Result<()> {
    let (mut config, path) = MeterConfig::load_default(config_override)?;

    let session_key = match session_key {
        Some(key) => key,
        None => {
            eprint!("Paste session key: ");
            std::io::stderr().flush().ok();
            read_key(std::io::stdin().lock())?
        }
    };

    store_login(&mut config, &session_key, cookie.as_deref())?;
    config.save(&path)?;
    println!(
        "Saved session {} to {}",
        mask_secret(session_key.trim()),
        path.display()
    );
    Ok(())
}

/// Reads the first line from `reader`.
pub fn read_key<R: BufRead>(mut reader: R) -> Result<String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .context("Failed to read session key from stdin")?;
    Ok(line.trim().to_string())
}

pub fn store_login(
    config: &mut MeterConfig,
    session_key: &str,
    cookie: Option<&str>,
) -> Result<()> {
    if session_key.trim().is_empty() {
        anyhow::bail!("Session key must not be empty");
    }
    config.store_session(session_key, cookie);
    tracing::info!("Session key stored: {}", mask_secret(session_key.trim()));
    Ok(())
}

pub fn run_logout(config_override: Option<&Path>) -> Result<()> {
    let (mut config, path) = MeterConfig::load_default(config_override)?;
    config.clear_session();
    config.save(&path)?;
    tracing::info!("Session cleared");
    println!("Session cleared");
    Ok(())
}

pub fn run_show_config(config_override: Option<&Path>) -> Result<()> {
    let (config, path) = MeterConfig::load_default(config_override)?;
    eprintln!("# {}", path.display());
    println!("{}", masked_config_json(&config)?);
    Ok(())
}

/// Pretty JSON of `config` with the session key and cookies masked.
pub fn masked_config_json(config: &MeterConfig) -> Result<String> {
    let mut masked = config.clone();
    masked.session_key = masked.session_key.as_deref().map(mask_secret);
    masked.cookie_string = masked.cookie_string.as_deref().map(mask_secret);
    serde_json::to_string_pretty(&masked).context("Failed to serialize config")
}

#[cfg(test)]
#[path = "tests/headless_tests.rs"]
mod tests;
