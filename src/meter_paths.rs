//! Home-based storage paths for usage-meter persistence.
//!
//! Everything lives under `~/.usage-meter/`:
//! - `config.json` - Persisted meter config (position, opacity, session, counters)
//! - `logs/usage-meter.log` - Tracing output (the TUI owns stdout)

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use std::sync::RwLock;

/// The name of the usage meter directory.
const USAGE_METER_DIR: &str = ".usage-meter";

const CONFIG_FILENAME: &str = "config.json";
const LOG_FILENAME: &str = "usage-meter.log";

static HOME_OVERRIDE: RwLock<Option<PathBuf>> = RwLock::new(None);

fn home_root() -> Result<PathBuf> {
    if let Ok(guard) = HOME_OVERRIDE.read() {
        if let Some(ref dir) = *guard {
            return Ok(dir.clone());
        }
    }
    dirs::home_dir().context("Could not determine home directory for meter storage")
}

/// Returns the home-based meter directory: `~/.usage-meter/`
///
/// Creates the directory if it doesn't exist.
///
/// # Errors
///
/// Returns an error if:
/// - Home directory cannot be determined
/// - Directory creation fails
pub fn meter_home_dir() -> Result<PathBuf> {
    let dir = home_root()?.join(USAGE_METER_DIR);
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create meter directory: {}", dir.display()))?;
    Ok(dir)
}

/// Returns the config path: `~/.usage-meter/config.json`
pub fn config_path() -> Result<PathBuf> {
    Ok(meter_home_dir()?.join(CONFIG_FILENAME))
}

/// Returns the logs directory: `~/.usage-meter/logs/`
///
/// Creates the directory if it doesn't exist.
pub fn logs_dir() -> Result<PathBuf> {
    let dir = meter_home_dir()?.join("logs");
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create logs directory: {}", dir.display()))?;
    Ok(dir)
}

/// Returns the log file path: `~/.usage-meter/logs/usage-meter.log`
pub fn log_file_path() -> Result<PathBuf> {
    Ok(logs_dir()?.join(LOG_FILENAME))
}

/// Restores the previous home override when dropped.
#[cfg(test)]
pub struct TestHomeGuard {
    previous: Option<PathBuf>,
}

#[cfg(test)]
impl Drop for TestHomeGuard {
    fn drop(&mut self) {
        if let Ok(mut guard) = HOME_OVERRIDE.write() {
            *guard = self.previous.take();
        }
    }
}

/// Points every path helper at `home` until the returned guard is dropped.
///
/// The override is process-wide, so tests using it should be `#[serial]`.
#[cfg(test)]
pub fn set_home_for_test(home: PathBuf) -> TestHomeGuard {
    let previous = match HOME_OVERRIDE.write() {
        Ok(mut guard) => guard.replace(home),
        Err(_) => None,
    };
    TestHomeGuard { previous }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    #[serial]
    fn test_meter_home_dir_is_created() {
        let temp_dir = TempDir::new().unwrap();
        let _guard = set_home_for_test(temp_dir.path().to_path_buf());

        let dir = meter_home_dir().unwrap();
        assert_eq!(dir, temp_dir.path().join(".usage-meter"));
        assert!(dir.is_dir());
    }

    #[test]
    #[serial]
    fn test_config_and_log_paths() {
        let temp_dir = TempDir::new().unwrap();
        let _guard = set_home_for_test(temp_dir.path().to_path_buf());

        let config = config_path().unwrap();
        assert!(config.ends_with(".usage-meter/config.json"));

        let log = log_file_path().unwrap();
        assert!(log.ends_with(".usage-meter/logs/usage-meter.log"));
        assert!(log.parent().unwrap().is_dir());
    }

    #[test]
    #[serial]
    fn test_guard_restores_previous_override() {
        let outer = TempDir::new().unwrap();
        let inner = TempDir::new().unwrap();
        let _outer_guard = set_home_for_test(outer.path().to_path_buf());

        {
            let _inner_guard = set_home_for_test(inner.path().to_path_buf());
            assert!(meter_home_dir().unwrap().starts_with(inner.path()));
        }

        assert!(meter_home_dir().unwrap().starts_with(outer.path()));
    }
}
