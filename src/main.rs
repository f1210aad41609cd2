mod account_usage;
mod app;
mod config;
mod logging;
mod manual_tracker;
mod meter_paths;
mod tui;
mod usage_reset;

use anyhow::Result;
use app::cli::{Cli, Command};
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.debug) {
        eprintln!("[usage-meter] Warning: logging disabled: {:#}", e);
    }

    let config_override = cli.config.as_deref();
    match &cli.command {
        None => app::tui_runner::run_tui(&cli).await,
        Some(Command::Status { json }) => app::headless::run_status(config_override, *json).await,
        Some(Command::Login {
            session_key,
            cookie,
        }) => app::headless::run_login(config_override, session_key.clone(), cookie.clone()),
        Some(Command::Logout) => app::headless::run_logout(config_override),
        Some(Command::ShowConfig) => app::headless::run_show_config(config_override),
    }
}
