use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "usage-meter")]
#[command(about = "Terminal meter for account rate-limit usage and reset countdown")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Track messages by hand instead of polling the account
    #[arg(long)]
    pub manual: bool,

    /// Config file (defaults to ~/.usage-meter/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, global = true)]
    pub debug: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Fetch usage once and print it
    Status {
        /// Print the raw report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Store a session key (read from stdin when not given)
    Login {
        #[arg(long)]
        session_key: Option<String>,

        /// Full cookie string copied from the browser
        #[arg(long)]
        cookie: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Print the config with secrets masked
    ShowConfig,
}
