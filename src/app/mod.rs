pub mod cli;
pub mod headless;
pub mod tui_runner;
