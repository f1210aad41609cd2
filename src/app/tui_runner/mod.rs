mod input;
mod mouse_input;

use crate::account_usage::{ApiClient, SessionCredentials, UsageFetcher, UsagePoller};
use crate::app::cli::Cli;
use crate::config::MeterConfig;
use crate::tui::{ui, Event, EventHandler, MeterApp, MeterMode, PollerCommand};
use anyhow::{Context, Result};
use chrono::Utc;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use std::io::Stdout;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

type MeterTerminal = ratatui::Terminal<CrosstermBackend<Stdout>>;

/// Drives the countdown redraw and the manual reset check.
const TICK_RATE: Duration = Duration::from_secs(1);

pub async fn run_tui(cli: &Cli) -> Result<()> {
    let (config, config_path) = MeterConfig::load_default(cli.config.as_deref())?;
    let mode = if cli.manual {
        MeterMode::Manual
    } else {
        MeterMode::Remote
    };
    tracing::info!(
        "Starting {:?} meter with config {}",
        mode,
        config_path.display()
    );
    let mut app = MeterApp::new(mode, config, config_path);

    let mut terminal = setup_terminal()?;
    let fetcher: Arc<dyn UsageFetcher> = Arc::new(ApiClient::default());
    let result = run_event_loop(&mut terminal, &mut app, fetcher).await;
    restore_terminal(&mut terminal)?;

    if let Err(e) = &result {
        tracing::error!("Meter exited with error: {:#}", e);
    } else {
        tracing::info!("Meter closed");
    }
    result
}

fn setup_terminal() -> Result<MeterTerminal> {
    crossterm::terminal::enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = std::io::stdout();
    crossterm::execute!(
        stdout,
        crossterm::terminal::EnterAlternateScreen,
        crossterm::event::EnableMouseCapture,
        crossterm::event::EnableBracketedPaste
    )?;

    // Restore the terminal before the default hook prints the panic
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = crossterm::terminal::disable_raw_mode();
        let _ = crossterm::execute!(
            std::io::stdout(),
            crossterm::terminal::LeaveAlternateScreen,
            crossterm::event::DisableMouseCapture,
            crossterm::event::DisableBracketedPaste,
            crossterm::cursor::Show
        );
        original_hook(panic_info);
    }));

    let mut terminal = ratatui::Terminal::new(CrosstermBackend::new(stdout))
        .context("Failed to create terminal")?;
    terminal.hide_cursor()?;
    terminal.clear()?;
    Ok(terminal)
}

pub fn restore_terminal(terminal: &mut MeterTerminal) -> Result<()> {
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(
        terminal.backend_mut(),
        crossterm::event::DisableBracketedPaste,
        crossterm::terminal::LeaveAlternateScreen,
        crossterm::event::DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_event_loop(
    terminal: &mut MeterTerminal,
    app: &mut MeterApp,
    fetcher: Arc<dyn UsageFetcher>,
) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);
    let sender = events.sender();
    let mut poller: Option<UsagePoller> = None;

    loop {
        apply_poller_commands(app, &mut poller, &fetcher, &sender);
        if app.should_quit {
            break;
        }

        terminal.draw(|frame| ui::draw(frame, app))?;
        let size = terminal.size()?;
        let area = Rect::new(0, 0, size.width, size.height);

        match events.next().await? {
            Event::Key(key) => input::handle_key(app, key, area),
            Event::Mouse(mouse) => {
                mouse_input::handle_mouse(app, mouse, area);
            }
            Event::Paste(text) => input::handle_paste(app, &text),
            Event::Tick => app.tick(Utc::now()),
            Event::Resize => {}
            Event::UsageFetched(report) => app.apply_usage(report),
            Event::FetchFailed(err) => app.apply_fetch_error(&err),
            Event::SessionExpired => app.session_expired(),
        }
    }

    if let Some(poller) = poller.take() {
        poller.stop();
    }
    Ok(())
}

/// Carries out the poller work queued by the app since the last event.
fn apply_poller_commands(
    app: &mut MeterApp,
    poller: &mut Option<UsagePoller>,
    fetcher: &Arc<dyn UsageFetcher>,
    sender: &mpsc::UnboundedSender<Event>,
) {
    for command in app.take_poller_commands() {
        match command {
            PollerCommand::Start => start_poller(app, poller, fetcher, sender),
            PollerCommand::Stop => {
                if let Some(old) = poller.take() {
                    old.stop();
                }
            }
            PollerCommand::Refresh => {
                let running = poller.as_ref().filter(|active| active.is_active());
                match running {
                    Some(active) => active.refresh(),
                    // Stopped after an expired session the user chose to keep
                    None => start_poller(app, poller, fetcher, sender),
                }
            }
            PollerCommand::Reschedule(interval) => {
                if let Some(active) = poller.as_ref() {
                    active.set_interval(interval);
                }
            }
        }
    }
}

/// Replaces any running poller with a fresh one for the stored session. The
/// first fetch happens immediately.
fn start_poller(
    app: &MeterApp,
    poller: &mut Option<UsagePoller>,
    fetcher: &Arc<dyn UsageFetcher>,
    sender: &mpsc::UnboundedSender<Event>,
) {
    if let Some(old) = poller.take() {
        old.stop();
    }
    match SessionCredentials::from_config(&app.config) {
        Some(credentials) => {
            *poller = Some(UsagePoller::spawn(
                Arc::clone(fetcher),
                credentials,
                app.config.poll_interval_duration(),
                sender.clone(),
            ));
        }
        None => tracing::warn!("Poller start requested without a session"),
    }
}

#[cfg(test)]
#[path = "tests/runner_tests.rs"]
mod tests;
