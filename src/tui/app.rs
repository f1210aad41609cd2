//! Meter UI state.
//!
//! `MeterApp` is the only owner of the in-memory config. Every mutation that
//! should survive a restart goes through `persist`, which writes the whole
//! record back to disk.

use crate::account_usage::{FetchError, UsageReport};
use crate::config::{
    MeterConfig, MAX_OPACITY, MAX_POLL_INTERVAL_SECS, MIN_OPACITY, MIN_POLL_INTERVAL_SECS,
};
use crate::manual_tracker::{ManualTracker, PlanTier};
use crate::tui::ui::panel_rect;
use crate::usage_reset::{UsageSeverity, UsageWindow};
use chrono::{DateTime, Local, Utc};
use ratatui::layout::Rect;
use std::path::{Path, PathBuf};
use std::time::Duration;

const OPACITY_STEP: f64 = 0.05;
const POLL_INTERVAL_STEP: u64 = 10;
const MAX_USAGE_INPUT_DIGITS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterMode {
    /// Polls the account usage endpoint with a stored session
    Remote,
    /// Counts messages locally
    Manual,
}

/// Work for the runner that owns the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerCommand {
    Start,
    Stop,
    Refresh,
    Reschedule(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginField {
    #[default]
    SessionKey,
    CookieString,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoginForm {
    pub session_key: String,
    /// Optional full cookie string copied from the browser
    pub cookie_string: String,
    pub focus: LoginField,
    pub error: Option<String>,
}

impl LoginForm {
    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            LoginField::SessionKey => &mut self.session_key,
            LoginField::CookieString => &mut self.cookie_string,
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            LoginField::SessionKey => LoginField::CookieString,
            LoginField::CookieString => LoginField::SessionKey,
        };
    }

    pub fn push_char(&mut self, c: char) {
        if !c.is_control() {
            self.focused_mut().push(c);
            self.error = None;
        }
    }

    /// Pasted text loses surrounding whitespace and any control characters.
    pub fn insert_str(&mut self, text: &str) {
        let cleaned: String = text.trim().chars().filter(|c| !c.is_control()).collect();
        self.focused_mut().push_str(&cleaned);
        self.error = None;
    }

    pub fn backspace(&mut self) {
        self.focused_mut().pop();
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManualSetupForm {
    pub plan: PlanTier,
    /// Messages already sent in the current window, as typed
    pub usage_input: String,
    pub error: Option<String>,
}

impl ManualSetupForm {
    pub fn push_digit(&mut self, c: char) {
        if c.is_ascii_digit() && self.usage_input.len() < MAX_USAGE_INPUT_DIGITS {
            self.usage_input.push(c);
            self.error = None;
        }
    }

    pub fn backspace(&mut self) {
        self.usage_input.pop();
    }

    /// Empty input counts as zero.
    pub fn parsed_usage(&self) -> Option<u32> {
        if self.usage_input.is_empty() {
            Some(0)
        } else {
            self.usage_input.parse().ok()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsRow {
    Opacity,
    PollInterval,
    Usage,
    ResetUsage,
    Logout,
}

impl SettingsRow {
    pub fn rows_for(mode: MeterMode) -> &'static [SettingsRow] {
        match mode {
            MeterMode::Remote => &[
                SettingsRow::Opacity,
                SettingsRow::PollInterval,
                SettingsRow::Logout,
            ],
            MeterMode::Manual => &[
                SettingsRow::Opacity,
                SettingsRow::Usage,
                SettingsRow::ResetUsage,
                SettingsRow::Logout,
            ],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SettingsRow::Opacity => "Opacity",
            SettingsRow::PollInterval => "Update interval",
            SettingsRow::Usage => "Messages used",
            SettingsRow::ResetUsage => "Reset usage",
            SettingsRow::Logout => "Logout",
        }
    }
}

/// Draft values edited in the settings dialog; applied on save.
#[derive(Debug, Clone, PartialEq)]
pub struct SettingsForm {
    pub mode: MeterMode,
    pub selected: usize,
    pub opacity: f64,
    pub poll_interval: u64,
    pub usage: u32,
    pub usage_limit: u32,
}

impl SettingsForm {
    pub fn rows(&self) -> &'static [SettingsRow] {
        SettingsRow::rows_for(self.mode)
    }

    pub fn selected_row(&self) -> SettingsRow {
        let rows = self.rows();
        rows[self.selected.min(rows.len() - 1)]
    }

    pub fn move_selection(&mut self, delta: i32) {
        let len = self.rows().len() as i32;
        self.selected = (self.selected as i32 + delta).rem_euclid(len) as usize;
    }

    /// Steps the selected value; rows without a value ignore it.
    pub fn adjust(&mut self, delta: i32) {
        match self.selected_row() {
            SettingsRow::Opacity => {
                let stepped = self.opacity + OPACITY_STEP * delta as f64;
                // Round to the step grid so repeated presses land on 0.30, 0.35, ...
                self.opacity = ((stepped / OPACITY_STEP).round() * OPACITY_STEP)
                    .clamp(MIN_OPACITY, MAX_OPACITY);
            }
            SettingsRow::PollInterval => {
                let stepped = self.poll_interval as i64 + POLL_INTERVAL_STEP as i64 * delta as i64;
                self.poll_interval = stepped.clamp(
                    MIN_POLL_INTERVAL_SECS as i64,
                    MAX_POLL_INTERVAL_SECS as i64,
                ) as u64;
            }
            SettingsRow::Usage => {
                let stepped = self.usage as i64 + delta as i64;
                self.usage = stepped.clamp(0, self.usage_limit as i64) as u32;
            }
            SettingsRow::ResetUsage | SettingsRow::Logout => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Overlay {
    #[default]
    None,
    Login(LoginForm),
    ManualSetup(ManualSetupForm),
    Settings(SettingsForm),
    ConfirmReset,
    ConfirmLogout,
    SessionExpired,
}

/// Offset of the grab point inside the panel while its header is dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragState {
    pub grab_dx: u16,
    pub grab_dy: u16,
}

/// The three things the panel paints, for whichever mode is active.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterReading {
    pub usage_label: String,
    pub countdown_label: String,
    pub ratio: f64,
    pub severity: UsageSeverity,
}

pub struct MeterApp {
    pub mode: MeterMode,
    pub config: MeterConfig,
    config_path: PathBuf,
    /// Latest five-hour window; None until the first reading
    pub window: Option<UsageWindow>,
    pub weekly_window: Option<UsageWindow>,
    pub tracker: ManualTracker,
    pub status: String,
    pub last_update: Option<DateTime<Local>>,
    pub overlay: Overlay,
    pub drag: Option<DragState>,
    pub should_quit: bool,
    poller_commands: Vec<PollerCommand>,
}

impl MeterApp {
    pub fn new(mode: MeterMode, config: MeterConfig, config_path: PathBuf) -> Self {
        let tracker = ManualTracker::from_config(&config);
        let window = match mode {
            MeterMode::Remote if config.has_session() => config.cached_window(),
            _ => None,
        };

        let (overlay, status) = match mode {
            MeterMode::Remote if config.has_session() => (
                Overlay::None,
                if window.is_some() {
                    "Showing last reading, fetching...".to_string()
                } else {
                    "Fetching usage...".to_string()
                },
            ),
            MeterMode::Remote => (
                Overlay::Login(LoginForm::default()),
                "Not logged in".to_string(),
            ),
            MeterMode::Manual if tracker.logged_in => {
                (Overlay::None, "Manual tracking".to_string())
            }
            MeterMode::Manual => (
                Overlay::ManualSetup(ManualSetupForm {
                    plan: tracker.plan,
                    ..Default::default()
                }),
                "Not tracking".to_string(),
            ),
        };

        let mut app = Self {
            mode,
            config,
            config_path,
            window,
            weekly_window: None,
            tracker,
            status,
            last_update: None,
            overlay,
            drag: None,
            should_quit: false,
            poller_commands: Vec::new(),
        };
        if mode == MeterMode::Remote && app.config.has_session() {
            app.poller_commands.push(PollerCommand::Start);
        }
        app
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Writes the config; a failure is reported on the status line.
    pub fn persist(&mut self) {
        if let Err(e) = self.config.save(self.config_path()) {
            tracing::error!("Failed to save config: {:#}", e);
            self.status = format!("Could not save settings: {}", e);
        }
    }

    pub fn take_poller_commands(&mut self) -> Vec<PollerCommand> {
        std::mem::take(&mut self.poller_commands)
    }

    pub fn reading(&self, now: DateTime<Utc>) -> MeterReading {
        match (self.mode, &self.window) {
            (MeterMode::Manual, _) => MeterReading {
                usage_label: self.tracker.usage_label(),
                countdown_label: self.tracker.countdown_label(now),
                ratio: self.tracker.ratio(),
                severity: self.tracker.severity(),
            },
            (MeterMode::Remote, Some(window)) => MeterReading {
                usage_label: window.usage_label(),
                countdown_label: window.countdown_label_at(now),
                ratio: window.ratio(),
                severity: window.severity(),
            },
            (MeterMode::Remote, None) => MeterReading {
                usage_label: "Loading...".to_string(),
                countdown_label: "Resets in: --:--:--".to_string(),
                ratio: 0.0,
                severity: UsageSeverity::Normal,
            },
        }
    }

    /// Replaces the displayed reading with `report`. Readings that arrive
    /// after the session was cleared are dropped.
    pub fn apply_usage(&mut self, report: UsageReport) {
        if self.mode != MeterMode::Remote || !self.config.has_session() {
            tracing::debug!("Dropping usage reading without an active session");
            return;
        }
        let now = Local::now();
        self.config.cache_usage(&report.session_window);
        self.window = Some(report.session_window);
        self.weekly_window = report.weekly_window;
        self.last_update = Some(now);
        self.status = format!("Updated {}", now.format("%H:%M:%S"));
        self.persist();
    }

    /// Keeps the last good reading on screen and reports the failure.
    pub fn apply_fetch_error(&mut self, err: &FetchError) {
        self.status = format!("Error: {}", err);
    }

    pub fn session_expired(&mut self) {
        self.poller_commands.push(PollerCommand::Stop);
        self.status = "Session expired".to_string();
        self.overlay = Overlay::SessionExpired;
    }

    /// Accepts the expiry prompt: forget the dead session and ask for a new one.
    pub fn confirm_relogin(&mut self) {
        self.config.clear_session();
        self.window = None;
        self.weekly_window = None;
        self.persist();
        self.open_login();
    }

    pub fn dismiss_session_expired(&mut self) {
        self.overlay = Overlay::None;
        self.status = "Session expired. Press l to log in or r to retry".to_string();
    }

    pub fn open_login(&mut self) {
        if self.mode == MeterMode::Remote {
            self.overlay = Overlay::Login(LoginForm::default());
        }
    }

    /// Stores the entered session and starts polling. Returns false and
    /// flags the form when the key is empty.
    pub fn submit_login(&mut self) -> bool {
        let Overlay::Login(form) = &mut self.overlay else {
            return false;
        };
        let key = form.session_key.trim().to_string();
        if key.is_empty() {
            form.error = Some("Session key is required".to_string());
            return false;
        }
        let cookies = form.cookie_string.trim().to_string();

        self.config.store_session(&key, Some(cookies.as_str()));
        self.window = None;
        self.weekly_window = None;
        self.persist();
        tracing::info!(
            "Session key stored: {}",
            crate::logging::mask_secret(&key)
        );

        self.overlay = Overlay::None;
        self.status = "Fetching usage...".to_string();
        self.poller_commands.push(PollerCommand::Start);
        true
    }

    /// Closing the login prompt without a stored session exits the meter.
    pub fn cancel_login(&mut self) {
        if self.config.has_session() {
            self.overlay = Overlay::None;
        } else {
            tracing::info!("Login closed without a session key, exiting");
            self.should_quit = true;
        }
    }

    pub fn submit_manual_setup(&mut self, now: DateTime<Utc>) -> bool {
        let Overlay::ManualSetup(form) = &mut self.overlay else {
            return false;
        };
        let Some(usage) = form.parsed_usage() else {
            form.error = Some("Enter a whole number of messages".to_string());
            return false;
        };
        let plan = form.plan;

        self.tracker.start_tracking(plan, usage, now);
        self.tracker.write_to(&mut self.config);
        self.persist();
        self.overlay = Overlay::None;
        self.status = format!("Tracking {} plan", plan);
        true
    }

    pub fn cancel_manual_setup(&mut self) {
        if self.tracker.logged_in {
            self.overlay = Overlay::None;
        } else {
            tracing::info!("Manual setup closed without tracking, exiting");
            self.should_quit = true;
        }
    }

    pub fn increment_usage(&mut self) {
        if self.mode == MeterMode::Manual && self.tracker.logged_in {
            self.tracker.increment();
            self.tracker.write_to(&mut self.config);
            self.persist();
        }
    }

    pub fn request_refresh(&mut self) {
        if self.mode == MeterMode::Remote && self.config.has_session() {
            self.status = "Refreshing...".to_string();
            self.poller_commands.push(PollerCommand::Refresh);
        }
    }

    pub fn open_settings(&mut self) {
        self.overlay = Overlay::Settings(SettingsForm {
            mode: self.mode,
            selected: 0,
            opacity: self.config.opacity,
            poll_interval: self.config.poll_interval,
            usage: self.tracker.current_usage(),
            usage_limit: self.tracker.usage_limit(),
        });
    }

    /// Enter on a settings row: action rows open their confirmation, value
    /// rows save the whole form.
    pub fn activate_setting(&mut self) {
        let Overlay::Settings(form) = &self.overlay else {
            return;
        };
        match form.selected_row() {
            SettingsRow::ResetUsage => self.overlay = Overlay::ConfirmReset,
            SettingsRow::Logout => self.overlay = Overlay::ConfirmLogout,
            _ => self.save_settings(),
        }
    }

    pub fn save_settings(&mut self) {
        let Overlay::Settings(form) = &self.overlay else {
            return;
        };
        let form = form.clone();
        self.overlay = Overlay::None;

        self.config.set_opacity(form.opacity);
        let previous_interval = self.config.poll_interval;
        self.config.set_poll_interval(form.poll_interval);
        if self.mode == MeterMode::Remote && self.config.poll_interval != previous_interval {
            self.poller_commands
                .push(PollerCommand::Reschedule(self.config.poll_interval_duration()));
        }
        if self.mode == MeterMode::Manual {
            self.tracker.set_usage(form.usage);
            self.tracker.write_to(&mut self.config);
        }

        self.persist();
        self.status = "Settings saved".to_string();
        tracing::info!(
            "Settings saved: opacity {:.2}, poll interval {}s",
            self.config.opacity,
            self.config.poll_interval
        );
    }

    pub fn confirm_reset(&mut self) {
        self.tracker.reset_usage();
        self.tracker.write_to(&mut self.config);
        self.persist();
        self.overlay = Overlay::None;
        self.status = "Usage reset".to_string();
    }

    /// Remote: drops the session and stops polling. Manual: stops tracking.
    /// Either way the matching login step is shown again.
    pub fn confirm_logout(&mut self) {
        match self.mode {
            MeterMode::Remote => {
                self.config.clear_session();
                self.window = None;
                self.weekly_window = None;
                self.poller_commands.push(PollerCommand::Stop);
                self.persist();
                self.overlay = Overlay::Login(LoginForm::default());
            }
            MeterMode::Manual => {
                self.tracker.logout();
                self.tracker.write_to(&mut self.config);
                self.persist();
                self.overlay = Overlay::ManualSetup(ManualSetupForm {
                    plan: self.tracker.plan,
                    ..Default::default()
                });
            }
        }
        self.status = "Logged out".to_string();
        tracing::info!("Logged out");
    }

    pub fn close_overlay(&mut self) {
        self.overlay = Overlay::None;
    }

    /// Once-a-second housekeeping: applies a passed manual reset.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        if self.mode == MeterMode::Manual
            && self.tracker.logged_in
            && self.tracker.tick(now)
        {
            self.tracker.write_to(&mut self.config);
            self.persist();
            self.status = "Usage window reset".to_string();
        }
    }

    /// Moves the panel by whole cells, keeping it inside `area`.
    pub fn nudge(&mut self, dx: i32, dy: i32, area: Rect) {
        let rect = panel_rect(self.config.position, area);
        let x = rect.x as i32 - area.x as i32 + dx;
        let y = rect.y as i32 - area.y as i32 + dy;
        self.move_panel_to(x, y, area);
        self.persist();
    }

    /// Starts a drag when the press lands on the panel's top border.
    pub fn begin_drag(&mut self, column: u16, row: u16, area: Rect) -> bool {
        if self.overlay != Overlay::None {
            return false;
        }
        let rect = panel_rect(self.config.position, area);
        let on_header = row == rect.y && column >= rect.x && column < rect.x + rect.width;
        if on_header {
            self.drag = Some(DragState {
                grab_dx: column - rect.x,
                grab_dy: 0,
            });
        }
        on_header
    }

    pub fn drag_to(&mut self, column: u16, row: u16, area: Rect) {
        let Some(drag) = self.drag else {
            return;
        };
        let x = column.saturating_sub(drag.grab_dx) as i32 - area.x as i32;
        let y = row.saturating_sub(drag.grab_dy) as i32 - area.y as i32;
        self.move_panel_to(x, y, area);
    }

    /// Ends a drag and saves the final position.
    pub fn end_drag(&mut self) {
        if self.drag.take().is_some() {
            tracing::debug!(
                "Panel moved to ({}, {})",
                self.config.position.x,
                self.config.position.y
            );
            self.persist();
        }
    }

    fn move_panel_to(&mut self, x: i32, y: i32, area: Rect) {
        let rect = panel_rect(self.config.position, area);
        let max_x = area.width.saturating_sub(rect.width) as i32;
        let max_y = area.height.saturating_sub(rect.height) as i32;
        self.config.set_position(x.clamp(0, max_x), y.clamp(0, max_y));
    }
}

#[cfg(test)]
#[path = "tests/app_tests.rs"]
mod tests;
