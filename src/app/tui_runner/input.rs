//! Keyboard handling, dispatched on the open overlay.

use crate::tui::{LoginForm, ManualSetupForm, MeterApp, Overlay, SettingsForm};
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::layout::Rect;

pub fn handle_key(app: &mut MeterApp, key: KeyEvent, area: Rect) {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return;
    }

    match app.overlay {
        Overlay::None => handle_meter_key(app, key, area),
        Overlay::Login(_) => handle_login_key(app, key),
        Overlay::ManualSetup(_) => handle_manual_setup_key(app, key),
        Overlay::Settings(_) => handle_settings_key(app, key),
        Overlay::ConfirmReset => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm_reset(),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.close_overlay(),
            _ => {}
        },
        Overlay::ConfirmLogout => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm_logout(),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.close_overlay(),
            _ => {}
        },
        Overlay::SessionExpired => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.confirm_relogin(),
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.dismiss_session_expired()
            }
            _ => {}
        },
    }
}

/// Bracketed paste goes to whichever text field is open.
pub fn handle_paste(app: &mut MeterApp, text: &str) {
    match &mut app.overlay {
        Overlay::Login(form) => form.insert_str(text),
        Overlay::ManualSetup(form) => text.trim().chars().for_each(|c| form.push_digit(c)),
        _ => {}
    }
}

fn handle_meter_key(app: &mut MeterApp, key: KeyEvent, area: Rect) {
    let step = if key.modifiers.contains(KeyModifiers::SHIFT) {
        5
    } else {
        1
    };
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Char('r') => app.request_refresh(),
        KeyCode::Char('s') => app.open_settings(),
        KeyCode::Char('l') => app.open_login(),
        KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Char(' ') => app.increment_usage(),
        KeyCode::Left => app.nudge(-step, 0, area),
        KeyCode::Right => app.nudge(step, 0, area),
        KeyCode::Up => app.nudge(0, -step, area),
        KeyCode::Down => app.nudge(0, step, area),
        _ => {}
    }
}

fn with_login_form(app: &mut MeterApp, edit: impl FnOnce(&mut LoginForm)) {
    if let Overlay::Login(form) = &mut app.overlay {
        edit(form);
    }
}

fn handle_login_key(app: &mut MeterApp, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => {
            app.submit_login();
        }
        KeyCode::Esc => app.cancel_login(),
        KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
            with_login_form(app, LoginForm::toggle_focus)
        }
        KeyCode::Backspace => with_login_form(app, LoginForm::backspace),
        KeyCode::Char(c) => with_login_form(app, |form| form.push_char(c)),
        _ => {}
    }
}

fn with_setup_form(app: &mut MeterApp, edit: impl FnOnce(&mut ManualSetupForm)) {
    if let Overlay::ManualSetup(form) = &mut app.overlay {
        edit(form);
    }
}

fn handle_manual_setup_key(app: &mut MeterApp, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => {
            app.submit_manual_setup(Utc::now());
        }
        KeyCode::Esc => app.cancel_manual_setup(),
        KeyCode::Left => with_setup_form(app, |form| form.plan = form.plan.previous()),
        KeyCode::Right | KeyCode::Tab => with_setup_form(app, |form| form.plan = form.plan.next()),
        KeyCode::Backspace => with_setup_form(app, ManualSetupForm::backspace),
        KeyCode::Char(c) => with_setup_form(app, |form| form.push_digit(c)),
        _ => {}
    }
}

fn with_settings_form(app: &mut MeterApp, edit: impl FnOnce(&mut SettingsForm)) {
    if let Overlay::Settings(form) = &mut app.overlay {
        edit(form);
    }
}

fn handle_settings_key(app: &mut MeterApp, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.activate_setting(),
        KeyCode::Esc | KeyCode::Char('q') => app.close_overlay(),
        KeyCode::Up | KeyCode::Char('k') => with_settings_form(app, |form| form.move_selection(-1)),
        KeyCode::Down | KeyCode::Char('j') => {
            with_settings_form(app, |form| form.move_selection(1))
        }
        KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('-') => {
            with_settings_form(app, |form| form.adjust(-1))
        }
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('+') => {
            with_settings_form(app, |form| form.adjust(1))
        }
        _ => {}
    }
}

#[cfg(test)]
#[path = "tests/input_tests.rs"]
mod tests;
