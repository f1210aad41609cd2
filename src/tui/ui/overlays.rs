//! Modal dialogs drawn over the meter.

use super::theme::Theme;
use crate::logging::mask_secret;
use crate::tui::{
    LoginField, LoginForm, ManualSetupForm, MeterApp, MeterMode, Overlay, SettingsForm,
    SettingsRow,
};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

const POPUP_WIDTH: u16 = 60;
const FIELD_PREVIEW_CHARS: usize = 32;

pub(super) fn draw_overlay(frame: &mut Frame, app: &MeterApp, theme: &Theme) {
    match &app.overlay {
        Overlay::None => {}
        Overlay::Login(form) => draw_login(frame, form, app.config.has_session(), theme),
        Overlay::ManualSetup(form) => draw_manual_setup(frame, form, app.tracker.logged_in, theme),
        Overlay::Settings(form) => draw_settings(frame, app, form, theme),
        Overlay::ConfirmReset => draw_confirm(
            frame,
            theme,
            " Reset Usage ",
            "Reset the message counter to zero?",
        ),
        Overlay::ConfirmLogout => {
            let message = match app.mode {
                MeterMode::Remote => "Log out and clear the stored session?",
                MeterMode::Manual => "Stop tracking and clear the counter?",
            };
            draw_confirm(frame, theme, " Logout ", message)
        }
        Overlay::SessionExpired => draw_confirm(
            frame,
            theme,
            " Session Expired ",
            "Your session has expired. Would you like to log in again?",
        ),
    }
}

/// Centres a `width` x `height` box in `area`, shrinking it to fit.
fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width - width) / 2;
    let y = area.y + (area.height - height) / 2;
    Rect::new(x, y, width, height)
}

fn draw_popup(frame: &mut Frame, title: &str, lines: Vec<Line>, border: Color, theme: &Theme) {
    let height = lines.len() as u16 + 2;
    let area = popup_area(frame.area(), POPUP_WIDTH, height);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(Span::styled(
            title.to_string(),
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ));
    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

/// Shortened field value for display; secrets only show their prefix.
fn field_preview(value: &str, secret: bool) -> String {
    if secret {
        return mask_secret(value);
    }
    if value.chars().count() > FIELD_PREVIEW_CHARS {
        let head: String = value.chars().take(FIELD_PREVIEW_CHARS - 3).collect();
        format!("{}...", head)
    } else {
        value.to_string()
    }
}

fn field_line<'a>(label: &'a str, value: String, focused: bool, theme: &Theme) -> Line<'a> {
    let marker = if focused { "> " } else { "  " };
    let cursor = if focused { "_" } else { "" };
    let label_style = if focused {
        Style::default().fg(theme.accent)
    } else {
        Style::default().fg(theme.muted)
    };
    Line::from(vec![
        Span::styled(marker, label_style),
        Span::styled(label, label_style),
        Span::styled(format!("{}{}", value, cursor), Style::default().fg(theme.text)),
    ])
}

fn hint_line(text: &str, theme: &Theme) -> Line<'static> {
    Line::from(Span::styled(text.to_string(), Style::default().fg(theme.muted)))
}

fn error_lines(error: &Option<String>, theme: &Theme) -> Vec<Line<'static>> {
    match error {
        Some(message) => vec![Line::from(Span::styled(
            message.clone(),
            Style::default().fg(theme.critical),
        ))],
        None => Vec::new(),
    }
}

/// Esc closes the prompt when something is already stored and quits otherwise.
fn esc_hint(can_close: bool) -> &'static str {
    if can_close {
        "Esc close"
    } else {
        "Esc quit"
    }
}

fn draw_login(frame: &mut Frame, form: &LoginForm, has_session: bool, theme: &Theme) {
    let mut lines = vec![
        hint_line(
            "Paste the sessionKey cookie from a logged-in browser.",
            theme,
        ),
        hint_line("The full cookie string is optional.", theme),
        Line::from(""),
        field_line(
            "Session key: ",
            field_preview(&form.session_key, true),
            form.focus == LoginField::SessionKey,
            theme,
        ),
        field_line(
            "Cookies: ",
            field_preview(&form.cookie_string, false),
            form.focus == LoginField::CookieString,
            theme,
        ),
        Line::from(""),
    ];
    lines.extend(error_lines(&form.error, theme));
    let hint = format!("Enter save · Tab switch field · {}", esc_hint(has_session));
    lines.push(hint_line(&hint, theme));
    draw_popup(frame, " Login ", lines, theme.accent, theme);
}

fn draw_manual_setup(frame: &mut Frame, form: &ManualSetupForm, tracking: bool, theme: &Theme) {
    let plan = format!(
        "< {} ({} messages) >",
        form.plan,
        form.plan.message_limit()
    );
    let mut lines = vec![
        hint_line("Track messages by hand for a plan tier.", theme),
        Line::from(""),
        field_line("Plan: ", plan, false, theme),
        field_line("Messages used so far: ", form.usage_input.clone(), true, theme),
        Line::from(""),
    ];
    lines.extend(error_lines(&form.error, theme));
    let hint = format!("←/→ plan · digits count · Enter start · {}", esc_hint(tracking));
    lines.push(hint_line(&hint, theme));
    draw_popup(frame, " Manual Tracking ", lines, theme.accent, theme);
}

fn setting_value(row: SettingsRow, form: &SettingsForm) -> String {
    match row {
        SettingsRow::Opacity => format!("{:.0}%", form.opacity * 100.0),
        SettingsRow::PollInterval => format!("{}s", form.poll_interval),
        SettingsRow::Usage => format!("{} / {}", form.usage, form.usage_limit),
        SettingsRow::ResetUsage | SettingsRow::Logout => String::new(),
    }
}

fn draw_settings(frame: &mut Frame, app: &MeterApp, form: &SettingsForm, theme: &Theme) {
    let account = match app.mode {
        MeterMode::Remote => format!(
            "Session: {}",
            app.config
                .session_key
                .as_deref()
                .map(mask_secret)
                .unwrap_or_else(|| "Not logged in".to_string())
        ),
        MeterMode::Manual => format!("Plan: {}", app.tracker.plan),
    };

    let mut lines = vec![hint_line(&account, theme), Line::from("")];
    let selected = form.selected_row();
    for row in form.rows() {
        let value = setting_value(*row, form);
        let label = if value.is_empty() {
            row.label().to_string()
        } else {
            format!("{}: ", row.label())
        };
        let focused = *row == selected;
        let marker = if focused { "> " } else { "  " };
        let style = if focused {
            Style::default().fg(theme.accent)
        } else {
            Style::default().fg(theme.text)
        };
        lines.push(Line::from(vec![
            Span::styled(format!("{}{}", marker, label), style),
            Span::styled(value, Style::default().fg(theme.text)),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(hint_line(
        "↑/↓ select · ←/→ adjust · Enter save · Esc cancel",
        theme,
    ));
    draw_popup(frame, " Settings ", lines, theme.border, theme);
}

fn draw_confirm(frame: &mut Frame, theme: &Theme, title: &str, message: &str) {
    let lines = vec![
        Line::from(Span::styled(
            message.to_string(),
            Style::default().fg(theme.text),
        )),
        Line::from(""),
        hint_line("y yes · n no", theme),
    ];
    draw_popup(frame, title, lines, theme.warning, theme);
}
