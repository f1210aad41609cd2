//! The meter panel: usage text, gauge, countdown and status line.

use super::theme::Theme;
use crate::config::Position;
use crate::tui::{MeterApp, MeterMode};
use chrono::{DateTime, Utc};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph},
    Frame,
};

pub const PANEL_WIDTH: u16 = 48;
/// Borders plus four content rows
pub const PANEL_HEIGHT: u16 = 6;

/// Where the panel lands for a stored position, pulled back inside `area`
/// when the position (or the panel itself) would not fit.
pub fn panel_rect(position: Position, area: Rect) -> Rect {
    let width = PANEL_WIDTH.min(area.width);
    let height = PANEL_HEIGHT.min(area.height);
    let max_x = area.width.saturating_sub(width) as i32;
    let max_y = area.height.saturating_sub(height) as i32;
    let x = position.x.clamp(0, max_x) as u16;
    let y = position.y.clamp(0, max_y) as u16;
    Rect::new(area.x + x, area.y + y, width, height)
}

pub(super) fn draw_meter(frame: &mut Frame, app: &MeterApp, theme: &Theme, now: DateTime<Utc>) {
    let area = panel_rect(app.config.position, frame.area());
    if area.width < 3 || area.height < 3 {
        return;
    }
    frame.render_widget(Clear, area);

    let reading = app.reading(now);
    let (title, hints) = match app.mode {
        MeterMode::Remote => (
            " Usage Meter ".to_string(),
            " [r]efresh [s]ettings [q]uit ",
        ),
        MeterMode::Manual => (
            format!(" Usage · {} ", app.tracker.plan),
            " [+]count [s]ettings [q]uit ",
        ),
    };

    let border_color = if app.drag.is_some() {
        theme.accent
    } else {
        theme.border
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(Line::from(Span::styled(
            title,
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        )))
        .title(Line::from(Span::styled(hints, Style::default().fg(theme.muted))).right_aligned());

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Usage label
            Constraint::Length(1), // Gauge
            Constraint::Length(1), // Countdown
            Constraint::Length(1), // Status
        ])
        .split(inner);

    frame.render_widget(
        Paragraph::new(Span::styled(
            reading.usage_label,
            Style::default().fg(theme.text),
        )),
        rows[0],
    );

    let gauge = Gauge::default()
        .gauge_style(
            Style::default()
                .fg(theme.severity_color(reading.severity))
                .bg(theme.track),
        )
        .ratio(reading.ratio.clamp(0.0, 1.0))
        .label("")
        .use_unicode(true);
    frame.render_widget(gauge, rows[1]);

    frame.render_widget(
        Paragraph::new(Span::styled(
            reading.countdown_label,
            Style::default().fg(theme.muted),
        )),
        rows[2],
    );

    frame.render_widget(
        Paragraph::new(Span::styled(
            status_text(app),
            Style::default().fg(theme.muted),
        )),
        rows[3],
    );
}

/// Status line, followed by the weekly window when the server sent one.
fn status_text(app: &MeterApp) -> String {
    match (app.mode, &app.weekly_window) {
        (MeterMode::Remote, Some(weekly)) => format!(
            "{} · {} {:.0}%",
            app.status,
            weekly.window_span.label().unwrap_or_else(|| "week".to_string()),
            weekly.utilization
        ),
        _ => app.status.clone(),
    }
}
