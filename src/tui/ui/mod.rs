mod meter;
mod overlays;
pub mod theme;

pub use meter::panel_rect;

use crate::tui::MeterApp;
use chrono::Utc;
use ratatui::Frame;
use theme::Theme;

pub fn draw(frame: &mut Frame, app: &MeterApp) {
    let theme = Theme::with_opacity(app.config.opacity);
    meter::draw_meter(frame, app, &theme, Utc::now());
    overlays::draw_overlay(frame, app, &theme);
}

#[cfg(test)]
#[path = "tests/draw_tests.rs"]
mod tests;
