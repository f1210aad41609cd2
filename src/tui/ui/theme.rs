//! Colour palette for the meter.
//!
//! The gauge takes its colour from the usage severity band. Opacity has no
//! terminal equivalent, so every colour is scaled toward black instead.

use crate::usage_reset::UsageSeverity;
use ratatui::style::Color;

/// Normal usage
pub const COPPER: Color = Color::Rgb(0xCC, 0x78, 0x5C);
/// 70% and above
pub const AMBER: Color = Color::Rgb(0xFF, 0xAA, 0x44);
/// 90% and above
pub const CRIMSON: Color = Color::Rgb(0xFF, 0x44, 0x44);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub text: Color,
    pub muted: Color,
    pub accent: Color,
    pub warning: Color,
    pub critical: Color,
    pub border: Color,
    /// Unfilled part of the gauge
    pub track: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            text: Color::Rgb(0xFF, 0xFF, 0xFF),
            muted: Color::Rgb(0x88, 0x88, 0x88),
            accent: COPPER,
            warning: AMBER,
            critical: CRIMSON,
            border: Color::Rgb(0x5A, 0x5A, 0x5A),
            track: Color::Rgb(0x2A, 0x2A, 0x2A),
        }
    }
}

impl Theme {
    /// The default palette dimmed to `opacity`.
    pub fn with_opacity(opacity: f64) -> Self {
        let base = Self::default();
        Self {
            text: dim(base.text, opacity),
            muted: dim(base.muted, opacity),
            accent: dim(base.accent, opacity),
            warning: dim(base.warning, opacity),
            critical: dim(base.critical, opacity),
            border: dim(base.border, opacity),
            track: dim(base.track, opacity),
        }
    }

    pub fn severity_color(&self, severity: UsageSeverity) -> Color {
        match severity {
            UsageSeverity::Normal => self.accent,
            UsageSeverity::Elevated => self.warning,
            UsageSeverity::Critical => self.critical,
        }
    }
}

/// Scales an RGB colour by `opacity` (clamped to `[0, 1]`). Named and indexed
/// colours are left alone since their real value is up to the terminal.
pub fn dim(color: Color, opacity: f64) -> Color {
    let factor = if opacity.is_nan() {
        1.0
    } else {
        opacity.clamp(0.0, 1.0)
    };
    match color {
        Color::Rgb(r, g, b) => {
            let scale = |c: u8| (c as f64 * factor).round() as u8;
            Color::Rgb(scale(r), scale(g), scale(b))
        }
        other => other,
    }
}
