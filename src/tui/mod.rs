mod app;
mod event;
pub mod ui;

pub use app::{
    LoginField, LoginForm, ManualSetupForm, MeterApp, MeterMode, Overlay, PollerCommand,
    SettingsForm, SettingsRow,
};
pub use event::{Event, EventHandler};
