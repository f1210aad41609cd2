use crate::tui::MeterApp;
use crossterm::event::{MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

/// Drags the panel by its top border. Returns true if the event was handled.
pub fn handle_mouse(app: &mut MeterApp, mouse: MouseEvent, area: Rect) -> bool {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => app.begin_drag(mouse.column, mouse.row, area),
        MouseEventKind::Drag(MouseButton::Left) if app.drag.is_some() => {
            app.drag_to(mouse.column, mouse.row, area);
            true
        }
        MouseEventKind::Up(MouseButton::Left) if app.drag.is_some() => {
            app.end_drag();
            true
        }
        _ => false,
    }
}
