//! TUI color theme

use ratatui::style::{Color, Modifier, Style};

pub const ACCENT: Color = Color::Rgb(255, 212, 59);
pub const PYTHON_BLUE: Color = Color::Rgb(75, 139, 190);
pub const ERROR_RED: Color = Color::Rgb(235, 80, 80);
pub const IDLE_DIM: Color = Color::Rgb(120, 120, 120);
pub const TEXT: Color = Color::White;

pub const STYLE_HEADING: Style = Style::new().fg(ACCENT).add_modifier(Modifier::BOLD);
pub const STYLE_DIM: Style = Style::new().fg(IDLE_DIM);
pub const STYLE_KEY: Style = Style::new().fg(ACCENT);
pub const STYLE_TEXT: Style = Style::new().fg(TEXT);
pub const STYLE_ERROR: Style = Style::new().fg(ERROR_RED).add_modifier(Modifier::BOLD);

/// Thread header color: running threads stand out, idle ones fade.
#[must_use]
pub fn thread_color(active: bool) -> Color {
    if active {
        PYTHON_BLUE
    } else {
        IDLE_DIM
    }
}
