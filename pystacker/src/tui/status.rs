use chrono::Local;
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::theme::{ACCENT, ERROR_RED, IDLE_DIM, PYTHON_BLUE, STYLE_DIM, STYLE_ERROR, STYLE_KEY};
use super::view_state::ViewState;

/// Bottom bar: key hints, then the active view's state or a global notice.
pub fn render(f: &mut Frame, area: Rect, active: Option<&ViewState>, notice: Option<&str>) {
    let mut spans = Vec::new();
    for (key, label) in
        [("Tab", "View"), ("R", "Refresh"), ("L", "Locals"), ("X", "Close"), ("?", "Help"), ("Q", "Quit")]
    {
        spans.push(Span::styled(key, STYLE_KEY));
        spans.push(Span::styled(format!(":{label} "), STYLE_DIM));
    }

    if let Some(message) = notice {
        spans.push(Span::styled(format!("[!] {message}"), STYLE_ERROR));
    } else if let Some(view) = active {
        spans.push(state_indicator(view));
    }

    let border = if notice.is_some() { ERROR_RED } else { ACCENT };
    let bar = Paragraph::new(vec![Line::from(spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::new().fg(border)));
    f.render_widget(bar, area);
}

fn state_indicator(view: &ViewState) -> Span<'static> {
    if view.is_loading() {
        return Span::styled("[Capturing]", Style::new().fg(ACCENT));
    }
    match view.captured_at() {
        Some(at) => Span::styled(
            format!("[Updated {}]", at.with_timezone(&Local).format("%H:%M:%S")),
            Style::new().fg(PYTHON_BLUE),
        ),
        None => Span::styled("[No data]", Style::new().fg(IDLE_DIM)),
    }
}
