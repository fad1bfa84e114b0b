//! Thread/frame listing for one view.
//!
//! ```text
//! Thread 0x7f3a (MainThread)  active  gil  os:4242
//!     main                 __main__         sample.py:40
//!     worker_loop          __main__         sample.py:22
//!         n = 3              (arg)
//! ```

use pystacker_common::{FrameRecord, ThreadRecord};
use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};

use super::theme::{thread_color, ACCENT, STYLE_DIM, STYLE_TEXT};
use super::view_state::ViewState;

const NAME_WIDTH: usize = 28;
const MODULE_WIDTH: usize = 24;

/// Everything the view body shows, one entry per terminal line.
pub fn thread_lines(state: &ViewState) -> Vec<Line<'static>> {
    if state.threads().is_empty() {
        let hint = if state.is_loading() {
            "  Capturing..."
        } else {
            "  No threads captured yet. Press r to capture."
        };
        return vec![Line::from(Span::styled(hint, STYLE_DIM))];
    }

    let mut lines = Vec::new();
    for thread in state.threads() {
        lines.push(thread_header(thread));
        // Innermost frame last.
        for frame in thread.frames.iter().rev() {
            lines.push(frame_line(frame));
            if state.show_locals {
                lines.extend(frame.locals().iter().map(|local| {
                    let repr = local.repr.as_deref().unwrap_or("?");
                    let mut spans = vec![
                        Span::styled(format!("        {} = ", local.name), STYLE_DIM),
                        Span::styled(repr.to_string(), STYLE_TEXT),
                    ];
                    if local.arg {
                        spans.push(Span::styled("  (arg)", STYLE_DIM));
                    }
                    Line::from(spans)
                }));
            }
        }
        lines.push(Line::from(""));
    }
    lines
}

fn thread_header(thread: &ThreadRecord) -> Line<'static> {
    let color = thread_color(thread.active);
    let mut spans = vec![Span::styled(
        format!("Thread {:#x} ({})", thread.thread_id, thread.display_name()),
        Style::new().fg(color).add_modifier(Modifier::BOLD),
    )];
    spans.push(Span::styled(
        if thread.active { "  active" } else { "  idle" },
        Style::new().fg(color),
    ));
    if thread.owns_gil {
        spans.push(Span::styled("  gil", Style::new().fg(ACCENT)));
    }
    if let Some(os_id) = thread.os_thread_id {
        spans.push(Span::styled(format!("  os:{os_id}"), STYLE_DIM));
    }
    Line::from(spans)
}

fn frame_line(frame: &FrameRecord) -> Line<'static> {
    let name = frame.name.as_deref().unwrap_or("<unknown>");
    let module = frame.module.as_deref().unwrap_or("");
    let location = frame.location().unwrap_or_default();
    Line::from(vec![
        Span::styled(format!("    {name:<NAME_WIDTH$} "), STYLE_TEXT),
        Span::styled(format!("{module:<MODULE_WIDTH$} "), STYLE_DIM),
        Span::styled(location, Style::new().fg(ACCENT)),
    ])
}
