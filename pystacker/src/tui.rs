//! # Terminal User Interface (TUI)
//!
//! Interactive terminal host using `ratatui`. Each view is a tab showing one
//! target's threads.
//!
//! ## Threads and Channels
//!
//! The TUI runs on its own thread ([`run`]); the core never touches the
//! terminal.
//!
//! - core → TUI: [`HostCommand`] over `crossbeam-channel`, sent by [`TuiHost`]
//! - TUI → core: [`HostEvent`] over a tokio unbounded channel
//!
//! A tab sends `ready` as soon as it opens, and `refresh` when the user
//! presses `r`.
//!
//! ## Sub-Modules
//!
//! - `view_state` - per-tab model (init/error application, soft timeout)
//! - `threads` - thread and frame listing
//! - `status` - bottom status bar
//! - `theme` - colors

#![allow(clippy::too_many_lines)]

use std::io::{self, IsTerminal};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{debug, warn};
use pystacker_common::{ProcessInfo, ViewRequest, ViewUpdate};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs},
    Terminal,
};
use tokio::sync::mpsc::UnboundedSender;

use crate::domain::errors::TuiError;
use crate::domain::{HostError, ViewHandle};
use crate::host::{HostEvent, ViewHost};

mod status;
mod theme;
mod threads;
pub mod view_state; // Public for testing

use theme::{ACCENT, ERROR_RED, STYLE_DIM, STYLE_ERROR, STYLE_HEADING, STYLE_KEY, STYLE_TEXT};
use view_state::ViewState;

const PAGE: isize = 20;

// =============================================================================
// HOST SIDE (core thread)
// =============================================================================

/// Core → TUI traffic.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCommand {
    Open { view: ViewHandle, target: ProcessInfo },
    Reveal { view: ViewHandle },
    Post { view: ViewHandle, update: ViewUpdate },
    Notify { message: String },
    Document { title: String, text: String },
}

/// [`ViewHost`] backed by the TUI thread.
pub struct TuiHost {
    commands: Sender<HostCommand>,
    next_view: u64,
}

impl TuiHost {
    pub fn new(commands: Sender<HostCommand>) -> Self {
        Self { commands, next_view: 1 }
    }

    fn send(&self, command: HostCommand) -> Result<(), HostError> {
        self.commands.send(command).map_err(|_| HostError::Disconnected)
    }
}

impl ViewHost for TuiHost {
    fn create_view(&mut self, target: &ProcessInfo) -> ViewHandle {
        let view = ViewHandle(self.next_view);
        self.next_view += 1;
        if let Err(e) = self.send(HostCommand::Open { view, target: target.clone() }) {
            warn!("Failed to open {view}: {e}");
        }
        view
    }

    fn reveal(&mut self, view: ViewHandle) {
        if let Err(e) = self.send(HostCommand::Reveal { view }) {
            debug!("Failed to reveal {view}: {e}");
        }
    }

    fn post(&mut self, view: ViewHandle, update: ViewUpdate) -> Result<(), HostError> {
        self.send(HostCommand::Post { view, update })
    }

    fn notify_error(&mut self, message: &str) {
        if let Err(e) = self.send(HostCommand::Notify { message: message.to_string() }) {
            warn!("Failed to show \"{message}\": {e}");
        }
    }

    fn show_document(&mut self, title: &str, text: &str) -> Result<(), HostError> {
        self.send(HostCommand::Document { title: title.to_string(), text: text.to_string() })
    }
}

// =============================================================================
// TUI SIDE (render thread)
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Overlay {
    None,
    Help,
    Document { title: String, text: String, scroll: usize },
}

struct Tab {
    view: ViewHandle,
    state: ViewState,
}

/// State of the TUI thread: open tabs plus whatever overlay is up.
struct TuiApp {
    tabs: Vec<Tab>,
    active: usize,
    overlay: Overlay,
    notice: Option<String>,
    events: UnboundedSender<HostEvent>,
    should_quit: bool,
}

impl TuiApp {
    fn new(events: UnboundedSender<HostEvent>) -> Self {
        Self {
            tabs: Vec::new(),
            active: 0,
            overlay: Overlay::None,
            notice: None,
            events,
            should_quit: false,
        }
    }

    fn emit(&mut self, event: HostEvent) {
        if self.events.send(event).is_err() {
            // Core loop is gone; nothing left to drive.
            self.should_quit = true;
        }
    }

    fn tab_index(&self, view: ViewHandle) -> Option<usize> {
        self.tabs.iter().position(|tab| tab.view == view)
    }

    fn active_tab_mut(&mut self) -> Option<&mut Tab> {
        self.tabs.get_mut(self.active)
    }

    fn apply_command(&mut self, command: HostCommand) {
        match command {
            HostCommand::Open { view, target } => {
                self.tabs.push(Tab { view, state: ViewState::new(target) });
                self.active = self.tabs.len() - 1;
                self.emit(HostEvent::View { view, request: ViewRequest::Ready });
            }
            HostCommand::Reveal { view } => {
                if let Some(index) = self.tab_index(view) {
                    self.active = index;
                }
            }
            HostCommand::Post { view, update } => match self.tab_index(view) {
                Some(index) => self.tabs[index].state.apply(update),
                None => debug!("Dropping update for closed {view}"),
            },
            HostCommand::Notify { message } => self.notice = Some(message),
            HostCommand::Document { title, text } => {
                self.overlay = Overlay::Document { title, text, scroll: 0 };
            }
        }
    }

    fn tick(&mut self, now: Instant) {
        for tab in &mut self.tabs {
            tab.state.tick(now);
        }
    }

    fn handle_key(&mut self, key: KeyCode) {
        match &mut self.overlay {
            Overlay::Help => {
                if matches!(key, KeyCode::Esc | KeyCode::Char('?' | 'q' | 'Q')) {
                    self.overlay = Overlay::None;
                }
                return;
            }
            Overlay::Document { scroll, .. } => {
                match key {
                    KeyCode::Esc | KeyCode::Char('q' | 'Q') => self.overlay = Overlay::None,
                    KeyCode::Up => *scroll = scroll.saturating_sub(1),
                    KeyCode::Down => *scroll += 1,
                    KeyCode::PageUp => *scroll = scroll.saturating_sub(PAGE.unsigned_abs()),
                    KeyCode::PageDown => *scroll += PAGE.unsigned_abs(),
                    _ => {}
                }
                return;
            }
            Overlay::None => {}
        }

        match key {
            KeyCode::Char('q' | 'Q') => {
                self.emit(HostEvent::Quit);
                self.should_quit = true;
            }
            KeyCode::Char('?') => self.overlay = Overlay::Help,
            KeyCode::Esc => self.notice = None,
            KeyCode::Tab if !self.tabs.is_empty() => {
                self.active = (self.active + 1) % self.tabs.len();
            }
            KeyCode::BackTab if !self.tabs.is_empty() => {
                self.active = (self.active + self.tabs.len() - 1) % self.tabs.len();
            }
            KeyCode::Up => self.scroll_active(-1),
            KeyCode::Down => self.scroll_active(1),
            KeyCode::PageUp => self.scroll_active(-PAGE),
            KeyCode::PageDown => self.scroll_active(PAGE),
            KeyCode::Char('l' | 'L') => {
                if let Some(tab) = self.active_tab_mut() {
                    tab.state.toggle_locals();
                }
            }
            KeyCode::Char('r' | 'R') => {
                let now = Instant::now();
                let request = self
                    .active_tab_mut()
                    .and_then(|tab| tab.state.begin_refresh(now).map(|req| (tab.view, req)));
                if let Some((view, request)) = request {
                    self.emit(HostEvent::View { view, request });
                }
            }
            KeyCode::Char('x' | 'X') => self.close_active(),
            _ => {}
        }
    }

    fn scroll_active(&mut self, delta: isize) {
        if let Some(tab) = self.active_tab_mut() {
            tab.state.scroll_by(delta);
        }
    }

    fn close_active(&mut self) {
        if self.active >= self.tabs.len() {
            return;
        }
        let tab = self.tabs.remove(self.active);
        self.active = self.active.min(self.tabs.len().saturating_sub(1));
        self.emit(HostEvent::Closed { view: tab.view });
    }

    fn render(&mut self, f: &mut ratatui::Frame) {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Tabs
                Constraint::Min(0),    // Active view
                Constraint::Length(3), // Status bar
            ])
            .split(f.area());

        let titles: Vec<Line> = self
            .tabs
            .iter()
            .map(|tab| {
                let marker = if tab.state.is_loading() { " *" } else { "" };
                Line::from(format!("{}{marker}", tab.state.target().label()))
            })
            .collect();
        let tabs = Tabs::new(titles)
            .select(self.active)
            .style(STYLE_DIM)
            .highlight_style(STYLE_HEADING.add_modifier(Modifier::REVERSED))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(Span::styled(" pystacker ", STYLE_HEADING))
                    .border_style(Style::new().fg(ACCENT)),
            );
        f.render_widget(tabs, layout[0]);

        let body = layout[1];
        match self.tabs.get_mut(self.active) {
            Some(tab) => render_view(f, body, &mut tab.state),
            None => {
                let empty = Paragraph::new(Line::from(Span::styled(
                    "  No views open. Captures appear here as tabs.",
                    STYLE_DIM,
                )))
                .block(Block::default().borders(Borders::ALL));
                f.render_widget(empty, body);
            }
        }

        status::render(
            f,
            layout[2],
            self.tabs.get(self.active).map(|tab| &tab.state),
            self.notice.as_deref(),
        );

        match &mut self.overlay {
            Overlay::None => {}
            Overlay::Help => render_help_overlay(f, f.area()),
            Overlay::Document { title, text, scroll } => {
                render_document_overlay(f, f.area(), title, text, scroll);
            }
        }
    }
}

fn render_view(f: &mut ratatui::Frame, area: Rect, state: &mut ViewState) {
    let mut lines = Vec::new();
    if let Some(error) = state.error() {
        for message_line in error.lines() {
            lines.push(Line::from(Span::styled(format!(" {message_line}"), STYLE_ERROR)));
        }
        lines.push(Line::from(""));
    }
    lines.extend(threads::thread_lines(state));

    let visible = usize::from(area.height.saturating_sub(2));
    state.scroll = state.scroll.min(lines.len().saturating_sub(visible));

    let title = format!(" {} · {} threads ", state.target().label(), state.threads().len());
    let border = if state.error().is_some() { ERROR_RED } else { ACCENT };
    let paragraph = Paragraph::new(lines).scroll((scroll_offset(state.scroll), 0)).block(
        Block::default().borders(Borders::ALL).title(title).border_style(Style::new().fg(border)),
    );
    f.render_widget(paragraph, area);
}

/// Paragraph offsets are `u16`; anything further pins at `u16::MAX`.
fn scroll_offset(scroll: usize) -> u16 {
    u16::try_from(scroll).unwrap_or(u16::MAX)
}

// =============================================================================
// OVERLAY RENDERERS
// =============================================================================

fn render_help_overlay(f: &mut ratatui::Frame, area: Rect) {
    let popup_area = centered_popup(area, 70, 18);

    let key = |k: &'static str, what: &'static str| {
        Line::from(vec![Span::styled(format!("  {k:<12}"), STYLE_KEY), Span::styled(what, STYLE_TEXT)])
    };
    let help_text = vec![
        Line::from(""),
        Line::from(Span::styled("  What You're Looking At", STYLE_HEADING)),
        Line::from(Span::styled(
            "  One tab per Python process. Each tab is a single py-spy dump:",
            STYLE_DIM,
        )),
        Line::from(Span::styled(
            "  every thread with its call stack, innermost frame last.",
            STYLE_DIM,
        )),
        Line::from(""),
        Line::from(Span::styled("  Keys", STYLE_HEADING)),
        key("Tab/S-Tab", "Switch view"),
        key("↑↓ PgUp/Dn", "Scroll"),
        key("r", "Capture again"),
        key("l", "Show/hide local variables"),
        key("x", "Close view"),
        key("Esc", "Dismiss notification"),
        key("q", "Quit"),
        Line::from(""),
        Line::from(Span::styled("  Press Esc to close", STYLE_DIM)),
    ];

    let help = Paragraph::new(help_text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Help ")
            .style(Style::new().bg(ratatui::style::Color::Black).fg(ACCENT)),
    );

    f.render_widget(Clear, popup_area);
    f.render_widget(help, popup_area);
}

fn render_document_overlay(
    f: &mut ratatui::Frame,
    area: Rect,
    title: &str,
    text: &str,
    scroll: &mut usize,
) {
    let popup_area = centered_popup(area, 90, area.height.saturating_sub(4));
    let lines: Vec<Line> = text.lines().map(|l| Line::from(Span::styled(l, STYLE_TEXT))).collect();
    *scroll = (*scroll).min(lines.len().saturating_sub(1));

    let document = Paragraph::new(lines).scroll((scroll_offset(*scroll), 0)).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!(" {title} (read-only, Esc to close) "))
            .style(Style::new().bg(ratatui::style::Color::Black).fg(ACCENT)),
    );

    f.render_widget(Clear, popup_area);
    f.render_widget(document, popup_area);
}

/// Create a centered popup area with given width percentage and height in lines
fn centered_popup(area: Rect, width_percent: u16, height_lines: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Fill(1), Constraint::Length(height_lines), Constraint::Fill(1)])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}

// =============================================================================
// MAIN LOOP
// =============================================================================

/// Run the TUI until the user quits or the core goes away.
///
/// 1. Sets up the terminal in raw mode
/// 2. Applies host commands from the core (non-blocking)
/// 3. Redraws at 10Hz and expires stale refreshes
/// 4. Handles keyboard input
/// 5. Cleans up terminal on exit
///
/// # Errors
/// Returns an error if stdout is not a terminal, or terminal setup or
/// rendering fails
pub fn run(commands: Receiver<HostCommand>, events: UnboundedSender<HostEvent>) -> Result<(), TuiError> {
    if !io::stdout().is_terminal() {
        return Err(TuiError::TerminalError(
            "stdout is not a terminal; use --headless".to_string(),
        ));
    }

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = TuiApp::new(events);
    let result = event_loop(&mut terminal, &mut app, &commands);

    // Cleanup terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn event_loop<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut TuiApp,
    commands: &Receiver<HostCommand>,
) -> Result<(), TuiError> {
    const UPDATE_INTERVAL: Duration = Duration::from_millis(100); // 10 Hz refresh

    loop {
        loop {
            match commands.try_recv() {
                Ok(command) => app.apply_command(command),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    app.should_quit = true;
                    break;
                }
            }
        }

        app.tick(Instant::now());
        terminal.draw(|f| app.render(f))?;

        if event::poll(UPDATE_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.handle_key(key.code);
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pystacker_common::Pid;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    fn app() -> (TuiApp, UnboundedReceiver<HostEvent>) {
        let (tx, rx) = unbounded_channel();
        (TuiApp::new(tx), rx)
    }

    fn open(app: &mut TuiApp, view: u64, pid: i32) {
        app.apply_command(HostCommand::Open {
            view: ViewHandle(view),
            target: ProcessInfo::new(Pid(pid), "python3"),
        });
    }

    #[test]
    fn test_host_forwards_commands() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut host = TuiHost::new(tx);
        let view = host.create_view(&ProcessInfo::new(Pid(1), "python"));
        host.notify_error("boom");
        assert!(matches!(rx.try_recv(), Ok(HostCommand::Open { view: v, .. }) if v == view));
        assert_eq!(rx.try_recv().unwrap(), HostCommand::Notify { message: "boom".into() });

        drop(rx);
        assert_eq!(
            host.post(view, ViewUpdate::Error { message: "x".into() }),
            Err(HostError::Disconnected)
        );
    }

    #[test]
    fn test_open_sends_ready() {
        let (mut app, mut rx) = app();
        open(&mut app, 1, 1001);
        assert_eq!(
            rx.try_recv().unwrap(),
            HostEvent::View { view: ViewHandle(1), request: ViewRequest::Ready }
        );
        assert_eq!(app.active, 0);
    }

    #[test]
    fn test_refresh_key_requests_capture_once() {
        let (mut app, mut rx) = app();
        open(&mut app, 1, 1001);
        rx.try_recv().unwrap();

        app.handle_key(KeyCode::Char('r'));
        app.handle_key(KeyCode::Char('r'));
        assert_eq!(
            rx.try_recv().unwrap(),
            HostEvent::View {
                view: ViewHandle(1),
                request: ViewRequest::Refresh { pid: Some(Pid(1001)), name: Some("python3".into()) }
            }
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_close_reports_disposal() {
        let (mut app, mut rx) = app();
        open(&mut app, 1, 1001);
        open(&mut app, 2, 1002);
        while rx.try_recv().is_ok() {}

        app.handle_key(KeyCode::Char('x'));
        assert_eq!(rx.try_recv().unwrap(), HostEvent::Closed { view: ViewHandle(2) });
        assert_eq!(app.tabs.len(), 1);
        assert_eq!(app.active, 0);

        app.apply_command(HostCommand::Post {
            view: ViewHandle(2),
            update: ViewUpdate::Error { message: "late".into() },
        });
        assert!(app.tabs[0].state.error().is_none());
    }

    #[test]
    fn test_tab_cycles() {
        let (mut app, _rx) = app();
        open(&mut app, 1, 1);
        open(&mut app, 2, 2);
        open(&mut app, 3, 3);
        app.handle_key(KeyCode::Tab);
        assert_eq!(app.active, 0);
        app.handle_key(KeyCode::BackTab);
        assert_eq!(app.active, 2);
        app.apply_command(HostCommand::Reveal { view: ViewHandle(2) });
        assert_eq!(app.active, 1);
    }

    #[test]
    fn test_overlays_swallow_keys() {
        let (mut app, mut rx) = app();
        app.apply_command(HostCommand::Document { title: "dump".into(), text: "raw".into() });
        app.handle_key(KeyCode::Char('q'));
        assert_eq!(app.overlay, Overlay::None);
        assert!(!app.should_quit);
        assert!(rx.try_recv().is_err());

        app.handle_key(KeyCode::Char('q'));
        assert!(app.should_quit);
        assert_eq!(rx.try_recv().unwrap(), HostEvent::Quit);
    }

    #[test]
    fn test_scroll_offset_saturates() {
        assert_eq!(scroll_offset(0), 0);
        assert_eq!(scroll_offset(65_535), u16::MAX);
        assert_eq!(scroll_offset(70_000), u16::MAX);
    }
}
