// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Terminal UI for the trak tracker.
//!
//! Provides a ratatui-based terminal interface with a transport header,
//! the pattern grid, a status line and a help overlay. Redraws happen only
//! when a commit reported a changed facet or the view state changed.

mod pattern;
mod transport;

pub use pattern::{cell_text, note_name, PatternWidget, GUTTER_WIDTH};
pub use transport::TransportWidget;

use std::collections::HashSet;
use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame, Terminal,
};

use crate::control::{format_shortcut, ControlAction, KeyboardController};
use crate::project::Project;
use crate::sequencer::{ColumnMap, Facet, Renderer};

/// How long a status message stays up
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

/// View state that lives outside the project
#[derive(Debug, Clone, Default)]
pub struct UiState {
    /// Help text visible
    pub show_help: bool,
    /// Status message
    pub status_message: Option<String>,
    /// Status message timestamp
    pub status_time: Option<Instant>,
}

impl UiState {
    /// Set a status message that will be displayed temporarily
    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
        self.status_time = Some(Instant::now());
    }

    /// Clear expired status message. Returns true if one was cleared.
    pub fn clear_expired_status(&mut self) -> bool {
        self.clear_status_before(Instant::now())
    }

    fn clear_status_before(&mut self, now: Instant) -> bool {
        match self.status_time {
            Some(time) if now.saturating_duration_since(time) > STATUS_TIMEOUT => {
                self.status_message = None;
                self.status_time = None;
                true
            }
            _ => false,
        }
    }
}

/// Collects commit notifications until the next frame
#[derive(Debug, Clone, Default)]
pub struct RepaintTracker {
    facets: HashSet<Facet>,
    forced: bool,
}

impl RepaintTracker {
    /// Create a tracker that paints the first frame
    pub fn new() -> Self {
        Self {
            facets: HashSet::new(),
            forced: true,
        }
    }

    /// Request a repaint for something outside the project
    pub fn force(&mut self) {
        self.forced = true;
    }

    /// Whether a facet changed since the last frame
    pub fn changed(&self, facet: Facet) -> bool {
        self.facets.contains(&facet)
    }

    /// Whether anything needs painting; resets the tracker
    pub fn take(&mut self) -> bool {
        let dirty = self.forced || !self.facets.is_empty();
        self.facets.clear();
        self.forced = false;
        dirty
    }
}

impl Renderer for RepaintTracker {
    fn facet_changed(&mut self, facet: Facet) {
        self.facets.insert(facet);
    }
}

/// Everything a frame draws from
pub struct View<'a> {
    /// Project model
    pub project: &'a Project,
    /// Column map of the pattern under the cursor
    pub columns: &'a ColumnMap,
    /// Keyboard bindings and octave
    pub keyboard: &'a KeyboardController,
}

/// Terminal UI application
pub struct App {
    state: UiState,
    terminal: Terminal<CrosstermBackend<Stdout>>,
    poll_timeout: Duration,
    restored: bool,
}

impl App {
    /// Enter raw mode and the alternate screen
    pub fn new(poll_ms: u64) -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;

        Ok(Self {
            state: UiState::default(),
            terminal,
            poll_timeout: Duration::from_millis(poll_ms.max(1)),
            restored: false,
        })
    }

    /// View state
    pub fn state(&self) -> &UiState {
        &self.state
    }

    /// Mutable view state
    pub fn state_mut(&mut self) -> &mut UiState {
        &mut self.state
    }

    /// Poll for events, waiting at most `max` (capped at the poll timeout)
    pub fn poll_event(&self, max: Duration) -> io::Result<Option<Event>> {
        if event::poll(self.poll_timeout.min(max))? {
            Ok(Some(event::read()?))
        } else {
            Ok(None)
        }
    }

    /// Draw the UI
    pub fn draw(&mut self, view: &View<'_>) -> io::Result<()> {
        let state = &self.state;
        self.terminal.draw(|frame| {
            let area = frame.area();

            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(3), // Header
                    Constraint::Min(4),    // Pattern
                    Constraint::Length(1), // Status bar
                ])
                .split(area);

            frame.render_widget(
                TransportWidget::new(view.project)
                    .octave(view.keyboard.octave())
                    .block(Block::default().borders(Borders::ALL).title(" trak ")),
                chunks[0],
            );
            frame.render_widget(
                PatternWidget::new(view.project, view.columns)
                    .block(Block::default().borders(Borders::ALL)),
                chunks[1],
            );
            render_status_bar(frame, chunks[2], state);

            if state.show_help {
                render_help_overlay(frame, area, view.keyboard);
            }
        })?;
        Ok(())
    }

    /// Leave raw mode and the alternate screen
    pub fn restore(&mut self) -> io::Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()?;
        Ok(())
    }
}

impl Drop for App {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

/// Render status bar
fn render_status_bar(frame: &mut Frame, area: Rect, state: &UiState) {
    let text = if let Some(ref msg) = state.status_message {
        Span::styled(msg.as_str(), Style::default().fg(Color::Yellow))
    } else {
        Span::styled(
            " Space: Edit | F5-F8: Play | Esc: Stop | Ctrl+S: Save | ?: Help | Ctrl+Q: Quit",
            Style::default().fg(Color::DarkGray),
        )
    };

    frame.render_widget(Paragraph::new(text), area);
}

/// Help lines grouped by category, one line per distinct description
pub fn help_lines(keyboard: &KeyboardController) -> Vec<Line<'static>> {
    const CATEGORIES: [&str; 5] = ["Transport", "Editing", "Navigation", "Notes", "UI"];
    let grouped = keyboard.bindings_by_category();
    let mut lines = Vec::new();

    for category in CATEGORIES {
        let Some(bindings) = grouped.get(category) else {
            continue;
        };
        lines.push(Line::from(Span::styled(
            category,
            Style::default().add_modifier(Modifier::BOLD),
        )));

        if category == "Notes" {
            lines.push(Line::from("  Z S X .. M      Piano, lower octave"));
            lines.push(Line::from("  Q 2 W .. U      Piano, upper octave"));
        }

        let mut entries: Vec<(String, Vec<String>)> = Vec::new();
        for binding in bindings {
            if matches!(binding.action, ControlAction::NoteKey(_)) {
                continue;
            }
            let key = format_shortcut(&binding.shortcut);
            match entries.iter_mut().find(|(d, _)| *d == binding.description) {
                Some((_, keys)) => keys.push(key),
                None => entries.push((binding.description.clone(), vec![key])),
            }
        }
        entries.sort();
        for (description, mut keys) in entries {
            keys.sort();
            lines.push(Line::from(format!("  {:<16}{}", keys.join("/"), description)));
        }
        lines.push(Line::from(""));
    }
    lines
}

/// Render help overlay
fn render_help_overlay(frame: &mut Frame, area: Rect, keyboard: &KeyboardController) {
    let lines = help_lines(keyboard);
    let width = 50.min(area.width.saturating_sub(4));
    let height = (lines.len() as u16 + 2).min(area.height.saturating_sub(2));
    let x = (area.width - width) / 2;
    let y = (area.height - height) / 2;
    let help_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, help_area);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Help ")
        .style(Style::default().bg(Color::Black));
    frame.render_widget(Paragraph::new(lines).block(block), help_area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ui_state_status() {
        let mut state = UiState::default();
        assert!(state.status_message.is_none());

        state.set_status("Saved");
        assert_eq!(state.status_message, Some("Saved".to_string()));
        assert!(!state.clear_expired_status());

        let later = Instant::now() + STATUS_TIMEOUT + Duration::from_millis(10);
        assert!(state.clear_status_before(later));
        assert!(state.status_message.is_none());
    }

    #[test]
    fn test_repaint_tracker() {
        let mut tracker = RepaintTracker::new();
        assert!(tracker.take());
        assert!(!tracker.take());

        tracker.facet_changed(Facet::Row);
        tracker.facet_changed(Facet::Row);
        assert!(tracker.changed(Facet::Row));
        assert!(!tracker.changed(Facet::Cell));
        assert!(tracker.take());
        assert!(!tracker.changed(Facet::Row));

        tracker.force();
        assert!(tracker.take());
    }

    #[test]
    fn test_help_lines() {
        let keyboard = KeyboardController::with_defaults();
        let text: Vec<String> = help_lines(&keyboard)
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();

        assert!(text.iter().any(|l| l == "Transport"));
        assert!(text.iter().any(|l| l.contains("F5") && l.contains("Play Project")));
        assert!(text.iter().any(|l| l.contains("Delete") && l.contains("Clear Cell")));
        // Piano keys are summarized, not listed one by one
        assert!(!text.iter().any(|l| l.contains("Note +")));
    }
}
