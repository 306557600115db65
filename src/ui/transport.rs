// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Transport and position header.

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Paragraph, Widget},
};

use crate::project::{PlayMode, Project};

/// Header showing mode, position and tempo
pub struct TransportWidget<'a> {
    project: &'a Project,
    octave: u8,
    block: Option<Block<'a>>,
}

impl<'a> TransportWidget<'a> {
    /// Create a new transport widget
    pub fn new(project: &'a Project) -> Self {
        Self {
            project,
            octave: 4,
            block: None,
        }
    }

    /// Keyboard octave to display
    pub fn octave(mut self, octave: u8) -> Self {
        self.octave = octave;
        self
    }

    /// Set the block wrapper
    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

/// "Song 2/3 Chorus" style label
fn position_label(project: &Project) -> String {
    let Ok(pos) = project.position() else {
        return "empty project".to_string();
    };
    let song = project.song(pos.song).map(|s| s.name.as_str()).unwrap_or("?");
    let part = project.part(pos.part).map(|p| p.name.as_str()).unwrap_or("?");
    let pattern = project.pattern(pos.pattern).map(|p| p.name.as_str()).unwrap_or("?");
    let rows = project.pattern(pos.pattern).map(|p| p.row_count()).unwrap_or(0);
    format!(
        "S{:02} {}  P{:02} {}  T{:02} {}  {:03}/{:03}",
        pos.song.get() + 1,
        song,
        pos.song_part.get() + 1,
        part,
        pos.part_pattern.get() + 1,
        pattern,
        pos.row.get(),
        rows
    )
}

impl Widget for TransportWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let area = if let Some(block) = self.block {
            let inner = block.inner(area);
            block.render(area, buf);
            inner
        } else {
            area
        };

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(10), // Mode
                Constraint::Length(6),  // Edit
                Constraint::Min(20),    // Position
                Constraint::Length(20), // Tempo
                Constraint::Length(5),  // Octave
            ])
            .split(area);

        let mode = self.project.mode();
        let mode_style = match mode {
            PlayMode::Stopped => Style::default().fg(Color::Yellow),
            _ => Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        };
        let indicator = if mode.is_playing() { "▶" } else { "■" };
        Paragraph::new(format!("{} {}", indicator, mode.label()))
            .style(mode_style)
            .render(chunks[0], buf);

        if self.project.is_edit() {
            Paragraph::new("EDIT")
                .style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD))
                .render(chunks[1], buf);
        }

        let dirty = if self.project.is_changed() { "*" } else { "" };
        Paragraph::new(format!("{}{}  {}", self.project.name, dirty, position_label(self.project)))
            .style(Style::default().fg(Color::Cyan))
            .render(chunks[2], buf);

        let effective = self.project.effective_tempo().unwrap_or(self.project.tempo() as i32);
        Paragraph::new(format!(
            "{} BPM ({}) x{}",
            effective,
            self.project.tempo(),
            self.project.quantization()
        ))
        .style(Style::default().fg(Color::Magenta))
        .render(chunks[3], buf);

        Paragraph::new(format!("O{}", self.octave))
            .style(Style::default().fg(Color::White))
            .render(chunks[4], buf);
    }
}
