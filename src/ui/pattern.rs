// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Pattern grid widget.
//!
//! Cells are placed by the column map, so the grid lines up with the
//! cursor columns the editor moves through.

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Widget},
};

use crate::project::{Pattern, Project};
use crate::sequencer::{Column, ColumnMap, FieldKind};

/// Width of the row number gutter, including its trailing space
pub const GUTTER_WIDTH: u16 = 4;

/// Tracker note name: "C-4", "C#4", "---" for no note
pub fn note_name(key: u8) -> String {
    const NAMES: [&str; 12] = ["C-", "C#", "D-", "D#", "E-", "F-", "F#", "G-", "G#", "A-", "A#", "B-"];
    if key == 0 {
        return "---".to_string();
    }
    format!("{}{:X}", NAMES[(key % 12) as usize], key / 12)
}

/// Text shown at one cursor column of one row
pub fn cell_text(pattern: &Pattern, row: usize, column: &Column) -> String {
    let Some(cells) = pattern
        .rows()
        .get(row)
        .and_then(|r| r.tracks.get(column.track.get()))
    else {
        return String::new();
    };
    let sub = column.sub as usize;

    let nibble = |value: u8, high: bool, blank: bool| {
        if blank {
            ".".to_string()
        } else if high {
            format!("{:X}", value >> 4)
        } else {
            format!("{:X}", value & 0x0F)
        }
    };

    match column.kind {
        FieldKind::Note => cells.notes.get(sub).map(|n| note_name(n.key)).unwrap_or_default(),
        FieldKind::VelocityHigh | FieldKind::VelocityLow => cells
            .notes
            .get(sub)
            .map(|n| nibble(n.velocity, column.kind == FieldKind::VelocityHigh, n.is_empty()))
            .unwrap_or_default(),
        FieldKind::CommandHigh | FieldKind::CommandLow => cells
            .effects
            .get(sub)
            .map(|e| nibble(e.command, column.kind == FieldKind::CommandHigh, e.is_empty()))
            .unwrap_or_default(),
        FieldKind::ParameterHigh | FieldKind::ParameterLow => cells
            .effects
            .get(sub)
            .map(|e| nibble(e.parameter, column.kind == FieldKind::ParameterHigh, e.is_empty()))
            .unwrap_or_default(),
    }
}

/// First visible row so the cursor row stays centred
fn first_visible(cursor: usize, rows: usize, visible: usize) -> usize {
    if rows <= visible {
        return 0;
    }
    cursor.saturating_sub(visible / 2).min(rows - visible)
}

/// Pattern grid for the pattern under the cursor
pub struct PatternWidget<'a> {
    project: &'a Project,
    columns: &'a ColumnMap,
    block: Option<Block<'a>>,
}

impl<'a> PatternWidget<'a> {
    /// Create a new pattern widget
    pub fn new(project: &'a Project, columns: &'a ColumnMap) -> Self {
        Self {
            project,
            columns,
            block: None,
        }
    }

    /// Set the block wrapper
    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

impl Widget for PatternWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let area = if let Some(block) = self.block {
            let inner = block.inner(area);
            block.render(area, buf);
            inner
        } else {
            area
        };
        if area.height < 2 || area.width <= GUTTER_WIDTH {
            return;
        }

        let Ok(pattern) = self.project.current_pattern() else {
            buf.set_string(area.x, area.y, "No pattern", Style::default().fg(Color::DarkGray));
            return;
        };

        let cursor_row = self.project.row_idx().get();
        let cursor = self.columns.lookup(self.project.column_idx()).ok();
        let editing = self.project.is_edit();
        let beat = self.project.quantization().max(1) as usize;

        // Scroll horizontally so the cursor column is on screen
        let room = area.width - GUTTER_WIDTH;
        let x_offset = cursor.map(|c| c.end().saturating_sub(room)).unwrap_or(0);
        let grid_x = area.x + GUTTER_WIDTH;

        // Track names
        for (t, span) in self.columns.track_spans().iter().enumerate() {
            if span.start < x_offset || span.start - x_offset >= room {
                continue;
            }
            let x = grid_x + span.start - x_offset;
            let width = span.width.min(room - (span.start - x_offset)) as usize;
            let name = self.project.tracks().get(t).map(|tr| tr.name.as_str()).unwrap_or("");
            let label: String = name.chars().take(width.saturating_sub(1)).collect();
            buf.set_string(x, area.y, label, Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));
        }

        let visible = (area.height - 1) as usize;
        let first = first_visible(cursor_row, pattern.row_count(), visible);

        for (line, row) in (first..pattern.row_count()).take(visible).enumerate() {
            let y = area.y + 1 + line as u16;
            let on_cursor = row == cursor_row;

            let row_style = if on_cursor {
                Style::default().bg(Color::DarkGray)
            } else {
                Style::default()
            };
            let gutter_style = if row % beat == 0 {
                row_style.fg(Color::Yellow)
            } else {
                row_style.fg(Color::Gray)
            };
            if on_cursor {
                buf.set_string(area.x, y, " ".repeat(area.width as usize), row_style);
            }
            buf.set_string(area.x, y, format!("{:03}", row), gutter_style);

            for column in self.columns.columns() {
                if column.display_column < x_offset || column.end() - x_offset > room {
                    continue;
                }
                let x = grid_x + column.display_column - x_offset;
                let selected = on_cursor && cursor == Some(column);
                let style = if selected {
                    let bg = if editing { Color::Red } else { Color::Yellow };
                    Style::default().fg(Color::Black).bg(bg)
                } else if column.kind == FieldKind::Note {
                    row_style.fg(Color::White)
                } else {
                    row_style.fg(Color::Green)
                };
                buf.set_string(x, y, cell_text(pattern, row, column), style);
            }
        }
    }
}
