// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Cursor column map.
//!
//! Flattens the current pattern's track layout into a list of cursor stops.
//! Each note slot gives a 3-wide note column and two 1-wide velocity nibble
//! columns; each effect slot gives four 1-wide nibble columns (command high,
//! command low, parameter high, parameter low). A one-column gap follows
//! every slot group.

use crate::error::EngineError;
use crate::index::{ColumnIdx, EffectSlot, NoteSlot, TrackIdx};
use crate::project::Project;
use crate::studio::{Studio, VoiceLayout};

/// Display width of a note name ("C#4")
pub const NOTE_WIDTH: u16 = 3;

/// Blank columns after each slot group
pub const GAP_WIDTH: u16 = 1;

/// What a cursor column edits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Note,
    VelocityHigh,
    VelocityLow,
    CommandHigh,
    CommandLow,
    ParameterHigh,
    ParameterLow,
}

impl FieldKind {
    /// Column belongs to a note slot
    pub fn is_note_field(self) -> bool {
        matches!(
            self,
            FieldKind::Note | FieldKind::VelocityHigh | FieldKind::VelocityLow
        )
    }

    /// Column belongs to an effect slot
    pub fn is_effect_field(self) -> bool {
        !self.is_note_field()
    }

    /// Column edits a single hex digit
    pub fn is_nibble(self) -> bool {
        self != FieldKind::Note
    }
}

/// One cursor stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// First display column
    pub display_column: u16,
    /// Display width
    pub display_width: u16,
    /// Track the column belongs to
    pub track: TrackIdx,
    /// Note slot or effect slot, depending on `kind`
    pub sub: u8,
    /// Field edited at this stop
    pub kind: FieldKind,
}

impl Column {
    /// Note slot addressed, for note fields
    pub fn note_slot(&self) -> Option<NoteSlot> {
        if self.kind.is_note_field() {
            NoteSlot::new(self.sub as usize).ok()
        } else {
            None
        }
    }

    /// Effect slot addressed, for effect fields
    pub fn effect_slot(&self) -> Option<EffectSlot> {
        if self.kind.is_effect_field() {
            EffectSlot::new(self.sub as usize).ok()
        } else {
            None
        }
    }

    /// One past the last display column
    pub fn end(&self) -> u16 {
        self.display_column + self.display_width
    }
}

/// Horizontal extent of a track in the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackSpan {
    /// First display column
    pub start: u16,
    /// Width including trailing gaps
    pub width: u16,
}

/// Flat table of cursor columns for one pattern
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColumnMap {
    columns: Vec<Column>,
    tracks: Vec<TrackSpan>,
    width: u16,
}

impl ColumnMap {
    /// Build the map for the pattern under the project cursor
    pub fn build(project: &Project, studio: &Studio) -> Result<Self, EngineError> {
        let pattern = project.position()?.pattern;
        let layouts = project.pattern_layouts(studio, pattern)?;
        Self::from_layouts(&layouts)
    }

    /// Build the map from one layout per track
    pub fn from_layouts(layouts: &[VoiceLayout]) -> Result<Self, EngineError> {
        let mut map = ColumnMap::default();
        let mut x: u16 = 0;

        for (t, layout) in layouts.iter().enumerate() {
            let track = TrackIdx::new(t)?;
            let start = x;
            for n in 0..layout.notes {
                let sub = NoteSlot::new(n)?.get() as u8;
                map.push(Column {
                    display_column: x,
                    display_width: NOTE_WIDTH,
                    track,
                    sub,
                    kind: FieldKind::Note,
                })?;
                x += NOTE_WIDTH;
                for kind in [FieldKind::VelocityHigh, FieldKind::VelocityLow] {
                    map.push(Column {
                        display_column: x,
                        display_width: 1,
                        track,
                        sub,
                        kind,
                    })?;
                    x += 1;
                }
                x += GAP_WIDTH;
            }
            for e in 0..layout.effects {
                let sub = EffectSlot::new(e)?.get() as u8;
                for kind in [
                    FieldKind::CommandHigh,
                    FieldKind::CommandLow,
                    FieldKind::ParameterHigh,
                    FieldKind::ParameterLow,
                ] {
                    map.push(Column {
                        display_column: x,
                        display_width: 1,
                        track,
                        sub,
                        kind,
                    })?;
                    x += 1;
                }
                x += GAP_WIDTH;
            }
            map.tracks.push(TrackSpan {
                start,
                width: x - start,
            });
        }

        map.width = x;
        Ok(map)
    }

    fn push(&mut self, column: Column) -> Result<(), EngineError> {
        if self.columns.len() >= ColumnIdx::CAPACITY {
            return Err(EngineError::CapacityExceeded {
                what: "column map",
                capacity: ColumnIdx::CAPACITY,
            });
        }
        self.columns.push(column);
        Ok(())
    }

    /// Number of cursor columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column at a flat cursor index
    pub fn lookup(&self, column: ColumnIdx) -> Result<&Column, EngineError> {
        self.columns
            .get(column.get())
            .ok_or_else(|| EngineError::out_of_range("column", column.get(), self.columns.len()))
    }

    /// All columns in cursor order
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Extent of each track
    pub fn track_spans(&self) -> &[TrackSpan] {
        &self.tracks
    }

    /// Total display width, gaps included
    pub fn display_width(&self) -> u16 {
        self.width
    }

    /// Display width covered by columns, gaps excluded
    pub fn content_width(&self) -> u16 {
        self.columns.iter().map(|c| c.display_width).sum()
    }

    /// First cursor column of a track
    pub fn first_column_of(&self, track: TrackIdx) -> Option<ColumnIdx> {
        self.columns
            .iter()
            .position(|c| c.track == track)
            .and_then(|i| ColumnIdx::new(i).ok())
    }
}
