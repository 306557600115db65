// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Pattern storage: rows of per-track note and effect slots.
//!
//! The number of slots a track has in a pattern depends on which instrument
//! the pattern binds to that track, so two patterns can give the same track
//! a different row shape.

use crate::error::EngineError;
use crate::index::{EffectSlot, InstrumentIdx, NoteSlot, RowIdx, SettingIdx, TrackIdx};
use crate::studio::VoiceLayout;

/// A note in a slot. Key 0 means no note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Note {
    /// MIDI key, 0 = empty
    pub key: u8,
    /// Velocity, 0 = unset
    pub velocity: u8,
}

impl Note {
    /// Empty slot
    pub const EMPTY: Note = Note { key: 0, velocity: 0 };

    /// Create a note
    pub fn new(key: u8, velocity: u8) -> Self {
        Self { key, velocity }
    }

    /// Whether the slot holds no note
    pub fn is_empty(&self) -> bool {
        self.key == 0
    }

    /// Whether playing this slot produces a note-on
    pub fn triggers(&self) -> bool {
        self.key != 0 && self.velocity != 0
    }
}

/// An effect command in a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Effect {
    /// Command (sent as controller number)
    pub command: u8,
    /// Parameter (sent as controller value)
    pub parameter: u8,
}

impl Effect {
    /// Empty slot
    pub const EMPTY: Effect = Effect {
        command: 0,
        parameter: 0,
    };

    /// Create an effect
    pub fn new(command: u8, parameter: u8) -> Self {
        Self { command, parameter }
    }

    /// Whether the slot holds no effect
    pub fn is_empty(&self) -> bool {
        self.command == 0 && self.parameter == 0
    }
}

/// One track's slots within a row
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrackRow {
    /// Note slots
    pub notes: Vec<Note>,
    /// Effect slots
    pub effects: Vec<Effect>,
}

impl TrackRow {
    /// Empty slots for a layout
    pub fn with_layout(layout: VoiceLayout) -> Self {
        Self {
            notes: vec![Note::EMPTY; layout.notes],
            effects: vec![Effect::EMPTY; layout.effects],
        }
    }

    /// Current shape
    pub fn layout(&self) -> VoiceLayout {
        VoiceLayout {
            notes: self.notes.len(),
            effects: self.effects.len(),
        }
    }

    /// Note in a slot
    pub fn note(&self, slot: NoteSlot) -> Result<Note, EngineError> {
        self.notes
            .get(slot.get())
            .copied()
            .ok_or_else(|| EngineError::out_of_range("note slot", slot.get(), self.notes.len()))
    }

    /// Effect in a slot
    pub fn effect(&self, slot: EffectSlot) -> Result<Effect, EngineError> {
        self.effects
            .get(slot.get())
            .copied()
            .ok_or_else(|| EngineError::out_of_range("effect slot", slot.get(), self.effects.len()))
    }

    /// Write a note slot
    pub fn set_note(&mut self, slot: NoteSlot, note: Note) -> Result<(), EngineError> {
        let count = self.notes.len();
        let cell = self
            .notes
            .get_mut(slot.get())
            .ok_or_else(|| EngineError::out_of_range("note slot", slot.get(), count))?;
        *cell = note;
        Ok(())
    }

    /// Write an effect slot
    pub fn set_effect(&mut self, slot: EffectSlot, effect: Effect) -> Result<(), EngineError> {
        let count = self.effects.len();
        let cell = self
            .effects
            .get_mut(slot.get())
            .ok_or_else(|| EngineError::out_of_range("effect slot", slot.get(), count))?;
        *cell = effect;
        Ok(())
    }

    /// Change shape, keeping the slots both shapes share
    pub fn reshape(&mut self, layout: VoiceLayout) {
        self.notes.resize(layout.notes, Note::EMPTY);
        self.effects.resize(layout.effects, Effect::EMPTY);
    }
}

/// One row of a pattern
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    /// One entry per project track
    pub tracks: Vec<TrackRow>,
    /// Tempo offset relative to the pattern
    pub tempo: i8,
}

impl Row {
    /// Empty row for a set of track layouts
    pub fn with_layouts(layouts: &[VoiceLayout]) -> Self {
        Self {
            tracks: layouts.iter().map(|l| TrackRow::with_layout(*l)).collect(),
            tempo: 0,
        }
    }

    /// Slots of one track
    pub fn track(&self, track: TrackIdx) -> Result<&TrackRow, EngineError> {
        self.tracks
            .get(track.get())
            .ok_or_else(|| EngineError::out_of_range("track", track.get(), self.tracks.len()))
    }

    /// Mutable slots of one track
    pub fn track_mut(&mut self, track: TrackIdx) -> Result<&mut TrackRow, EngineError> {
        let count = self.tracks.len();
        self.tracks
            .get_mut(track.get())
            .ok_or_else(|| EngineError::out_of_range("track", track.get(), count))
    }
}

/// Which instrument and setting a pattern uses on a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PatternTrackBinding {
    /// Instrument of the track's device
    pub instrument: InstrumentIdx,
    /// Setting of that instrument
    pub setting: SettingIdx,
}

impl PatternTrackBinding {
    /// Create a binding
    pub fn new(instrument: InstrumentIdx, setting: SettingIdx) -> Self {
        Self {
            instrument,
            setting,
        }
    }
}

/// A grid of rows by tracks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    /// Pattern name
    pub name: String,
    /// Tempo offset relative to the part
    pub tempo: i8,
    pub(crate) rows: Vec<Row>,
    pub(crate) bindings: Vec<PatternTrackBinding>,
}

impl Default for Pattern {
    fn default() -> Self {
        Self {
            name: "Pattern".to_string(),
            tempo: 0,
            rows: Vec::new(),
            bindings: Vec::new(),
        }
    }
}

impl Pattern {
    /// Create a pattern of empty rows.
    ///
    /// `layouts` must hold one entry per binding, as resolved through the
    /// studio for each track's device.
    pub fn new(
        name: impl Into<String>,
        row_count: usize,
        bindings: Vec<PatternTrackBinding>,
        layouts: &[VoiceLayout],
    ) -> Result<Self, EngineError> {
        check_row_count(row_count)?;
        if bindings.len() != layouts.len() {
            return Err(EngineError::out_of_range("track", layouts.len(), bindings.len()));
        }
        Ok(Self {
            name: name.into(),
            tempo: 0,
            rows: vec![Row::with_layouts(layouts); row_count],
            bindings,
        })
    }

    /// Number of rows
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// All rows
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// A row
    pub fn row(&self, row: RowIdx) -> Result<&Row, EngineError> {
        self.rows
            .get(row.get())
            .ok_or_else(|| EngineError::out_of_range("row", row.get(), self.rows.len()))
    }

    /// A mutable row
    pub fn row_mut(&mut self, row: RowIdx) -> Result<&mut Row, EngineError> {
        let count = self.rows.len();
        self.rows
            .get_mut(row.get())
            .ok_or_else(|| EngineError::out_of_range("row", row.get(), count))
    }

    /// Track bindings, one per project track
    pub fn bindings(&self) -> &[PatternTrackBinding] {
        &self.bindings
    }

    /// Binding of one track
    pub fn binding(&self, track: TrackIdx) -> Result<PatternTrackBinding, EngineError> {
        self.bindings
            .get(track.get())
            .copied()
            .ok_or_else(|| EngineError::out_of_range("track", track.get(), self.bindings.len()))
    }

    /// Grow or shrink to `row_count` rows; new rows are empty
    pub fn resize(&mut self, row_count: usize, layouts: &[VoiceLayout]) -> Result<(), EngineError> {
        check_row_count(row_count)?;
        self.rows.resize(row_count, Row::with_layouts(layouts));
        Ok(())
    }

    /// Bind a track to another instrument and reshape its slots
    pub fn rebind(
        &mut self,
        track: TrackIdx,
        binding: PatternTrackBinding,
        layout: VoiceLayout,
    ) -> Result<(), EngineError> {
        let count = self.bindings.len();
        let slot = self
            .bindings
            .get_mut(track.get())
            .ok_or_else(|| EngineError::out_of_range("track", track.get(), count))?;
        *slot = binding;
        for row in &mut self.rows {
            row.track_mut(track)?.reshape(layout);
        }
        Ok(())
    }

    /// Add a column of empty slots for a newly appended track
    pub fn push_track(&mut self, binding: PatternTrackBinding, layout: VoiceLayout) {
        self.bindings.push(binding);
        for row in &mut self.rows {
            row.tracks.push(TrackRow::with_layout(layout));
        }
    }

    /// Check every row against the layouts the bindings resolve to
    pub fn validate(&self, pattern: usize, layouts: &[VoiceLayout]) -> Result<(), EngineError> {
        check_row_count(self.rows.len())?;
        if self.bindings.len() != layouts.len() {
            return Err(EngineError::out_of_range("track", layouts.len(), self.bindings.len()));
        }
        for row in &self.rows {
            if row.tracks.len() != layouts.len() {
                return Err(EngineError::out_of_range("track", layouts.len(), row.tracks.len()));
            }
            for (track, (cells, layout)) in row.tracks.iter().zip(layouts).enumerate() {
                if cells.layout() != *layout {
                    return Err(EngineError::ShapeMismatch {
                        pattern,
                        track,
                        expected_notes: layout.notes,
                        expected_effects: layout.effects,
                        found_notes: cells.notes.len(),
                        found_effects: cells.effects.len(),
                    });
                }
            }
        }
        Ok(())
    }
}

fn check_row_count(row_count: usize) -> Result<(), EngineError> {
    if row_count == 0 {
        Err(EngineError::out_of_range("row", 0, 0))
    } else if row_count > RowIdx::CAPACITY {
        Err(EngineError::CapacityExceeded {
            what: "pattern rows",
            capacity: RowIdx::CAPACITY,
        })
    } else {
        Ok(())
    }
}
