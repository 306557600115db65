// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Deferred update buffer.
//!
//! Everything a tick wants to change is staged into an [`Update`] first and
//! applied by a single [`Update::commit`]. Scalar fields can be staged once
//! per tick; staging one twice is an error. Output events and cell writes
//! are appended and applied in arrival order, so a later write to the same
//! cell wins.
//!
//! Commit order:
//! 1. one-shot fields, coarse to fine (mode, edit, tempo, quantization,
//!    song, song part, part pattern, pattern rows, binding, row, column)
//! 2. cell writes
//! 3. output events, sent to the transport
//!
//! After applying, the renderer is told once per written field, plus once
//! for [`Facet::Cell`] when any cell changed.

use tracing::{debug, warn};

use crate::error::EngineError;
use crate::index::{
    ColumnIdx, DeviceIdx, EffectSlot, NoteSlot, PartIdx, PartPatternIdx, PatternIdx, RowIdx,
    SongIdx, SongPartIdx, TrackIdx, MAX_PARAMETERS, MAX_POLYPHONY,
};
use crate::midi::Transport;
use crate::project::{Effect, Note, PatternTrackBinding, PlayMode, Project};
use crate::studio::Studio;

use super::columns::ColumnMap;

/// Upper bound on output events staged in one tick: per track, a
/// controller for every effect slot plus a note-off and a note-on for
/// every note slot.
pub const MAX_STAGED_EVENTS: usize = TrackIdx::CAPACITY * (MAX_PARAMETERS + 2 * MAX_POLYPHONY);

/// Upper bound on cell writes staged in one tick
pub const MAX_STAGED_CELLS: usize = 256;

/// A piece of project state the renderer can repaint independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Facet {
    Edit,
    Mode,
    Tempo,
    Quantization,
    Song,
    SongPart,
    PartPattern,
    PatternRows,
    Binding,
    Row,
    Column,
    Cell,
}

impl Facet {
    /// Whether a change to this facet can alter the column layout
    pub fn affects_columns(self) -> bool {
        matches!(
            self,
            Facet::Song | Facet::SongPart | Facet::PartPattern | Facet::Binding
        )
    }
}

/// Receives per-facet change notifications after each commit
pub trait Renderer {
    /// A facet changed in the last commit
    fn facet_changed(&mut self, facet: Facet);
}

impl Renderer for Vec<Facet> {
    fn facet_changed(&mut self, facet: Facet) {
        self.push(facet);
    }
}

/// Renderer that ignores notifications
#[derive(Debug, Clone, Copy, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn facet_changed(&mut self, _facet: Facet) {}
}

/// Message body of an output event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMessage {
    NoteOn { key: u8, velocity: u8 },
    NoteOff { key: u8, velocity: u8 },
    Control { parameter: u8, value: u8 },
}

/// Who an output event is played through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// A track's device. With a slot, the track's sounding key for that
    /// slot follows the event.
    Track {
        track: TrackIdx,
        slot: Option<NoteSlot>,
    },
    /// A device directly
    Device(DeviceIdx),
}

/// An output event staged for the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstrumentEvent {
    /// Destination
    pub target: Target,
    /// Message
    pub message: OutputMessage,
}

impl InstrumentEvent {
    /// Note-on on a track slot
    pub fn note_on(track: TrackIdx, slot: NoteSlot, note: Note) -> Self {
        Self {
            target: Target::Track {
                track,
                slot: Some(slot),
            },
            message: OutputMessage::NoteOn {
                key: note.key,
                velocity: note.velocity,
            },
        }
    }

    /// Note-off on a track slot
    pub fn note_off(track: TrackIdx, slot: NoteSlot, key: u8) -> Self {
        Self {
            target: Target::Track {
                track,
                slot: Some(slot),
            },
            message: OutputMessage::NoteOff { key, velocity: 0 },
        }
    }

    /// Controller change on a track's device
    pub fn control(track: TrackIdx, effect: Effect) -> Self {
        Self {
            target: Target::Track { track, slot: None },
            message: OutputMessage::Control {
                parameter: effect.command,
                value: effect.parameter,
            },
        }
    }
}

/// A staged write into pattern storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellWrite {
    Note {
        pattern: PatternIdx,
        row: RowIdx,
        track: TrackIdx,
        slot: NoteSlot,
        note: Note,
    },
    Effect {
        pattern: PatternIdx,
        row: RowIdx,
        track: TrackIdx,
        slot: EffectSlot,
        effect: Effect,
    },
}

/// Mutations staged during one tick
#[derive(Debug, Clone, Default)]
pub struct Update {
    mode: Option<PlayMode>,
    edit: Option<bool>,
    tempo: Option<u16>,
    quantization: Option<u8>,
    song: Option<SongIdx>,
    song_part: Option<(SongIdx, SongPartIdx)>,
    part_pattern: Option<(PartIdx, PartPatternIdx)>,
    pattern_rows: Option<(PatternIdx, usize)>,
    binding: Option<(PatternIdx, TrackIdx, PatternTrackBinding)>,
    row: Option<RowIdx>,
    column: Option<ColumnIdx>,
    events: Vec<InstrumentEvent>,
    cells: Vec<CellWrite>,
}

fn stage<T>(slot: &mut Option<T>, value: T, facet: Facet) -> Result<(), EngineError> {
    if slot.is_some() {
        return Err(EngineError::FieldWrittenTwice(facet));
    }
    *slot = Some(value);
    Ok(())
}

impl Update {
    /// Start an empty update
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage the playback mode
    pub fn set_mode(&mut self, mode: PlayMode) -> Result<(), EngineError> {
        stage(&mut self.mode, mode, Facet::Mode)
    }

    /// Stage the edit flag
    pub fn set_edit(&mut self, edit: bool) -> Result<(), EngineError> {
        stage(&mut self.edit, edit, Facet::Edit)
    }

    /// Stage the base tempo
    pub fn set_tempo(&mut self, tempo: u16) -> Result<(), EngineError> {
        stage(&mut self.tempo, tempo, Facet::Tempo)
    }

    /// Stage rows per beat
    pub fn set_quantization(&mut self, quantization: u8) -> Result<(), EngineError> {
        stage(&mut self.quantization, quantization, Facet::Quantization)
    }

    /// Stage the song cursor
    pub fn set_song(&mut self, song: SongIdx) -> Result<(), EngineError> {
        stage(&mut self.song, song, Facet::Song)
    }

    /// Stage a song's part cursor
    pub fn set_song_part(&mut self, song: SongIdx, entry: SongPartIdx) -> Result<(), EngineError> {
        stage(&mut self.song_part, (song, entry), Facet::SongPart)
    }

    /// Stage a part's pattern cursor
    pub fn set_part_pattern(&mut self, part: PartIdx, entry: PartPatternIdx) -> Result<(), EngineError> {
        stage(&mut self.part_pattern, (part, entry), Facet::PartPattern)
    }

    /// Stage a pattern resize
    pub fn set_pattern_rows(&mut self, pattern: PatternIdx, rows: usize) -> Result<(), EngineError> {
        stage(&mut self.pattern_rows, (pattern, rows), Facet::PatternRows)
    }

    /// Stage an instrument binding change
    pub fn set_binding(
        &mut self,
        pattern: PatternIdx,
        track: TrackIdx,
        binding: PatternTrackBinding,
    ) -> Result<(), EngineError> {
        stage(&mut self.binding, (pattern, track, binding), Facet::Binding)
    }

    /// Stage the row cursor
    pub fn set_row(&mut self, row: RowIdx) -> Result<(), EngineError> {
        stage(&mut self.row, row, Facet::Row)
    }

    /// Stage the column cursor
    pub fn set_column(&mut self, column: ColumnIdx) -> Result<(), EngineError> {
        stage(&mut self.column, column, Facet::Column)
    }

    /// Queue an output event
    pub fn send(&mut self, event: InstrumentEvent) -> Result<(), EngineError> {
        if self.events.len() >= MAX_STAGED_EVENTS {
            return Err(EngineError::CapacityExceeded {
                what: "staged events",
                capacity: MAX_STAGED_EVENTS,
            });
        }
        self.events.push(event);
        Ok(())
    }

    /// Queue a cell write
    pub fn write_cell(&mut self, write: CellWrite) -> Result<(), EngineError> {
        if self.cells.len() >= MAX_STAGED_CELLS {
            return Err(EngineError::CapacityExceeded {
                what: "staged cells",
                capacity: MAX_STAGED_CELLS,
            });
        }
        self.cells.push(write);
        Ok(())
    }

    /// Row staged so far, if any
    pub fn staged_row(&self) -> Option<RowIdx> {
        self.row
    }

    /// Output events staged so far
    pub fn events(&self) -> &[InstrumentEvent] {
        &self.events
    }

    /// Cell writes staged so far
    pub fn cells(&self) -> &[CellWrite] {
        &self.cells
    }

    /// Whether nothing has been staged
    pub fn is_empty(&self) -> bool {
        self.mode.is_none()
            && self.edit.is_none()
            && self.tempo.is_none()
            && self.quantization.is_none()
            && self.song.is_none()
            && self.song_part.is_none()
            && self.part_pattern.is_none()
            && self.pattern_rows.is_none()
            && self.binding.is_none()
            && self.row.is_none()
            && self.column.is_none()
            && self.events.is_empty()
            && self.cells.is_empty()
    }

    /// Apply everything staged, send output, notify the renderer.
    ///
    /// Returns the facets that changed, in notification order.
    pub fn commit(
        self,
        project: &mut Project,
        studio: &Studio,
        transport: &mut dyn Transport,
        renderer: &mut dyn Renderer,
    ) -> Result<Vec<Facet>, EngineError> {
        let mut facets = Vec::new();
        let mut layout_moved = false;

        if let Some(mode) = self.mode {
            project.set_mode(mode);
            facets.push(Facet::Mode);
        }
        if let Some(edit) = self.edit {
            project.set_edit(edit);
            facets.push(Facet::Edit);
        }
        if let Some(tempo) = self.tempo {
            project.set_tempo(tempo);
            project.mark_changed();
            facets.push(Facet::Tempo);
        }
        if let Some(quantization) = self.quantization {
            project.set_quantization(quantization);
            project.mark_changed();
            facets.push(Facet::Quantization);
        }
        if let Some(song) = self.song {
            project.set_song_cursor(song)?;
            layout_moved = true;
            facets.push(Facet::Song);
        }
        if let Some((song, entry)) = self.song_part {
            project.song_mut(song)?.set_cursor(entry)?;
            layout_moved = true;
            facets.push(Facet::SongPart);
        }
        if let Some((part, entry)) = self.part_pattern {
            project.part_mut(part)?.set_cursor(entry)?;
            layout_moved = true;
            facets.push(Facet::PartPattern);
        }
        if let Some((pattern, rows)) = self.pattern_rows {
            let layouts = project.pattern_layouts(studio, pattern)?;
            project.pattern_mut(pattern)?.resize(rows, &layouts)?;
            project.mark_changed();
            layout_moved = true;
            facets.push(Facet::PatternRows);
        }
        if let Some((pattern, track, binding)) = self.binding {
            let device = project.track(track)?.device;
            let layout = studio.layout(device, binding.instrument)?;
            project.pattern_mut(pattern)?.rebind(track, binding, layout)?;
            project.mark_changed();
            layout_moved = true;
            facets.push(Facet::Binding);
        }
        if let Some(row) = self.row {
            project.set_row_cursor(row)?;
            facets.push(Facet::Row);
        } else if layout_moved {
            project.clamp_row()?;
        }
        if let Some(column) = self.column {
            let map = ColumnMap::build(project, studio)?;
            project.set_column_cursor(column.check(map.len())?);
            facets.push(Facet::Column);
        } else if layout_moved {
            let map = ColumnMap::build(project, studio)?;
            if project.column_idx().get() >= map.len() {
                let last = ColumnIdx::within(map.len().saturating_sub(1), map.len().max(1))?;
                project.set_column_cursor(last);
            }
        }

        for write in &self.cells {
            apply_cell(project, write)?;
        }
        if !self.cells.is_empty() {
            project.mark_changed();
            facets.push(Facet::Cell);
        }

        for event in &self.events {
            apply_event(project, studio, transport, event)?;
        }

        debug!(
            facets = facets.len(),
            cells = self.cells.len(),
            events = self.events.len(),
            "commit"
        );

        for facet in &facets {
            renderer.facet_changed(*facet);
        }
        Ok(facets)
    }
}

fn apply_cell(project: &mut Project, write: &CellWrite) -> Result<(), EngineError> {
    match *write {
        CellWrite::Note {
            pattern,
            row,
            track,
            slot,
            note,
        } => project
            .pattern_mut(pattern)?
            .row_mut(row)?
            .track_mut(track)?
            .set_note(slot, note),
        CellWrite::Effect {
            pattern,
            row,
            track,
            slot,
            effect,
        } => project
            .pattern_mut(pattern)?
            .row_mut(row)?
            .track_mut(track)?
            .set_effect(slot, effect),
    }
}

fn apply_event(
    project: &mut Project,
    studio: &Studio,
    transport: &mut dyn Transport,
    event: &InstrumentEvent,
) -> Result<(), EngineError> {
    let device = match event.target {
        Target::Track { track, slot } => {
            let track_ref = project.track_mut(track)?;
            if let Some(slot) = slot {
                match event.message {
                    OutputMessage::NoteOn { key, .. } => track_ref.set_sounding(slot, key),
                    OutputMessage::NoteOff { key, .. } => {
                        if track_ref.sounding(slot) == key {
                            track_ref.set_sounding(slot, 0);
                        }
                    }
                    OutputMessage::Control { .. } => {}
                }
            }
            track_ref.device
        }
        Target::Device(device) => device,
    };
    let channel = studio.channel(device)?;

    let sent = match event.message {
        OutputMessage::NoteOn { key, velocity } => {
            transport.send_note_on(device, channel, key, velocity)
        }
        OutputMessage::NoteOff { key, velocity } => {
            transport.send_note_off(device, channel, key, velocity)
        }
        OutputMessage::Control { parameter, value } => {
            transport.send_control(device, channel, parameter, value)
        }
    };
    // A dead port must not stop the sequencer
    if let Err(e) = sent {
        warn!("MIDI output to device {} failed: {:#}", device, e);
    }
    Ok(())
}
