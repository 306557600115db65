// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Edit tick and editor operations.
//!
//! All of these work on the cell under the cursor and go through the
//! update buffer like playback does. While stopped, writing a cell moves
//! the cursor down one row.

use tracing::debug;

use crate::error::EngineError;
use crate::index::{ColumnIdx, PartPatternIdx, RowIdx, SongIdx, SongPartIdx, TrackIdx};
use crate::project::{Effect, Note, PatternTrackBinding, Position, Project};

use super::columns::{Column, FieldKind};
use super::events::{EventQueue, InputEvent, Route};
use super::update::{CellWrite, InstrumentEvent, OutputMessage, Target, Update};
use super::{Context, Facet, StepSequencer};

/// Largest value a velocity, command or parameter field holds
const FIELD_MAX: u8 = 127;

impl StepSequencer {
    /// Drain the input queue: forward to the output when thru is on, and
    /// record notes and controllers under the cursor when editing.
    /// The queue is empty afterwards.
    pub fn edit_tick(
        &mut self,
        ctx: &mut Context<'_>,
        queue: &mut EventQueue,
    ) -> Result<Vec<Facet>, EngineError> {
        let mut update = Update::new();
        let column = *self.current_column(ctx.project)?;
        let pos = ctx.project.position()?;
        let editing = ctx.project.is_edit();
        let mut wrote = false;

        for event in queue.iter() {
            if self.options.thru {
                update.send(thru_event(ctx.project, column.track, event)?)?;
            }
            if !editing {
                continue;
            }
            match *event {
                InputEvent::NoteOn { key, velocity, .. } => {
                    if let Some(slot) = column.note_slot() {
                        update.write_cell(CellWrite::Note {
                            pattern: pos.pattern,
                            row: pos.row,
                            track: column.track,
                            slot,
                            note: Note::new(key, velocity),
                        })?;
                        wrote = true;
                    }
                }
                InputEvent::Controller {
                    parameter, value, ..
                } => {
                    if let Some(slot) = column.effect_slot() {
                        update.write_cell(CellWrite::Effect {
                            pattern: pos.pattern,
                            row: pos.row,
                            track: column.track,
                            slot,
                            effect: Effect::new(parameter, value),
                        })?;
                        wrote = true;
                    }
                }
                InputEvent::NoteOff { .. } => {}
            }
        }
        queue.clear();

        if wrote {
            stage_auto_advance(&mut update, ctx.project, &pos)?;
        }
        self.commit(update, ctx)
    }

    /// Move the cursor, wrapping at the pattern edges. Rows only move while
    /// stopped; during playback the row belongs to the clock.
    pub fn move_cursor(
        &mut self,
        rows: i32,
        columns: i32,
        ctx: &mut Context<'_>,
    ) -> Result<Vec<Facet>, EngineError> {
        let mut update = Update::new();

        if columns != 0 && !self.columns.is_empty() {
            let count = self.columns.len();
            let next = wrap(ctx.project.column_idx().get(), columns, count);
            update.set_column(ColumnIdx::within(next, count)?)?;
        }
        if rows != 0 && !ctx.project.mode().is_playing() {
            let count = ctx.project.current_pattern()?.row_count();
            let next = wrap(ctx.project.row_idx().get(), rows, count);
            update.set_row(RowIdx::within(next, count)?)?;
        }
        self.commit(update, ctx)
    }

    /// Jump the column cursor to the first column of the next or previous track
    pub fn move_track(&mut self, delta: i32, ctx: &mut Context<'_>) -> Result<Vec<Facet>, EngineError> {
        let tracks = ctx.project.tracks().len();
        let current = self.current_column(ctx.project)?.track;
        let target = TrackIdx::within(wrap(current.get(), delta, tracks), tracks)?;
        let mut update = Update::new();
        if let Some(column) = self.columns.first_column_of(target) {
            update.set_column(column)?;
        }
        self.commit(update, ctx)
    }

    /// Flip edit mode
    pub fn toggle_edit(&mut self, ctx: &mut Context<'_>) -> Result<Vec<Facet>, EngineError> {
        let mut update = Update::new();
        update.set_edit(!ctx.project.is_edit())?;
        self.commit(update, ctx)
    }

    /// Write a hex digit into the nibble under the cursor. Does nothing on
    /// a note column or when edit mode is off.
    pub fn enter_digit(&mut self, digit: u8, ctx: &mut Context<'_>) -> Result<Vec<Facet>, EngineError> {
        let mut update = Update::new();
        let column = *self.current_column(ctx.project)?;
        if ctx.project.is_edit() && column.kind.is_nibble() {
            let pos = ctx.project.position()?;
            let write = digit_write(ctx.project, &pos, &column, digit & 0x0F)?;
            update.write_cell(write)?;
            stage_auto_advance(&mut update, ctx.project, &pos)?;
        }
        self.commit(update, ctx)
    }

    /// Empty the note or effect slot under the cursor
    pub fn clear_cell(&mut self, ctx: &mut Context<'_>) -> Result<Vec<Facet>, EngineError> {
        let mut update = Update::new();
        let column = *self.current_column(ctx.project)?;
        if ctx.project.is_edit() {
            let pos = ctx.project.position()?;
            let write = if let Some(slot) = column.note_slot() {
                CellWrite::Note {
                    pattern: pos.pattern,
                    row: pos.row,
                    track: column.track,
                    slot,
                    note: Note::EMPTY,
                }
            } else if let Some(slot) = column.effect_slot() {
                CellWrite::Effect {
                    pattern: pos.pattern,
                    row: pos.row,
                    track: column.track,
                    slot,
                    effect: Effect::EMPTY,
                }
            } else {
                return self.commit(update, ctx);
            };
            update.write_cell(write)?;
            stage_auto_advance(&mut update, ctx.project, &pos)?;
        }
        self.commit(update, ctx)
    }

    /// Select another song, wrapping
    pub fn select_song(&mut self, delta: i32, ctx: &mut Context<'_>) -> Result<Vec<Facet>, EngineError> {
        let count = ctx.project.songs().len();
        let next = SongIdx::within(wrap(ctx.project.song_idx().get(), delta, count), count)?;
        let mut update = Update::new();
        if next != ctx.project.song_idx() {
            update.set_song(next)?;
        }
        self.commit(update, ctx)
    }

    /// Select another entry of the current song's part list, wrapping
    pub fn select_part_in_song(&mut self, delta: i32, ctx: &mut Context<'_>) -> Result<Vec<Facet>, EngineError> {
        let song_idx = ctx.project.song_idx();
        let song = ctx.project.song(song_idx)?;
        let count = song.len();
        let next = SongPartIdx::within(wrap(song.cursor().get(), delta, count), count)?;
        let mut update = Update::new();
        if next != song.cursor() {
            update.set_song_part(song_idx, next)?;
        }
        self.commit(update, ctx)
    }

    /// Select another entry of the current part's pattern list, wrapping
    pub fn select_pattern_in_part(
        &mut self,
        delta: i32,
        ctx: &mut Context<'_>,
    ) -> Result<Vec<Facet>, EngineError> {
        let pos = ctx.project.position()?;
        let part = ctx.project.part(pos.part)?;
        let count = part.len();
        let next = PartPatternIdx::within(wrap(pos.part_pattern.get(), delta, count), count)?;
        let mut update = Update::new();
        if next != pos.part_pattern {
            update.set_part_pattern(pos.part, next)?;
        }
        self.commit(update, ctx)
    }

    /// Resize the current pattern
    pub fn set_pattern_rows(&mut self, rows: usize, ctx: &mut Context<'_>) -> Result<Vec<Facet>, EngineError> {
        let mut update = Update::new();
        update.set_pattern_rows(ctx.project.position()?.pattern, rows)?;
        self.commit(update, ctx)
    }

    /// Bind a track of the current pattern to another instrument/setting
    pub fn set_binding(
        &mut self,
        track: TrackIdx,
        binding: PatternTrackBinding,
        ctx: &mut Context<'_>,
    ) -> Result<Vec<Facet>, EngineError> {
        let mut update = Update::new();
        update.set_binding(ctx.project.position()?.pattern, track, binding)?;
        self.commit(update, ctx)
    }

    /// Set rows per beat
    pub fn set_quantization(&mut self, quantization: u8, ctx: &mut Context<'_>) -> Result<Vec<Facet>, EngineError> {
        let mut update = Update::new();
        update.set_quantization(quantization)?;
        self.commit(update, ctx)
    }

    /// Set the base tempo
    pub fn set_tempo(&mut self, tempo: u16, ctx: &mut Context<'_>) -> Result<Vec<Facet>, EngineError> {
        let mut update = Update::new();
        update.set_tempo(tempo)?;
        self.commit(update, ctx)
    }
}

/// `(value + delta) mod count`, always non-negative
fn wrap(value: usize, delta: i32, count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    (value as i64 + delta as i64).rem_euclid(count as i64) as usize
}

/// Move the row down one, wrapping, when stopped
fn stage_auto_advance(update: &mut Update, project: &Project, pos: &Position) -> Result<(), EngineError> {
    if project.mode().is_playing() {
        return Ok(());
    }
    let rows = project.pattern(pos.pattern)?.row_count();
    update.set_row(pos.row.wrapping_next(rows))
}

/// Output event echoing an input event
fn thru_event(
    project: &Project,
    cursor_track: TrackIdx,
    event: &InputEvent,
) -> Result<InstrumentEvent, EngineError> {
    let device = match event.output() {
        Route::Broadcast => project.track(cursor_track)?.device,
        Route::Device(device) => device,
    };
    let message = match *event {
        InputEvent::NoteOn { key, velocity, .. } => OutputMessage::NoteOn { key, velocity },
        InputEvent::NoteOff { key, velocity, .. } => OutputMessage::NoteOff { key, velocity },
        InputEvent::Controller {
            parameter, value, ..
        } => OutputMessage::Control { parameter, value },
    };
    Ok(InstrumentEvent {
        target: Target::Device(device),
        message,
    })
}

fn set_high(value: u8, digit: u8) -> u8 {
    ((digit << 4) | (value & 0x0F)).min(FIELD_MAX)
}

fn set_low(value: u8, digit: u8) -> u8 {
    ((value & 0xF0) | digit).min(FIELD_MAX)
}

/// Cell write for a hex digit typed on a nibble column
fn digit_write(
    project: &Project,
    pos: &Position,
    column: &Column,
    digit: u8,
) -> Result<CellWrite, EngineError> {
    let cells = project
        .pattern(pos.pattern)?
        .row(pos.row)?
        .track(column.track)?;

    if let Some(slot) = column.note_slot() {
        let mut note = cells.note(slot)?;
        note.velocity = match column.kind {
            FieldKind::VelocityHigh => set_high(note.velocity, digit),
            _ => set_low(note.velocity, digit),
        };
        debug!("velocity {} on track {} slot {}", note.velocity, column.track, slot);
        return Ok(CellWrite::Note {
            pattern: pos.pattern,
            row: pos.row,
            track: column.track,
            slot,
            note,
        });
    }

    let slot = column
        .effect_slot()
        .ok_or_else(|| EngineError::out_of_range("effect slot", column.sub as usize, 0))?;
    let mut effect = cells.effect(slot)?;
    match column.kind {
        FieldKind::CommandHigh => effect.command = set_high(effect.command, digit),
        FieldKind::CommandLow => effect.command = set_low(effect.command, digit),
        FieldKind::ParameterHigh => effect.parameter = set_high(effect.parameter, digit),
        _ => effect.parameter = set_low(effect.parameter, digit),
    }
    Ok(CellWrite::Effect {
        pattern: pos.pattern,
        row: pos.row,
        track: column.track,
        slot,
        effect,
    })
}
