// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Playback tick.
//!
//! Each step moves the cursor one row. When a pattern ends, the cursor
//! cascades upward through part, song and project as far as the play mode
//! allows, and every cursor below the one that moved restarts at its first
//! entry. The row the cursor lands on is sent in the same commit, so output
//! for a row is queued as the row becomes current.

use tracing::{debug, info};

use crate::error::EngineError;
use crate::index::{PartPatternIdx, PatternIdx, RowIdx, SongIdx, SongPartIdx, TrackIdx};
use crate::project::{PlayMode, Position, Project};

use super::update::{InstrumentEvent, Update};
use super::{Context, Facet, StepSequencer};

impl StepSequencer {
    /// Change playback mode.
    ///
    /// Every sounding key is released first. Starting playback resets the
    /// cursors the mode plays through and sends the first row.
    pub fn set_mode(&mut self, mode: PlayMode, ctx: &mut Context<'_>) -> Result<Vec<Facet>, EngineError> {
        let mut update = Update::new();
        stage_release(&mut update, ctx.project)?;
        update.set_mode(mode)?;

        if mode.is_playing() {
            let start = start_position(ctx.project, mode)?;
            stage_position(&mut update, ctx.project, &start)?;
            stage_row(&mut update, ctx.project, start.pattern, start.row, false)?;
            info!(
                "playback {} from song {} part {} pattern {}",
                mode.label(),
                start.song,
                start.part,
                start.pattern
            );
        } else {
            info!("playback stopped");
        }

        self.commit(update, ctx)
    }

    /// Advance playback by one row
    pub fn step(&mut self, ctx: &mut Context<'_>) -> Result<Vec<Facet>, EngineError> {
        if !ctx.project.mode().is_playing() {
            return Err(EngineError::StepWhileStopped);
        }

        let next = next_position(ctx.project)?;
        let mut update = Update::new();
        stage_row(&mut update, ctx.project, next.pattern, next.row, true)?;
        stage_position(&mut update, ctx.project, &next)?;
        self.commit(update, ctx)
    }
}

/// Cursor where a mode starts playing
pub(crate) fn start_position(project: &Project, mode: PlayMode) -> Result<Position, EngineError> {
    let song = if mode.advances_song() {
        SongIdx::ZERO.check(project.songs().len())?
    } else {
        project.song_idx()
    };
    let song_ref = project.song(song)?;
    let song_part = if mode.advances_song_part() {
        SongPartIdx::ZERO.check(song_ref.len())?
    } else {
        song_ref.cursor()
    };
    let part = song_ref.part_at(song_part)?;
    let part_ref = project.part(part)?;
    let part_pattern = if mode.advances_part_pattern() {
        PartPatternIdx::ZERO.check(part_ref.len())?
    } else {
        part_ref.cursor()
    };
    let pattern = part_ref.pattern_at(part_pattern)?;

    Ok(Position {
        song,
        song_part,
        part,
        part_pattern,
        pattern,
        row: RowIdx::ZERO,
    })
}

/// Cursor one row after the current one under the current mode
pub(crate) fn next_position(project: &Project) -> Result<Position, EngineError> {
    let pos = project.position()?;
    let mode = project.mode();
    let rows = project.pattern(pos.pattern)?.row_count();

    if !pos.row.is_last(rows) {
        return Ok(Position {
            row: pos.row.wrapping_next(rows),
            ..pos
        });
    }

    let mut next = Position {
        row: RowIdx::ZERO,
        ..pos
    };
    if !mode.advances_part_pattern() {
        return Ok(next);
    }

    let part_len = project.part(pos.part)?.len();
    if !pos.part_pattern.is_last(part_len) || !mode.advances_song_part() {
        next.part_pattern = pos.part_pattern.wrapping_next(part_len);
    } else {
        let song_len = project.song(pos.song)?.len();
        if !pos.song_part.is_last(song_len) || !mode.advances_song() {
            next.song_part = pos.song_part.wrapping_next(song_len);
        } else {
            next.song = pos.song.wrapping_next(project.songs().len());
            next.song_part = SongPartIdx::ZERO;
            debug!("song {} -> {}", pos.song, next.song);
        }
        next.part = project.song(next.song)?.part_at(next.song_part)?;
        next.part_pattern = PartPatternIdx::ZERO;
    }
    next.pattern = project.part(next.part)?.pattern_at(next.part_pattern)?;
    debug!(
        "pattern end: part {} entry {} -> part {} entry {}",
        pos.part, pos.part_pattern, next.part, next.part_pattern
    );
    Ok(next)
}

/// Stage the cursor fields that differ from the project, and always the row
pub(crate) fn stage_position(
    update: &mut Update,
    project: &Project,
    next: &Position,
) -> Result<(), EngineError> {
    if next.song != project.song_idx() {
        update.set_song(next.song)?;
    }
    if next.song_part != project.song(next.song)?.cursor() {
        update.set_song_part(next.song, next.song_part)?;
    }
    if next.part_pattern != project.part(next.part)?.cursor() {
        update.set_part_pattern(next.part, next.part_pattern)?;
    }
    update.set_row(next.row)
}

/// Note-off for every sounding key on every track
pub(crate) fn stage_release(update: &mut Update, project: &Project) -> Result<(), EngineError> {
    for (t, track) in project.tracks().iter().enumerate() {
        let track_idx = TrackIdx::new(t)?;
        for (slot, key) in track.sounding_slots() {
            update.send(InstrumentEvent::note_off(track_idx, slot, key))?;
        }
    }
    Ok(())
}

/// Output for one row: controllers, then (optionally) note-offs for what
/// is sounding, then note-ons.
pub(crate) fn stage_row(
    update: &mut Update,
    project: &Project,
    pattern: PatternIdx,
    row: RowIdx,
    release: bool,
) -> Result<(), EngineError> {
    let row_ref = project.pattern(pattern)?.row(row)?;
    for (t, track) in project.tracks().iter().enumerate() {
        let track_idx = TrackIdx::new(t)?;
        let cells = row_ref.track(track_idx)?;

        for effect in cells.effects.iter().filter(|e| e.command != 0) {
            update.send(InstrumentEvent::control(track_idx, *effect))?;
        }
        if release {
            for (slot, key) in track.sounding_slots() {
                update.send(InstrumentEvent::note_off(track_idx, slot, key))?;
            }
        }
        for (slot, note) in crate::index::NoteSlot::range(cells.notes.len()).zip(&cells.notes) {
            if note.triggers() {
                update.send(InstrumentEvent::note_on(track_idx, slot, *note))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrangement::{Part, Song};
    use crate::index::{DeviceIdx, NoteSlot, PartIdx};
    use crate::midi::{messages, MemoryTransport};
    use crate::project::{Effect, Note, PatternTrackBinding};
    use crate::sequencer::NullRenderer;
    use crate::studio::Studio;

    fn run_mode(
        seq: &mut StepSequencer,
        project: &mut Project,
        studio: &Studio,
        transport: &mut MemoryTransport,
        mode: PlayMode,
    ) {
        let mut renderer = NullRenderer;
        let mut ctx = Context::new(project, studio, transport, &mut renderer);
        seq.set_mode(mode, &mut ctx).unwrap();
    }

    fn step(
        seq: &mut StepSequencer,
        project: &mut Project,
        studio: &Studio,
        transport: &mut MemoryTransport,
    ) -> Vec<Facet> {
        let mut renderer = NullRenderer;
        let mut ctx = Context::new(project, studio, transport, &mut renderer);
        seq.step(&mut ctx).unwrap()
    }

    /// Two patterns in one part, a second part in the song
    fn two_level_project(studio: &Studio) -> Project {
        let mut project = Project::with_rows(studio, 2).unwrap();
        let b = project
            .add_pattern(studio, "B", 3, vec![PatternTrackBinding::default()])
            .unwrap();
        project.parts[0].push_pattern(b).unwrap();
        let second = project
            .add_part(Part::new("Chorus").with_pattern(b).unwrap())
            .unwrap();
        project.songs[0].push_part(second).unwrap();
        project
    }

    #[test]
    fn test_step_while_stopped_fails() {
        let studio = Studio::default();
        let mut project = Project::with_rows(&studio, 4).unwrap();
        let mut seq = StepSequencer::new(&project, &studio).unwrap();
        let mut transport = MemoryTransport::default();
        let mut renderer = NullRenderer;
        let mut ctx = Context::new(&mut project, &studio, &mut transport, &mut renderer);
        assert_eq!(seq.step(&mut ctx), Err(EngineError::StepWhileStopped));
    }

    #[test]
    fn test_pattern_loops() {
        let studio = Studio::default();
        let mut project = Project::with_rows(&studio, 5).unwrap();
        let mut seq = StepSequencer::new(&project, &studio).unwrap();
        let mut transport = MemoryTransport::default();
        run_mode(&mut seq, &mut project, &studio, &mut transport, PlayMode::PlayPattern);

        for expected in [1, 2, 3, 4, 0] {
            step(&mut seq, &mut project, &studio, &mut transport);
            assert_eq!(project.row_idx().get(), expected);
        }
    }

    #[test]
    fn test_play_part_moves_through_patterns() {
        let studio = Studio::default();
        let mut project = two_level_project(&studio);
        let mut seq = StepSequencer::new(&project, &studio).unwrap();
        let mut transport = MemoryTransport::default();
        run_mode(&mut seq, &mut project, &studio, &mut transport, PlayMode::PlayPart);

        // Pattern A has 2 rows
        step(&mut seq, &mut project, &studio, &mut transport);
        let facets = step(&mut seq, &mut project, &studio, &mut transport);
        assert!(facets.contains(&Facet::PartPattern));
        assert_eq!(project.parts()[0].cursor().get(), 1);
        assert_eq!(project.row_idx(), RowIdx::ZERO);
        assert_eq!(seq.columns().len(), 10);

        // Pattern B has 3 rows, then the part wraps and the song stays put
        for _ in 0..3 {
            step(&mut seq, &mut project, &studio, &mut transport);
        }
        assert_eq!(project.parts()[0].cursor(), PartPatternIdx::ZERO);
        assert_eq!(project.songs()[0].cursor(), SongPartIdx::ZERO);
    }

    #[test]
    fn test_play_song_moves_through_parts() {
        let studio = Studio::default();
        let mut project = two_level_project(&studio);
        let mut seq = StepSequencer::new(&project, &studio).unwrap();
        let mut transport = MemoryTransport::default();
        run_mode(&mut seq, &mut project, &studio, &mut transport, PlayMode::PlaySong);

        // Part 0 is 2 + 3 rows
        for _ in 0..5 {
            step(&mut seq, &mut project, &studio, &mut transport);
        }
        let pos = project.position().unwrap();
        assert_eq!(pos.song_part.get(), 1);
        assert_eq!(pos.part, PartIdx::new(1).unwrap());
        assert_eq!(pos.part_pattern, PartPatternIdx::ZERO);

        // Part 1 is 3 rows, then the song wraps
        for _ in 0..3 {
            step(&mut seq, &mut project, &studio, &mut transport);
        }
        let pos = project.position().unwrap();
        assert_eq!(pos.song_part, SongPartIdx::ZERO);
        assert_eq!(pos.part_pattern, PartPatternIdx::ZERO);
        assert_eq!(pos.row, RowIdx::ZERO);
    }

    #[test]
    fn test_play_project_moves_through_songs() {
        let studio = Studio::default();
        let mut project = Project::with_rows(&studio, 2).unwrap();
        let second = project
            .add_song(Song::new("Encore").with_part(PartIdx::ZERO).unwrap())
            .unwrap();
        let mut seq = StepSequencer::new(&project, &studio).unwrap();
        let mut transport = MemoryTransport::default();
        run_mode(&mut seq, &mut project, &studio, &mut transport, PlayMode::PlayProject);

        step(&mut seq, &mut project, &studio, &mut transport);
        let facets = step(&mut seq, &mut project, &studio, &mut transport);
        assert!(facets.contains(&Facet::Song));
        assert_eq!(project.song_idx(), second);

        step(&mut seq, &mut project, &studio, &mut transport);
        step(&mut seq, &mut project, &studio, &mut transport);
        assert_eq!(project.song_idx(), SongIdx::ZERO);
    }

    #[test]
    fn test_set_mode_resets_cursors() {
        let studio = Studio::default();
        let mut project = two_level_project(&studio);
        project.songs[0].set_cursor(SongPartIdx::new(1).unwrap()).unwrap();
        project.parts[0].set_cursor(PartPatternIdx::new(1).unwrap()).unwrap();
        let mut seq = StepSequencer::new(&project, &studio).unwrap();
        let mut transport = MemoryTransport::default();

        // PlayPart restarts the current part only
        run_mode(&mut seq, &mut project, &studio, &mut transport, PlayMode::PlayPart);
        assert_eq!(project.songs()[0].cursor().get(), 1);

        run_mode(&mut seq, &mut project, &studio, &mut transport, PlayMode::PlaySong);
        assert_eq!(project.songs()[0].cursor(), SongPartIdx::ZERO);
        assert_eq!(project.parts()[0].cursor(), PartPatternIdx::ZERO);
        assert_eq!(project.row_idx(), RowIdx::ZERO);
    }

    #[test]
    fn test_look_ahead_sends_row_being_entered() {
        let studio = Studio::default();
        let mut project = Project::with_rows(&studio, 4).unwrap();
        project.patterns[0].rows[0].tracks[0].notes[0] = Note::new(13, 100);
        project.patterns[0].rows[1].tracks[0].notes[1] = Note::new(20, 90);
        project.patterns[0].rows[1].tracks[0].effects[0] = Effect::new(7, 64);
        let mut seq = StepSequencer::new(&project, &studio).unwrap();
        let mut transport = MemoryTransport::default();

        run_mode(&mut seq, &mut project, &studio, &mut transport, PlayMode::PlayPattern);
        assert_eq!(transport.sent.len(), 1);
        assert_eq!(transport.sent[0].1, vec![messages::NOTE_ON, 13, 100]);
        assert_eq!(project.tracks()[0].sounding(NoteSlot::ZERO), 13);

        transport.clear();
        step(&mut seq, &mut project, &studio, &mut transport);
        let sent: Vec<Vec<u8>> = transport.sent.iter().map(|(_, m)| m.clone()).collect();
        assert_eq!(
            sent,
            vec![
                vec![messages::CONTROL_CHANGE, 7, 64],
                vec![messages::NOTE_OFF, 13, 0],
                vec![messages::NOTE_ON, 20, 90],
            ]
        );
        assert_eq!(project.tracks()[0].sounding(NoteSlot::ZERO), 0);
        assert_eq!(project.tracks()[0].sounding(NoteSlot::new(1).unwrap()), 20);
    }

    #[test]
    fn test_note_without_velocity_does_not_trigger() {
        let studio = Studio::default();
        let mut project = Project::with_rows(&studio, 2).unwrap();
        project.patterns[0].rows[1].tracks[0].notes[0] = Note::new(60, 0);
        let mut seq = StepSequencer::new(&project, &studio).unwrap();
        let mut transport = MemoryTransport::default();
        run_mode(&mut seq, &mut project, &studio, &mut transport, PlayMode::PlayPattern);
        step(&mut seq, &mut project, &studio, &mut transport);
        assert!(transport.sent.is_empty());
    }

    #[test]
    fn test_stop_silences_sounding_keys() {
        let studio = Studio::default();
        let mut project = Project::with_rows(&studio, 4).unwrap();
        project.patterns[0].rows[0].tracks[0].notes[0] = Note::new(40, 100);
        project.patterns[0].rows[0].tracks[0].notes[1] = Note::new(44, 100);
        let mut seq = StepSequencer::new(&project, &studio).unwrap();
        let mut transport = MemoryTransport::default();
        run_mode(&mut seq, &mut project, &studio, &mut transport, PlayMode::PlayPattern);

        transport.clear();
        run_mode(&mut seq, &mut project, &studio, &mut transport, PlayMode::Stopped);
        assert_eq!(transport.of_kind(messages::NOTE_OFF).count(), 2);
        assert!(!project.tracks()[0].is_sounding());
        assert_eq!(project.mode(), PlayMode::Stopped);
    }

    #[test]
    fn test_step_fits_widest_project() {
        use crate::index::{MAX_PARAMETERS, MAX_POLYPHONY};
        use crate::project::Track;
        use crate::sequencer::update::MAX_STAGED_EVENTS;
        use crate::studio::{Device, Instrument};

        let studio = Studio::new("Wide").with_device(
            Device::new("Wide", 0).with_instrument(Instrument::new(
                "Full",
                MAX_POLYPHONY as u8,
                MAX_PARAMETERS as u8,
            )),
        );
        let mut project = Project::with_rows(&studio, 2).unwrap();
        for t in 1..TrackIdx::CAPACITY {
            project
                .add_track(&studio, Track::new(format!("Track {}", t + 1), DeviceIdx::ZERO))
                .unwrap();
        }
        for row in project.patterns[0].rows.iter_mut() {
            for cells in row.tracks.iter_mut() {
                for (i, note) in cells.notes.iter_mut().enumerate() {
                    *note = Note::new(36 + i as u8, 100);
                }
                for effect in cells.effects.iter_mut() {
                    *effect = Effect::new(1, 64);
                }
            }
        }
        project.validate(&studio).unwrap();

        let mut seq = StepSequencer::new(&project, &studio).unwrap();
        let mut transport = MemoryTransport::default();
        run_mode(&mut seq, &mut project, &studio, &mut transport, PlayMode::PlayPattern);

        transport.clear();
        step(&mut seq, &mut project, &studio, &mut transport);
        let per_kind = TrackIdx::CAPACITY * MAX_POLYPHONY;
        assert_eq!(
            transport.of_kind(messages::CONTROL_CHANGE).count(),
            TrackIdx::CAPACITY * MAX_PARAMETERS
        );
        assert_eq!(transport.of_kind(messages::NOTE_OFF).count(), per_kind);
        assert_eq!(transport.of_kind(messages::NOTE_ON).count(), per_kind);
        assert_eq!(transport.sent.len(), MAX_STAGED_EVENTS);
        assert_eq!(project.row_idx().get(), 1);
    }
}
