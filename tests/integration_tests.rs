// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Integration tests for trak
//!
//! These tests drive the engine through its public API only, the way the
//! front end does: a context per call, a recording transport and a
//! renderer that collects facet notifications.

use std::time::Duration;

use crossterm::event::{KeyCode, KeyModifiers};
use tempfile::tempdir;

use trak::arrangement::{Part, Song};
use trak::control::{ControlAction, KeyContext, KeyboardController};
use trak::error::EngineError;
use trak::index::{DeviceIdx, NoteSlot, PatternIdx, RowIdx, TrackIdx};
use trak::midi::{messages, MemoryTransport};
use trak::persist::{encode, load_project, save_project, PROJECT_PREFIX};
use trak::project::{Effect, Note, PatternTrackBinding, PlayMode, Project, Track};
use trak::sequencer::{
    CellWrite, ColumnMap, Context, EventQueue, Facet, FieldKind, InputEvent, InstrumentEvent,
    SequencerOptions, StepSequencer, Update,
};
use trak::studio::Studio;
use trak::timing::RowClock;

/// Everything one call into the sequencer needs
struct Rig {
    project: Project,
    studio: Studio,
    transport: MemoryTransport,
    facets: Vec<Facet>,
    seq: StepSequencer,
}

impl Rig {
    fn new(project: Project, studio: Studio) -> Self {
        let seq = StepSequencer::new(&project, &studio).unwrap();
        Self {
            project,
            studio,
            transport: MemoryTransport::default(),
            facets: Vec::new(),
            seq,
        }
    }

    fn with_rows(rows: usize) -> Self {
        let studio = Studio::default();
        let project = Project::with_rows(&studio, rows).unwrap();
        Self::new(project, studio)
    }

    fn run<T>(
        &mut self,
        f: impl FnOnce(&mut StepSequencer, &mut Context<'_>) -> Result<T, EngineError>,
    ) -> T {
        let mut ctx = Context::new(
            &mut self.project,
            &self.studio,
            &mut self.transport,
            &mut self.facets,
        );
        f(&mut self.seq, &mut ctx).unwrap()
    }

    fn play(&mut self, mode: PlayMode) {
        self.run(|seq, ctx| seq.set_mode(mode, ctx));
    }

    fn step(&mut self) -> Vec<Facet> {
        self.run(|seq, ctx| seq.step(ctx))
    }

    fn drain(&mut self, queue: &mut EventQueue) -> Vec<Facet> {
        self.run(|seq, ctx| seq.edit_tick(ctx, queue))
    }

    /// Write a note into the pattern under the cursor, track 0
    fn put_note(&mut self, row: usize, slot: usize, note: Note) {
        let pattern = self.project.position().unwrap().pattern;
        let mut update = Update::new();
        update
            .write_cell(CellWrite::Note {
                pattern,
                row: RowIdx::new(row).unwrap(),
                track: TrackIdx::ZERO,
                slot: NoteSlot::new(slot).unwrap(),
                note,
            })
            .unwrap();
        self.run(|seq, ctx| seq.commit(update, ctx));
    }

    fn note(&self, row: usize, slot: usize) -> Note {
        self.project
            .current_pattern()
            .unwrap()
            .row(RowIdx::new(row).unwrap())
            .unwrap()
            .track(TrackIdx::ZERO)
            .unwrap()
            .note(NoteSlot::new(slot).unwrap())
            .unwrap()
    }

    fn sent(&self) -> Vec<Vec<u8>> {
        self.transport.sent.iter().map(|(_, m)| m.clone()).collect()
    }
}

fn queue_of(events: &[InputEvent]) -> EventQueue {
    let mut queue = EventQueue::new();
    for event in events {
        queue.add(*event).unwrap();
    }
    queue
}

/// `songs` songs of `parts` parts of `patterns` patterns of `rows` rows
fn nested_project(studio: &Studio, songs: usize, parts: usize, patterns: usize, rows: usize) -> Project {
    let mut project = Project::new("Nested");
    project
        .add_track(studio, Track::new("Lead", DeviceIdx::ZERO))
        .unwrap();

    let pattern_ids: Vec<PatternIdx> = (0..patterns)
        .map(|i| {
            project
                .add_pattern(studio, format!("Pattern {}", i + 1), rows, vec![PatternTrackBinding::default()])
                .unwrap()
        })
        .collect();

    for s in 0..songs {
        let mut song = Song::new(format!("Song {}", s + 1));
        for p in 0..parts {
            let mut part = Part::new(format!("Part {}.{}", s + 1, p + 1));
            for pattern in &pattern_ids {
                part.push_pattern(*pattern).unwrap();
            }
            song.push_part(project.add_part(part).unwrap()).unwrap();
        }
        project.add_song(song).unwrap();
    }
    project
}

/// Column layout covers every track without overlap
#[test]
fn test_column_map_layout() {
    let studio = Studio::default();
    let mut project = Project::with_rows(&studio, 8).unwrap();
    project
        .add_track(&studio, Track::new("Drums", DeviceIdx::new(1).unwrap()))
        .unwrap();
    project
        .add_track(&studio, Track::new("Bass", DeviceIdx::ZERO))
        .unwrap();
    let map = ColumnMap::build(&project, &studio).unwrap();

    // Piano: 2 notes x 3 stops + 1 effect x 4; Kit: 4 x 3 + 2 x 4
    assert_eq!(map.len(), 10 + 20 + 10);
    assert_eq!(map.track_spans().len(), 3);

    let columns = map.columns();
    for pair in columns.windows(2) {
        assert!(pair[0].end() <= pair[1].display_column, "{:?} overlaps {:?}", pair[0], pair[1]);
    }
    let last = columns.last().unwrap();
    assert!(last.end() <= map.display_width());

    let summed: u16 = columns.iter().map(|c| c.display_width).sum();
    assert_eq!(summed, map.content_width());
    let spans: u16 = map.track_spans().iter().map(|s| s.width).sum();
    assert_eq!(spans, map.display_width());

    for (i, column) in columns.iter().enumerate() {
        let looked_up = map.lookup(trak::index::ColumnIdx::new(i).unwrap()).unwrap();
        assert_eq!(looked_up, column);
        let span = map.track_spans()[column.track.get()];
        assert!(column.display_column >= span.start);
        assert!(column.end() <= span.start + span.width);
    }
}

/// R steps bring a single looping pattern back to its starting row
#[test]
fn test_pattern_returns_after_row_count_steps() {
    for rows in [1, 2, 7, 16, 64] {
        let mut rig = Rig::with_rows(rows);
        rig.play(PlayMode::PlayPattern);
        let start = rig.project.row_idx();

        for _ in 0..rows - 1 {
            rig.step();
            assert_ne!(rig.project.row_idx(), start);
        }
        rig.step();
        assert_eq!(rig.project.row_idx(), start, "rows = {}", rows);
    }
}

/// Playing the whole project visits every row once and ends where it began
#[test]
fn test_play_project_cascade_returns_home() {
    let (songs, parts, patterns, rows) = (2, 2, 2, 3);
    let studio = Studio::default();
    let project = nested_project(&studio, songs, parts, patterns, rows);
    let mut rig = Rig::new(project, studio);
    rig.play(PlayMode::PlayProject);

    let total = songs * parts * patterns * rows;
    let mut visited_songs = vec![false; songs];
    for _ in 0..total {
        rig.step();
        visited_songs[rig.project.song_idx().get()] = true;
    }

    assert!(visited_songs.iter().all(|v| *v));
    let pos = rig.project.position().unwrap();
    assert_eq!(pos.song.get(), 0);
    assert_eq!(pos.song_part.get(), 0);
    assert_eq!(pos.part_pattern.get(), 0);
    assert_eq!(pos.row.get(), 0);
}

/// PlaySong stays inside the current song
#[test]
fn test_play_song_never_leaves_song() {
    let studio = Studio::default();
    let project = nested_project(&studio, 2, 2, 1, 2);
    let mut rig = Rig::new(project, studio);
    rig.play(PlayMode::PlaySong);

    for _ in 0..10 {
        rig.step();
        assert_eq!(rig.project.song_idx().get(), 0);
    }
}

/// The same note twice in one tick is one write and one advance
#[test]
fn test_repeated_note_is_idempotent() {
    let mut single = Rig::with_rows(4);
    single.run(|seq, ctx| seq.toggle_edit(ctx));
    single.drain(&mut queue_of(&[InputEvent::note_on(60, 100)]));

    let mut double = Rig::with_rows(4);
    double.run(|seq, ctx| seq.toggle_edit(ctx));
    double.drain(&mut queue_of(&[
        InputEvent::note_on(60, 100),
        InputEvent::note_on(60, 100),
    ]));

    assert_eq!(double.note(0, 0), Note::new(60, 100));
    assert_eq!(single.project.patterns(), double.project.patterns());
    assert_eq!(single.project.row_idx(), double.project.row_idx());
}

/// Stopped + edit: a written note advances one row, a note-off does not
#[test]
fn test_auto_advance() {
    let mut rig = Rig::with_rows(4);
    rig.run(|seq, ctx| seq.toggle_edit(ctx));

    let facets = rig.drain(&mut queue_of(&[InputEvent::note_on(62, 90)]));
    assert!(facets.contains(&Facet::Cell));
    assert!(facets.contains(&Facet::Row));
    assert_eq!(rig.project.row_idx().get(), 1);
    assert_eq!(rig.note(0, 0), Note::new(62, 90));

    let facets = rig.drain(&mut queue_of(&[InputEvent::note_off(62)]));
    assert!(!facets.contains(&Facet::Row));
    assert_eq!(rig.project.row_idx().get(), 1);

    // Wraps from the last row
    rig.run(|seq, ctx| seq.move_cursor(2, 0, ctx));
    assert_eq!(rig.project.row_idx().get(), 3);
    rig.drain(&mut queue_of(&[InputEvent::note_on(64, 90)]));
    assert_eq!(rig.project.row_idx().get(), 0);
}

/// Five fields and an output event land together with exactly five
/// notifications
#[test]
fn test_commit_is_atomic() {
    let mut rig = Rig::with_rows(16);
    let before = rig.project.clone();

    let mut update = Update::new();
    update.set_edit(true).unwrap();
    update.set_tempo(140).unwrap();
    update.set_quantization(8).unwrap();
    update.set_row(RowIdx::new(9).unwrap()).unwrap();
    update.set_column(trak::index::ColumnIdx::new(3).unwrap()).unwrap();
    update
        .send(InstrumentEvent::control(TrackIdx::ZERO, Effect::new(7, 64)))
        .unwrap();

    // Staging alone changes nothing
    assert_eq!(rig.project, before);
    assert!(rig.facets.is_empty());
    assert!(rig.sent().is_empty());

    rig.run(|seq, ctx| seq.commit(update, ctx));

    assert_eq!(rig.facets.len(), 5);
    for facet in [Facet::Edit, Facet::Tempo, Facet::Quantization, Facet::Row, Facet::Column] {
        assert!(rig.facets.contains(&facet));
    }

    assert!(rig.project.is_edit());
    assert_eq!(rig.project.tempo(), 140);
    assert_eq!(rig.project.quantization(), 8);
    assert_eq!(rig.project.row_idx().get(), 9);
    assert_eq!(rig.project.column_idx().get(), 3);
    assert_eq!(rig.sent(), vec![vec![messages::CONTROL_CHANGE, 7, 64]]);
    assert!(rig.project.is_changed());
}

/// One track (polyphony 2, one parameter), four rows, a note on row 0
#[test]
fn test_look_ahead_scenario() {
    let mut rig = Rig::with_rows(4);
    assert_eq!(rig.seq.columns().len(), 10);
    rig.put_note(0, 0, Note::new(13, 100));

    rig.play(PlayMode::PlayPattern);
    assert_eq!(rig.sent(), vec![vec![messages::NOTE_ON, 13, 100]]);

    rig.transport.clear();
    rig.step();
    assert_eq!(rig.project.row_idx().get(), 1);
    assert_eq!(rig.sent(), vec![vec![messages::NOTE_OFF, 13, 0]]);

    rig.transport.clear();
    rig.step();
    rig.step();
    assert!(rig.transport.sent.is_empty());

    // Back on row 0 the note sounds again
    rig.step();
    assert_eq!(rig.project.row_idx().get(), 0);
    assert_eq!(rig.sent(), vec![vec![messages::NOTE_ON, 13, 100]]);
}

/// Controllers do nothing on a velocity column
#[test]
fn test_controller_ignored_on_velocity_column() {
    let mut rig = Rig::with_rows(4);
    rig.run(|seq, ctx| seq.move_cursor(0, 5, ctx));
    let column = *rig.seq.current_column(&rig.project).unwrap();
    assert_eq!(column.kind, FieldKind::VelocityLow);
    assert_eq!(column.sub, 1);

    rig.run(|seq, ctx| seq.toggle_edit(ctx));
    let before = rig.project.clone();
    let facets = rig.drain(&mut queue_of(&[InputEvent::controller(7, 64)]));

    assert!(facets.is_empty());
    assert_eq!(rig.project, before);
    assert!(!rig.project.is_changed());
    // Thru still forwards it
    assert_eq!(rig.sent(), vec![vec![messages::CONTROL_CHANGE, 7, 64]]);
}

/// Thru off keeps the input off the output
#[test]
fn test_thru_off() {
    let mut rig = Rig::with_rows(4);
    rig.seq = rig.seq.clone().with_options(SequencerOptions { thru: false });
    rig.drain(&mut queue_of(&[InputEvent::note_on(60, 100)]));
    assert!(rig.transport.sent.is_empty());
}

/// Piano key to cell, the way the front end wires it
#[test]
fn test_keyboard_note_entry() {
    let keyboard = KeyboardController::with_defaults().with_entry(4, 96);
    let mut rig = Rig::with_rows(8);

    let idle = KeyContext {
        editing: false,
        nibble: false,
    };
    assert_eq!(
        keyboard.process_key(KeyCode::Char(' '), KeyModifiers::NONE, idle),
        Some(ControlAction::ToggleEdit)
    );
    rig.run(|seq, ctx| seq.toggle_edit(ctx));

    let editing = KeyContext {
        editing: true,
        nibble: false,
    };
    let action = keyboard.process_key(KeyCode::Char('x'), KeyModifiers::NONE, editing);
    let Some(ControlAction::NoteKey(offset)) = action else {
        panic!("expected a note key, got {:?}", action);
    };
    let key = keyboard.note_key(offset).unwrap();
    assert_eq!(key, 50);

    rig.drain(&mut queue_of(&[InputEvent::note_on(key, keyboard.velocity())]));
    assert_eq!(rig.note(0, 0), Note::new(50, 96));
    assert_eq!(rig.project.row_idx().get(), 1);
}

/// Hex digits fill a velocity one nibble at a time
#[test]
fn test_hex_entry_on_velocity() {
    let mut rig = Rig::with_rows(4);
    rig.put_note(0, 0, Note::new(60, 0));
    rig.run(|seq, ctx| seq.toggle_edit(ctx));
    rig.run(|seq, ctx| seq.move_cursor(0, 1, ctx));

    rig.run(|seq, ctx| seq.enter_digit(0x5, ctx));
    assert_eq!(rig.note(0, 0).velocity, 0x50);
    assert_eq!(rig.project.row_idx().get(), 1);
}

/// The row clock paces steps at the project tempo
#[test]
fn test_clock_drives_playback() {
    let mut rig = Rig::with_rows(4);
    let mut clock = RowClock::new(
        rig.project.effective_tempo().unwrap(),
        rig.project.quantization(),
    );
    assert_eq!(clock.interval(), Duration::from_millis(125));

    rig.play(PlayMode::PlayPattern);
    let start = std::time::Instant::now();
    clock.start(start);

    let mut stepped = 0;
    for ms in (0..=500).step_by(25) {
        while clock.poll(start + Duration::from_millis(ms)) {
            rig.step();
            stepped += 1;
        }
    }
    assert_eq!(stepped, 4);
    assert_eq!(rig.project.row_idx().get(), 0);
}

/// Edited content survives a save and reload
#[test]
fn test_save_and_reload_edited_project() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("songs").join("demo.trak");

    let mut rig = Rig::with_rows(8);
    rig.run(|seq, ctx| seq.toggle_edit(ctx));
    rig.drain(&mut queue_of(&[InputEvent::note_on(48, 110)]));
    rig.drain(&mut queue_of(&[InputEvent::note_on(55, 70)]));
    rig.run(|seq, ctx| seq.set_tempo(98, ctx));
    assert!(rig.project.is_changed());

    save_project(&mut rig.project, &path).unwrap();
    assert!(!rig.project.is_changed());
    assert_eq!(rig.project.filename.as_deref(), Some(path.as_path()));

    let loaded = load_project(&path, &rig.studio).unwrap();
    assert_eq!(
        encode(&loaded, PROJECT_PREFIX).unwrap(),
        encode(&rig.project, PROJECT_PREFIX).unwrap()
    );
    assert_eq!(loaded.patterns(), rig.project.patterns());
    assert_eq!(loaded.tempo(), 98);
    assert_eq!(loaded.mode(), PlayMode::Stopped);
    assert!(!loaded.is_edit());
    assert_eq!(loaded.row_idx(), RowIdx::ZERO);
}
