// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Project model.
//!
//! The project owns the whole song hierarchy (songs, parts, patterns,
//! rows, tracks) plus the editor/playback cursor. Collections only grow;
//! cursor fields change only when the sequencer commits an update.

pub mod pattern;
pub mod track;

pub use pattern::{Effect, Note, Pattern, PatternTrackBinding, Row, TrackRow};
pub use track::Track;

use std::path::PathBuf;

use crate::arrangement::{Part, Song};
use crate::error::EngineError;
use crate::index::{
    ColumnIdx, PartIdx, PartPatternIdx, PatternIdx, RowIdx, SongIdx, SongPartIdx, TrackIdx,
};
use crate::studio::{Studio, VoiceLayout};

/// Default base tempo in BPM
pub const DEFAULT_TEMPO: u16 = 120;

/// Default rows per beat
pub const DEFAULT_QUANTIZATION: u8 = 4;

/// Default rows in a new pattern
pub const DEFAULT_ROWS: usize = 64;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayMode {
    /// Not playing
    #[default]
    Stopped,
    /// Play every song in order
    PlayProject,
    /// Play the parts of the current song
    PlaySong,
    /// Play the patterns of the current part
    PlayPart,
    /// Loop the current pattern
    PlayPattern,
}

impl PlayMode {
    /// Whether the clock should run
    pub fn is_playing(self) -> bool {
        self != PlayMode::Stopped
    }

    /// Whether the song cursor moves when a song ends
    pub fn advances_song(self) -> bool {
        self == PlayMode::PlayProject
    }

    /// Whether the song-part cursor moves when a part ends
    pub fn advances_song_part(self) -> bool {
        matches!(self, PlayMode::PlayProject | PlayMode::PlaySong)
    }

    /// Whether the part-pattern cursor moves when a pattern ends
    pub fn advances_part_pattern(self) -> bool {
        matches!(
            self,
            PlayMode::PlayProject | PlayMode::PlaySong | PlayMode::PlayPart
        )
    }

    /// Short label for display
    pub fn label(self) -> &'static str {
        match self {
            PlayMode::Stopped => "STOP",
            PlayMode::PlayProject => "PROJECT",
            PlayMode::PlaySong => "SONG",
            PlayMode::PlayPart => "PART",
            PlayMode::PlayPattern => "PATTERN",
        }
    }
}

/// Fully resolved cursor, coarse to fine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Song
    pub song: SongIdx,
    /// Entry in the song's part list
    pub song_part: SongPartIdx,
    /// Part at that entry
    pub part: PartIdx,
    /// Entry in the part's pattern list
    pub part_pattern: PartPatternIdx,
    /// Pattern at that entry
    pub pattern: PatternIdx,
    /// Row in the pattern
    pub row: RowIdx,
}

/// The project model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    /// Project name
    pub name: String,
    /// Base tempo in BPM
    pub(crate) tempo: u16,
    pub(crate) tracks: Vec<Track>,
    pub(crate) patterns: Vec<Pattern>,
    pub(crate) parts: Vec<Part>,
    pub(crate) songs: Vec<Song>,
    pub(crate) changed: bool,
    /// File the project was loaded from or saved to
    pub filename: Option<PathBuf>,
    pub(crate) edit: bool,
    pub(crate) mode: PlayMode,
    pub(crate) song: SongIdx,
    pub(crate) row: RowIdx,
    pub(crate) column: ColumnIdx,
    pub(crate) quantization: u8,
}

impl Default for Project {
    fn default() -> Self {
        Self::new("Untitled")
    }
}

impl Project {
    /// Create an empty project. It has no songs yet, so it is not
    /// playable until populated.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tempo: DEFAULT_TEMPO,
            tracks: Vec::new(),
            patterns: Vec::new(),
            parts: Vec::new(),
            songs: Vec::new(),
            changed: false,
            filename: None,
            edit: false,
            mode: PlayMode::Stopped,
            song: SongIdx::ZERO,
            row: RowIdx::ZERO,
            column: ColumnIdx::ZERO,
            quantization: DEFAULT_QUANTIZATION,
        }
    }

    /// One track, one pattern, one part, one song
    pub fn new_default(studio: &Studio) -> Result<Self, EngineError> {
        Self::with_rows(studio, DEFAULT_ROWS)
    }

    /// Default layout with a given pattern length
    pub fn with_rows(studio: &Studio, rows: usize) -> Result<Self, EngineError> {
        let mut project = Self::new("Untitled");
        let device = crate::index::DeviceIdx::ZERO;
        studio.device(device)?;
        project.add_track(studio, Track::new("Track 1", device))?;
        let pattern =
            project.add_pattern(studio, "Pattern 1", rows, vec![PatternTrackBinding::default()])?;
        let part = project.add_part(Part::new("Part 1").with_pattern(pattern)?)?;
        project.add_song(Song::new("Song 1").with_part(part)?)?;
        Ok(project)
    }

    /// Append a track; every existing pattern gets an empty column for it
    /// bound to the device's first instrument.
    pub fn add_track(&mut self, studio: &Studio, track: Track) -> Result<TrackIdx, EngineError> {
        let index = TrackIdx::new(self.tracks.len()).map_err(|_| EngineError::CapacityExceeded {
            what: "track list",
            capacity: TrackIdx::CAPACITY,
        })?;
        let binding = PatternTrackBinding::default();
        let layout = studio.layout(track.device, binding.instrument)?;
        for pattern in &mut self.patterns {
            pattern.push_track(binding, layout);
        }
        self.tracks.push(track);
        Ok(index)
    }

    /// Append a pattern of empty rows, one binding per track
    pub fn add_pattern(
        &mut self,
        studio: &Studio,
        name: impl Into<String>,
        rows: usize,
        bindings: Vec<PatternTrackBinding>,
    ) -> Result<PatternIdx, EngineError> {
        let index = PatternIdx::new(self.patterns.len()).map_err(|_| EngineError::CapacityExceeded {
            what: "pattern list",
            capacity: PatternIdx::CAPACITY,
        })?;
        let layouts = self.layouts(studio, &bindings)?;
        self.patterns.push(Pattern::new(name, rows, bindings, &layouts)?);
        Ok(index)
    }

    /// Append a part; its pattern references must exist
    pub fn add_part(&mut self, part: Part) -> Result<PartIdx, EngineError> {
        let index = PartIdx::new(self.parts.len()).map_err(|_| EngineError::CapacityExceeded {
            what: "part list",
            capacity: PartIdx::CAPACITY,
        })?;
        for entry in part.patterns() {
            entry.pattern.check(self.patterns.len())?;
        }
        self.parts.push(part);
        Ok(index)
    }

    /// Append a song; its part references must exist
    pub fn add_song(&mut self, song: Song) -> Result<SongIdx, EngineError> {
        let index = SongIdx::new(self.songs.len()).map_err(|_| EngineError::CapacityExceeded {
            what: "song list",
            capacity: SongIdx::CAPACITY,
        })?;
        for entry in song.parts() {
            entry.part.check(self.parts.len())?;
        }
        self.songs.push(song);
        Ok(index)
    }

    /// Row layouts implied by a binding per track
    pub fn layouts(
        &self,
        studio: &Studio,
        bindings: &[PatternTrackBinding],
    ) -> Result<Vec<VoiceLayout>, EngineError> {
        if bindings.len() != self.tracks.len() {
            return Err(EngineError::out_of_range("track", bindings.len(), self.tracks.len()));
        }
        self.tracks
            .iter()
            .zip(bindings)
            .map(|(track, binding)| studio.layout(track.device, binding.instrument))
            .collect()
    }

    /// Row layouts of a pattern's current bindings
    pub fn pattern_layouts(
        &self,
        studio: &Studio,
        pattern: PatternIdx,
    ) -> Result<Vec<VoiceLayout>, EngineError> {
        self.layouts(studio, self.pattern(pattern)?.bindings())
    }

    /// Tracks
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    /// A track
    pub fn track(&self, track: TrackIdx) -> Result<&Track, EngineError> {
        self.tracks
            .get(track.get())
            .ok_or_else(|| EngineError::out_of_range("track", track.get(), self.tracks.len()))
    }

    pub(crate) fn track_mut(&mut self, track: TrackIdx) -> Result<&mut Track, EngineError> {
        let count = self.tracks.len();
        self.tracks
            .get_mut(track.get())
            .ok_or_else(|| EngineError::out_of_range("track", track.get(), count))
    }

    /// Patterns
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// A pattern
    pub fn pattern(&self, pattern: PatternIdx) -> Result<&Pattern, EngineError> {
        self.patterns
            .get(pattern.get())
            .ok_or_else(|| EngineError::out_of_range("pattern", pattern.get(), self.patterns.len()))
    }

    pub(crate) fn pattern_mut(&mut self, pattern: PatternIdx) -> Result<&mut Pattern, EngineError> {
        let count = self.patterns.len();
        self.patterns
            .get_mut(pattern.get())
            .ok_or_else(|| EngineError::out_of_range("pattern", pattern.get(), count))
    }

    /// Parts
    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// A part
    pub fn part(&self, part: PartIdx) -> Result<&Part, EngineError> {
        self.parts
            .get(part.get())
            .ok_or_else(|| EngineError::out_of_range("part", part.get(), self.parts.len()))
    }

    pub(crate) fn part_mut(&mut self, part: PartIdx) -> Result<&mut Part, EngineError> {
        let count = self.parts.len();
        self.parts
            .get_mut(part.get())
            .ok_or_else(|| EngineError::out_of_range("part", part.get(), count))
    }

    /// Songs
    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    /// A song
    pub fn song(&self, song: SongIdx) -> Result<&Song, EngineError> {
        self.songs
            .get(song.get())
            .ok_or_else(|| EngineError::out_of_range("song", song.get(), self.songs.len()))
    }

    pub(crate) fn song_mut(&mut self, song: SongIdx) -> Result<&mut Song, EngineError> {
        let count = self.songs.len();
        self.songs
            .get_mut(song.get())
            .ok_or_else(|| EngineError::out_of_range("song", song.get(), count))
    }

    /// Base tempo in BPM
    pub fn tempo(&self) -> u16 {
        self.tempo
    }

    /// Rows per beat
    pub fn quantization(&self) -> u8 {
        self.quantization
    }

    /// Playback state
    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    /// Whether edit mode is on
    pub fn is_edit(&self) -> bool {
        self.edit
    }

    /// Song cursor
    pub fn song_idx(&self) -> SongIdx {
        self.song
    }

    /// Row cursor
    pub fn row_idx(&self) -> RowIdx {
        self.row
    }

    /// Column cursor
    pub fn column_idx(&self) -> ColumnIdx {
        self.column
    }

    /// Whether there are unsaved changes
    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Forget unsaved changes, after a save
    pub fn clear_changed(&mut self) {
        self.changed = false;
    }

    pub(crate) fn mark_changed(&mut self) {
        self.changed = true;
    }

    /// Resolve the cursor through song, part and pattern
    pub fn position(&self) -> Result<Position, EngineError> {
        let song = self.song(self.song)?;
        let song_part = song.cursor();
        let part_idx = song.current()?;
        let part = self.part(part_idx)?;
        let part_pattern = part.cursor();
        let pattern = part.current()?;
        let row = self.row.check(self.pattern(pattern)?.row_count())?;
        Ok(Position {
            song: self.song,
            song_part,
            part: part_idx,
            part_pattern,
            pattern,
            row,
        })
    }

    /// Pattern under the cursor
    pub fn current_pattern(&self) -> Result<&Pattern, EngineError> {
        let pattern = self.part(self.song(self.song)?.current()?)?.current()?;
        self.pattern(pattern)
    }

    /// Base tempo plus every active offset down to the current row
    pub fn effective_tempo(&self) -> Result<i32, EngineError> {
        let pos = self.position()?;
        let pattern = self.pattern(pos.pattern)?;
        Ok(self.tempo as i32
            + self.song(pos.song)?.tempo as i32
            + self.part(pos.part)?.tempo as i32
            + pattern.tempo as i32
            + pattern.row(pos.row)?.tempo as i32)
    }

    /// Check every reference, cursor and row shape against the studio
    pub fn validate(&self, studio: &Studio) -> Result<(), EngineError> {
        if self.tracks.is_empty() {
            return Err(EngineError::out_of_range("track", 0, 0));
        }
        for track in &self.tracks {
            studio.device(track.device)?;
        }
        for (i, pattern) in self.patterns.iter().enumerate() {
            let layouts = self.layouts(studio, pattern.bindings())?;
            pattern.validate(i, &layouts)?;
        }
        for part in &self.parts {
            if part.is_empty() {
                return Err(EngineError::out_of_range("part pattern", 0, 0));
            }
            for entry in part.patterns() {
                entry.pattern.check(self.patterns.len())?;
            }
            part.cursor().check(part.len())?;
        }
        for song in &self.songs {
            if song.is_empty() {
                return Err(EngineError::out_of_range("song part", 0, 0));
            }
            for entry in song.parts() {
                entry.part.check(self.parts.len())?;
            }
            song.cursor().check(song.len())?;
        }
        self.position()?;
        Ok(())
    }

    pub(crate) fn set_edit(&mut self, edit: bool) {
        self.edit = edit;
    }

    pub(crate) fn set_mode(&mut self, mode: PlayMode) {
        self.mode = mode;
    }

    pub(crate) fn set_song_cursor(&mut self, song: SongIdx) -> Result<(), EngineError> {
        self.song = song.check(self.songs.len())?;
        Ok(())
    }

    pub(crate) fn set_row_cursor(&mut self, row: RowIdx) -> Result<(), EngineError> {
        self.row = row.check(self.current_pattern()?.row_count())?;
        Ok(())
    }

    pub(crate) fn set_column_cursor(&mut self, column: ColumnIdx) {
        self.column = column;
    }

    pub(crate) fn set_quantization(&mut self, quantization: u8) {
        self.quantization = quantization.max(1);
    }

    pub(crate) fn set_tempo(&mut self, tempo: u16) {
        self.tempo = tempo;
    }

    /// Pull the row cursor back inside the current pattern
    pub(crate) fn clamp_row(&mut self) -> Result<(), EngineError> {
        let rows = self.current_pattern()?.row_count();
        if self.row.get() >= rows {
            self.row = RowIdx::within(rows - 1, rows)?;
        }
        Ok(())
    }
}
