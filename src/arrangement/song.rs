// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Songs: ordered playlists of parts.

use crate::error::EngineError;
use crate::index::{PartIdx, SongPartIdx};

/// Reference from a song to a project part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SongPartRef {
    /// Part to play
    pub part: PartIdx,
}

impl SongPartRef {
    /// Create a reference
    pub fn new(part: PartIdx) -> Self {
        Self { part }
    }
}

/// A song arrangement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Song {
    /// Song name
    pub name: String,
    /// Tempo offset relative to the project
    pub tempo: i8,
    pub(crate) parts: Vec<SongPartRef>,
    pub(crate) cursor: SongPartIdx,
}

impl Default for Song {
    fn default() -> Self {
        Self::new("Song")
    }
}

impl Song {
    /// Create a new empty song
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tempo: 0,
            parts: Vec::new(),
            cursor: SongPartIdx::ZERO,
        }
    }

    /// Builder: append a part
    pub fn with_part(mut self, part: PartIdx) -> Result<Self, EngineError> {
        self.push_part(part)?;
        Ok(self)
    }

    /// Builder: set tempo offset
    pub fn with_tempo(mut self, tempo: i8) -> Self {
        self.tempo = tempo;
        self
    }

    /// Append a part to the arrangement
    pub fn push_part(&mut self, part: PartIdx) -> Result<SongPartIdx, EngineError> {
        let index = SongPartIdx::new(self.parts.len()).map_err(|_| EngineError::CapacityExceeded {
            what: "song part list",
            capacity: SongPartIdx::CAPACITY,
        })?;
        self.parts.push(SongPartRef::new(part));
        Ok(index)
    }

    /// Arrangement entries
    pub fn parts(&self) -> &[SongPartRef] {
        &self.parts
    }

    /// Number of arrangement entries
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Check if the arrangement is empty
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Selected arrangement entry
    pub fn cursor(&self) -> SongPartIdx {
        self.cursor
    }

    /// Select an arrangement entry
    pub fn set_cursor(&mut self, cursor: SongPartIdx) -> Result<(), EngineError> {
        self.cursor = cursor.check(self.parts.len())?;
        Ok(())
    }

    /// Part at an arrangement entry
    pub fn part_at(&self, entry: SongPartIdx) -> Result<PartIdx, EngineError> {
        self.parts
            .get(entry.get())
            .map(|r| r.part)
            .ok_or_else(|| EngineError::out_of_range("song part", entry.get(), self.parts.len()))
    }

    /// Part under the cursor
    pub fn current(&self) -> Result<PartIdx, EngineError> {
        self.part_at(self.cursor)
    }
}
