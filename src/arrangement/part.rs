// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Parts: ordered playlists of patterns.
//!
//! A part plays its patterns in order and keeps a cursor on the entry that
//! is currently selected or playing.

use crate::error::EngineError;
use crate::index::{PartPatternIdx, PatternIdx};

/// Reference from a part to a project pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartPatternRef {
    /// Pattern to play
    pub pattern: PatternIdx,
}

impl PartPatternRef {
    /// Create a reference
    pub fn new(pattern: PatternIdx) -> Self {
        Self { pattern }
    }
}

/// A part definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Part name
    pub name: String,
    /// Tempo offset relative to the song
    pub tempo: i8,
    pub(crate) patterns: Vec<PartPatternRef>,
    pub(crate) cursor: PartPatternIdx,
}

impl Default for Part {
    fn default() -> Self {
        Self::new("Part")
    }
}

impl Part {
    /// Create a new empty part
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tempo: 0,
            patterns: Vec::new(),
            cursor: PartPatternIdx::ZERO,
        }
    }

    /// Builder: append a pattern
    pub fn with_pattern(mut self, pattern: PatternIdx) -> Result<Self, EngineError> {
        self.push_pattern(pattern)?;
        Ok(self)
    }

    /// Builder: set tempo offset
    pub fn with_tempo(mut self, tempo: i8) -> Self {
        self.tempo = tempo;
        self
    }

    /// Append a pattern to the playlist
    pub fn push_pattern(&mut self, pattern: PatternIdx) -> Result<PartPatternIdx, EngineError> {
        let index = PartPatternIdx::new(self.patterns.len()).map_err(|_| EngineError::CapacityExceeded {
            what: "part pattern list",
            capacity: PartPatternIdx::CAPACITY,
        })?;
        self.patterns.push(PartPatternRef::new(pattern));
        Ok(index)
    }

    /// Playlist entries
    pub fn patterns(&self) -> &[PartPatternRef] {
        &self.patterns
    }

    /// Number of playlist entries
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Check if the playlist is empty
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Selected playlist entry
    pub fn cursor(&self) -> PartPatternIdx {
        self.cursor
    }

    /// Select a playlist entry
    pub fn set_cursor(&mut self, cursor: PartPatternIdx) -> Result<(), EngineError> {
        self.cursor = cursor.check(self.patterns.len())?;
        Ok(())
    }

    /// Pattern at a playlist entry
    pub fn pattern_at(&self, entry: PartPatternIdx) -> Result<PatternIdx, EngineError> {
        self.patterns
            .get(entry.get())
            .map(|r| r.pattern)
            .ok_or_else(|| EngineError::out_of_range("part pattern", entry.get(), self.patterns.len()))
    }

    /// Pattern under the cursor
    pub fn current(&self) -> Result<PatternIdx, EngineError> {
        self.pattern_at(self.cursor)
    }
}
