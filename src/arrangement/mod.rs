// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Song and arrangement system.
//!
//! This module provides:
//! - Parts: ordered playlists of patterns with a tempo offset
//! - Songs: ordered playlists of parts with a tempo offset

pub mod part;
pub mod song;

pub use part::{Part, PartPatternRef};
pub use song::{Song, SongPartRef};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{PartIdx, PatternIdx};

    #[test]
    fn test_part_creation() {
        let part = Part::new("Verse");
        assert_eq!(part.name, "Verse");
        assert!(part.patterns().is_empty());
    }

    #[test]
    fn test_song_creation() {
        let song = Song::new("My Song");
        assert_eq!(song.name, "My Song");
        assert!(song.parts().is_empty());
    }

    #[test]
    fn test_nested_lookup() {
        let part = Part::new("A").with_pattern(PatternIdx::new(4).unwrap()).unwrap();
        let song = Song::new("S").with_part(PartIdx::ZERO).unwrap();
        let parts = [part];
        let resolved = parts[song.current().unwrap().get()].current().unwrap();
        assert_eq!(resolved.get(), 4);
    }
}
