// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Project tracks.
//!
//! A track is a lane bound to one studio device. It remembers which key is
//! sounding on each note slot so the sequencer can send the matching
//! note-off later.

use crate::index::{DeviceIdx, NoteSlot, MAX_POLYPHONY};

/// A sequencer track
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Track name
    pub name: String,
    /// Device this track plays through
    pub device: DeviceIdx,
    /// Key sounding on each note slot, 0 = silent
    sounding: [u8; MAX_POLYPHONY],
}

impl Default for Track {
    fn default() -> Self {
        Self::new("Track", DeviceIdx::ZERO)
    }
}

impl Track {
    /// Create a new track
    pub fn new(name: impl Into<String>, device: DeviceIdx) -> Self {
        Self {
            name: name.into(),
            device,
            sounding: [0; MAX_POLYPHONY],
        }
    }

    /// Key sounding on a slot (0 if silent)
    pub fn sounding(&self, slot: NoteSlot) -> u8 {
        self.sounding[slot.get()]
    }

    /// Record a key as sounding on a slot
    pub fn set_sounding(&mut self, slot: NoteSlot, key: u8) {
        self.sounding[slot.get()] = key;
    }

    /// Slots with a sounding key
    pub fn sounding_slots(&self) -> impl Iterator<Item = (NoteSlot, u8)> + '_ {
        NoteSlot::range(MAX_POLYPHONY)
            .map(move |slot| (slot, self.sounding[slot.get()]))
            .filter(|(_, key)| *key != 0)
    }

    /// Whether any slot is sounding
    pub fn is_sounding(&self) -> bool {
        self.sounding.iter().any(|k| *k != 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sounding_keys() {
        let mut track = Track::new("Lead", DeviceIdx::ZERO);
        assert!(!track.is_sounding());

        let slot = NoteSlot::new(3).unwrap();
        track.set_sounding(slot, 64);
        assert_eq!(track.sounding(slot), 64);
        assert_eq!(track.sounding_slots().collect::<Vec<_>>(), vec![(slot, 64)]);

        track.set_sounding(slot, 0);
        assert!(!track.is_sounding());
    }
}
