// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Bounded index types.
//!
//! Each index wraps a narrow integer and carries a hard capacity. An index
//! can only be built through a checked constructor, so an out-of-range value
//! is rejected where it is made instead of wrapping silently.

use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;

/// Maximum note slots an instrument can expose per row
pub const MAX_POLYPHONY: usize = 16;

/// Maximum effect slots an instrument can expose per row
pub const MAX_PARAMETERS: usize = 16;

macro_rules! bounded_index {
    ($(#[$meta:meta])* $name:ident($repr:ty), $kind:expr) => {
        bounded_index!($(#[$meta])* $name($repr), $kind, <$repr>::MAX as usize + 1);
    };
    ($(#[$meta:meta])* $name:ident($repr:ty), $kind:expr, $capacity:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
        pub struct $name($repr);

        impl $name {
            /// Number of distinct values this index can take
            pub const CAPACITY: usize = $capacity;
            /// First entry
            pub const ZERO: Self = Self(0);

            /// Build an index, checking it against the type's capacity
            pub fn new(value: usize) -> Result<Self, EngineError> {
                if value < Self::CAPACITY {
                    Ok(Self(value as $repr))
                } else {
                    Err(EngineError::out_of_range($kind, value, Self::CAPACITY))
                }
            }

            /// Build an index, checking it against a collection's length
            pub fn within(value: usize, count: usize) -> Result<Self, EngineError> {
                if value < count.min(Self::CAPACITY) {
                    Ok(Self(value as $repr))
                } else {
                    Err(EngineError::out_of_range($kind, value, count))
                }
            }

            /// Check that this index addresses an entry of a collection
            pub fn check(self, count: usize) -> Result<Self, EngineError> {
                Self::within(self.get(), count)
            }

            /// Raw position
            pub fn get(self) -> usize {
                self.0 as usize
            }

            /// Next entry, wrapping to zero past `count - 1`
            pub fn wrapping_next(self, count: usize) -> Self {
                if self.get() + 1 >= count {
                    Self::ZERO
                } else {
                    Self(self.0 + 1)
                }
            }

            /// Previous entry, wrapping to `count - 1` below zero
            pub fn wrapping_prev(self, count: usize) -> Self {
                if count == 0 {
                    Self::ZERO
                } else if self.0 == 0 || self.get() >= count {
                    Self((count.min(Self::CAPACITY) - 1) as $repr)
                } else {
                    Self(self.0 - 1)
                }
            }

            /// Whether this is the final entry of a collection of `count`
            pub fn is_last(self, count: usize) -> bool {
                self.get() + 1 == count
            }

            /// All indices below `count`
            pub fn range(count: usize) -> impl Iterator<Item = Self> {
                (0..count.min(Self::CAPACITY)).map(|i| Self(i as $repr))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = EngineError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value: usize = s
                    .trim()
                    .parse()
                    .map_err(|_| EngineError::out_of_range($kind, usize::MAX, Self::CAPACITY))?;
                Self::new(value)
            }
        }
    };
}

bounded_index!(
    /// Track within the project
    TrackIdx(u8), "track"
);
bounded_index!(
    /// Pattern within the project
    PatternIdx(u8), "pattern"
);
bounded_index!(
    /// Row within a pattern
    RowIdx(u8), "row"
);
bounded_index!(
    /// Part within the project
    PartIdx(u8), "part"
);
bounded_index!(
    /// Song within the project
    SongIdx(u8), "song"
);
bounded_index!(
    /// Entry in a song's part list
    SongPartIdx(u8), "song part"
);
bounded_index!(
    /// Entry in a part's pattern list
    PartPatternIdx(u8), "part pattern"
);
bounded_index!(
    /// Cursor column in the column map
    ColumnIdx(u16), "column"
);
bounded_index!(
    /// Device in the studio catalog
    DeviceIdx(u8), "device"
);
bounded_index!(
    /// Instrument of a device
    InstrumentIdx(u8), "instrument"
);
bounded_index!(
    /// Named setting of an instrument
    SettingIdx(u8), "setting"
);
bounded_index!(
    /// Note slot in a track row
    NoteSlot(u8), "note slot", MAX_POLYPHONY
);
bounded_index!(
    /// Effect slot in a track row
    EffectSlot(u8), "effect slot", MAX_PARAMETERS
);
