// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Engine error type.
//!
//! Every variant is a broken caller contract. Nothing in the engine
//! recovers from these; the front end logs them and exits.

use thiserror::Error;

use crate::sequencer::Facet;

/// Invariant violations raised by the engine
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// An index fell outside its owning collection
    #[error("{kind} index {index} out of range (count {count})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        count: usize,
    },

    /// A collection or buffer reached its hard capacity
    #[error("{what} capacity of {capacity} exceeded")]
    CapacityExceeded { what: &'static str, capacity: usize },

    /// A one-shot field was staged twice before commit
    #[error("{0:?} written twice in one tick")]
    FieldWrittenTwice(Facet),

    /// The playback clock was driven while stopped
    #[error("step() called while playback is stopped")]
    StepWhileStopped,

    /// A pattern's track rows disagree with its instrument bindings
    #[error(
        "pattern {pattern} track {track}: expected {expected_notes} notes/{expected_effects} effects, found {found_notes}/{found_effects}"
    )]
    ShapeMismatch {
        pattern: usize,
        track: usize,
        expected_notes: usize,
        expected_effects: usize,
        found_notes: usize,
        found_effects: usize,
    },

    /// A catalog entry is unusable
    #[error("studio entry '{name}': {reason}")]
    InvalidInstrument { name: String, reason: &'static str },
}

impl EngineError {
    /// Shorthand for an out-of-range index
    pub fn out_of_range(kind: &'static str, index: usize, count: usize) -> Self {
        EngineError::IndexOutOfRange { kind, index, count }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = EngineError::out_of_range("row", 70, 64);
        assert_eq!(err.to_string(), "row index 70 out of range (count 64)");

        let err = EngineError::FieldWrittenTwice(Facet::Row);
        assert_eq!(err.to_string(), "Row written twice in one tick");

        let err = EngineError::CapacityExceeded {
            what: "event queue",
            capacity: 64,
        };
        assert!(err.to_string().contains("event queue"));
    }
}
