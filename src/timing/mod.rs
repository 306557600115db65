// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Timing and clock module.
//!
//! This module provides the row clock that paces playback.

pub mod clock;

pub use clock::{row_interval, ClockState, RowClock, MAX_TEMPO, MIN_TEMPO};
