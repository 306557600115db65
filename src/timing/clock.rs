// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Row clock.
//!
//! Tells the tick loop when the next pattern row is due. The interval is
//! one beat divided by the rows per beat, and is recomputed for every row
//! so tempo offsets on songs, parts, patterns and rows apply as they are
//! reached.

use std::time::{Duration, Instant};

/// Slowest tempo the clock will run at
pub const MIN_TEMPO: i32 = 1;

/// Fastest tempo the clock will run at
pub const MAX_TEMPO: i32 = 999;

/// Row clock state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockState {
    Stopped,
    Running,
}

/// Time between rows: 60 s / (tempo * rows per beat)
pub fn row_interval(tempo: i32, quantization: u8) -> Duration {
    let bpm = tempo.clamp(MIN_TEMPO, MAX_TEMPO) as f64;
    let rows_per_beat = quantization.max(1) as f64;
    Duration::from_secs_f64(60.0 / (bpm * rows_per_beat))
}

/// Row boundary generator
#[derive(Debug, Clone)]
pub struct RowClock {
    /// Current clock state
    state: ClockState,
    /// Interval of the row in progress
    interval: Duration,
    /// When the next row is due
    next_due: Option<Instant>,
    /// Rows reported since start
    rows: u64,
}

impl RowClock {
    /// Create a stopped clock
    pub fn new(tempo: i32, quantization: u8) -> Self {
        Self {
            state: ClockState::Stopped,
            interval: row_interval(tempo, quantization),
            next_due: None,
            rows: 0,
        }
    }

    /// Get the current clock state
    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Interval of the row in progress
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Rows reported since the last start
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Use a new tempo for the next interval
    pub fn set_tempo(&mut self, tempo: i32, quantization: u8) {
        self.interval = row_interval(tempo, quantization);
    }

    /// Start counting from `now`; the first row is due one interval later
    pub fn start(&mut self, now: Instant) {
        self.state = ClockState::Running;
        self.rows = 0;
        self.next_due = Some(now + self.interval);
    }

    /// Stop the clock
    pub fn stop(&mut self) {
        self.state = ClockState::Stopped;
        self.next_due = None;
    }

    /// Whether a row boundary has passed. Reports at most one row per call.
    ///
    /// The next deadline is anchored to the previous one, so polling late
    /// does not push later rows back. If the loop fell more than a whole
    /// interval behind, the clock re-anchors on `now` instead of bursting.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(due) = self.next_due else {
            return false;
        };
        if now < due {
            return false;
        }
        let next = due + self.interval;
        self.next_due = Some(if next <= now { now + self.interval } else { next });
        self.rows += 1;
        true
    }

    /// Time until the next row is due, zero when stopped or overdue
    pub fn time_until_next_row(&self, now: Instant) -> Duration {
        self.next_due
            .map(|due| due.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }
}

impl Default for RowClock {
    fn default() -> Self {
        Self::new(120, 4)
    }
}
