// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Input event queue.
//!
//! Keyboard and MIDI input adapters push events here between ticks; the
//! sequencer drains the whole queue once per tick and then clears it.

use crate::error::EngineError;
use crate::index::DeviceIdx;

/// Upper bound on events queued between two ticks
pub const EVENT_QUEUE_CAPACITY: usize = 64;

/// Where an event should be heard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Route {
    /// Every output, resolved by the sequencer to the track under the cursor
    #[default]
    Broadcast,
    /// One device
    Device(DeviceIdx),
}

impl Route {
    /// Decode the numeric output convention: `<= 0` broadcasts, `n > 0`
    /// selects device `n - 1`.
    pub fn from_output(output: i32) -> Result<Self, EngineError> {
        if output <= 0 {
            Ok(Route::Broadcast)
        } else {
            Ok(Route::Device(DeviceIdx::new(output as usize - 1)?))
        }
    }
}

/// A tagged input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Key pressed
    NoteOn {
        key: u8,
        velocity: u8,
        channel: u8,
        output: Route,
    },
    /// Key released
    NoteOff {
        key: u8,
        velocity: u8,
        channel: u8,
        output: Route,
    },
    /// Controller moved
    Controller {
        parameter: u8,
        value: u8,
        channel: u8,
        output: Route,
    },
}

impl InputEvent {
    /// Note-on broadcast on channel 0
    pub fn note_on(key: u8, velocity: u8) -> Self {
        InputEvent::NoteOn {
            key,
            velocity,
            channel: 0,
            output: Route::Broadcast,
        }
    }

    /// Note-off broadcast on channel 0
    pub fn note_off(key: u8) -> Self {
        InputEvent::NoteOff {
            key,
            velocity: 0,
            channel: 0,
            output: Route::Broadcast,
        }
    }

    /// Controller broadcast on channel 0
    pub fn controller(parameter: u8, value: u8) -> Self {
        InputEvent::Controller {
            parameter,
            value,
            channel: 0,
            output: Route::Broadcast,
        }
    }

    /// Destination of this event
    pub fn output(&self) -> Route {
        match self {
            InputEvent::NoteOn { output, .. }
            | InputEvent::NoteOff { output, .. }
            | InputEvent::Controller { output, .. } => *output,
        }
    }
}

/// Fixed-capacity FIFO of input events
#[derive(Debug, Clone)]
pub struct EventQueue {
    events: Vec<InputEvent>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self {
            events: Vec::with_capacity(EVENT_QUEUE_CAPACITY),
        }
    }

    /// Append an event. A full queue is a sizing bug, not back-pressure.
    pub fn add(&mut self, event: InputEvent) -> Result<(), EngineError> {
        if self.events.len() >= EVENT_QUEUE_CAPACITY {
            return Err(EngineError::CapacityExceeded {
                what: "event queue",
                capacity: EVENT_QUEUE_CAPACITY,
            });
        }
        self.events.push(event);
        Ok(())
    }

    /// Number of queued events
    pub fn count(&self) -> usize {
        self.events.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Event at position `i` in arrival order
    pub fn get(&self, i: usize) -> Result<&InputEvent, EngineError> {
        self.events
            .get(i)
            .ok_or_else(|| EngineError::out_of_range("event", i, self.events.len()))
    }

    /// Events in arrival order
    pub fn iter(&self) -> impl Iterator<Item = &InputEvent> {
        self.events.iter()
    }

    /// Drop every event
    pub fn clear(&mut self) {
        self.events.clear();
    }
}
