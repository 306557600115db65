// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI I/O abstraction layer.
//!
//! The sequencer talks to a [`Transport`], which routes per-device channel
//! messages to whatever backend is attached. Backends implement the small
//! [`MidiOutput`] byte-level trait; the midir backend is only built with
//! the `hardware` feature.

pub mod input;
#[cfg(feature = "hardware")]
pub mod midir_backend;

use anyhow::{anyhow, Result};
use tracing::debug;

use crate::index::DeviceIdx;

pub use input::MidiMessage;
#[cfg(feature = "hardware")]
pub use midir_backend::{list_destinations, list_sources, MidirInput, MidirOutput};

/// Trait for MIDI output implementations.
///
/// This trait abstracts over different MIDI backends, providing a unified
/// interface for sending raw MIDI messages.
pub trait MidiOutput: Send {
    /// Send a MIDI message immediately.
    ///
    /// # Arguments
    /// * `message` - Raw MIDI bytes (e.g., `[0x90, 60, 127]` for Note On)
    fn send(&mut self, message: &[u8]) -> Result<()>;
}

/// MIDI message constants
pub mod messages {
    // Channel Voice Messages (upper nibble, lower nibble is channel 0-15)
    pub const NOTE_OFF: u8 = 0x80;
    pub const NOTE_ON: u8 = 0x90;
    pub const CONTROL_CHANGE: u8 = 0xB0;
    pub const PROGRAM_CHANGE: u8 = 0xC0;

    // Channel Mode controller numbers
    pub const ALL_NOTES_OFF: u8 = 123;
}

/// Channel-message sink addressed by studio device.
///
/// Only [`Transport::send`] is required; the typed helpers build the bytes.
pub trait Transport {
    /// Deliver raw bytes to one device
    fn send(&mut self, device: DeviceIdx, message: &[u8]) -> Result<()>;

    /// Note-on
    fn send_note_on(&mut self, device: DeviceIdx, channel: u8, key: u8, velocity: u8) -> Result<()> {
        self.send(
            device,
            &[messages::NOTE_ON | (channel & 0x0F), key & 0x7F, velocity & 0x7F],
        )
    }

    /// Note-off
    fn send_note_off(&mut self, device: DeviceIdx, channel: u8, key: u8, velocity: u8) -> Result<()> {
        self.send(
            device,
            &[messages::NOTE_OFF | (channel & 0x0F), key & 0x7F, velocity & 0x7F],
        )
    }

    /// Control change
    fn send_control(&mut self, device: DeviceIdx, channel: u8, parameter: u8, value: u8) -> Result<()> {
        self.send(
            device,
            &[
                messages::CONTROL_CHANGE | (channel & 0x0F),
                parameter & 0x7F,
                value & 0x7F,
            ],
        )
    }

    /// Silence everything the sink can reach. Sinks without ports have
    /// nothing to do.
    fn all_notes_off(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Transport that fans out to one optional output per device
#[derive(Default)]
pub struct PortTransport {
    outputs: Vec<Option<Box<dyn MidiOutput>>>,
}

impl PortTransport {
    /// Create a transport with no outputs attached
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an output to a device, replacing any previous one
    pub fn attach(&mut self, device: DeviceIdx, output: Box<dyn MidiOutput>) {
        let i = device.get();
        if self.outputs.len() <= i {
            self.outputs.resize_with(i + 1, || None);
        }
        self.outputs[i] = Some(output);
    }

    /// Whether a device has an output attached
    pub fn is_attached(&self, device: DeviceIdx) -> bool {
        matches!(self.outputs.get(device.get()), Some(Some(_)))
    }
}

impl Transport for PortTransport {
    fn send(&mut self, device: DeviceIdx, message: &[u8]) -> Result<()> {
        match self.outputs.get_mut(device.get()) {
            Some(Some(output)) => output.send(message),
            _ => Err(anyhow!("no MIDI output attached to device {}", device)),
        }
    }

    /// All Notes Off on every channel of every attached output
    fn all_notes_off(&mut self) -> Result<()> {
        for output in self.outputs.iter_mut().flatten() {
            for channel in 0..16u8 {
                output.send(&[
                    messages::CONTROL_CHANGE | channel,
                    messages::ALL_NOTES_OFF,
                    0,
                ])?;
            }
        }
        Ok(())
    }
}

/// Transport that only logs what it would send
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

impl Transport for LogTransport {
    fn send(&mut self, device: DeviceIdx, message: &[u8]) -> Result<()> {
        debug!(device = device.get(), ?message, "midi out");
        Ok(())
    }
}

/// Transport that records every message, for tests and offline rendering
#[derive(Debug, Clone, Default)]
pub struct MemoryTransport {
    /// Messages in send order
    pub sent: Vec<(DeviceIdx, Vec<u8>)>,
}

impl MemoryTransport {
    /// Forget recorded messages
    pub fn clear(&mut self) {
        self.sent.clear();
    }

    /// Recorded messages whose status nibble matches `kind`
    pub fn of_kind(&self, kind: u8) -> impl Iterator<Item = &(DeviceIdx, Vec<u8>)> {
        self.sent
            .iter()
            .filter(move |(_, m)| m.first().map(|s| s & 0xF0) == Some(kind))
    }
}

impl Transport for MemoryTransport {
    fn send(&mut self, device: DeviceIdx, message: &[u8]) -> Result<()> {
        self.sent.push((device, message.to_vec()));
        Ok(())
    }
}
