// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Cross-platform hardware backend built on midir.

use std::sync::mpsc::{self, Receiver};

use anyhow::{anyhow, Result};
use midir::{Ignore, MidiInputConnection, MidiOutputConnection};
use tracing::info;

use super::{MidiMessage, MidiOutput};

const CLIENT_NAME: &str = "trak";

/// Output connection to one hardware port
pub struct MidirOutput {
    connection: MidiOutputConnection,
}

impl MidirOutput {
    /// Connect to the first output port whose name contains `name`
    /// (case-insensitive).
    pub fn new_by_name(name: &str) -> Result<Self> {
        let midi_out = midir::MidiOutput::new(CLIENT_NAME)
            .map_err(|e| anyhow!("Failed to create MIDI client: {}", e))?;
        let wanted = name.to_lowercase();
        let port = midi_out
            .ports()
            .into_iter()
            .find(|p| {
                midi_out
                    .port_name(p)
                    .map(|n| n.to_lowercase().contains(&wanted))
                    .unwrap_or(false)
            })
            .ok_or_else(|| anyhow!("No MIDI destination matching '{}' found", name))?;
        let port_name = midi_out.port_name(&port).unwrap_or_else(|_| name.to_string());

        let connection = midi_out
            .connect(&port, "trak-out")
            .map_err(|e| anyhow!("Failed to connect to '{}': {}", port_name, e))?;
        info!("MIDI output connected: {}", port_name);
        Ok(Self { connection })
    }
}

impl MidiOutput for MidirOutput {
    fn send(&mut self, message: &[u8]) -> Result<()> {
        self.connection
            .send(message)
            .map_err(|e| anyhow!("MIDI send failed: {}", e))
    }
}

/// Input connection delivering parsed messages through a channel
pub struct MidirInput {
    _connection: MidiInputConnection<()>,
    receiver: Receiver<MidiMessage>,
}

impl MidirInput {
    /// Connect to the first input port whose name contains `name`
    pub fn new_by_name(name: &str) -> Result<Self> {
        let mut midi_in = midir::MidiInput::new(CLIENT_NAME)
            .map_err(|e| anyhow!("Failed to create MIDI client: {}", e))?;
        midi_in.ignore(Ignore::Sysex | Ignore::Time);

        let wanted = name.to_lowercase();
        let port = midi_in
            .ports()
            .into_iter()
            .find(|p| {
                midi_in
                    .port_name(p)
                    .map(|n| n.to_lowercase().contains(&wanted))
                    .unwrap_or(false)
            })
            .ok_or_else(|| anyhow!("No MIDI source matching '{}' found", name))?;

        let (tx, rx) = mpsc::channel();
        let connection = midi_in
            .connect(
                &port,
                "trak-in",
                move |_timestamp, data, _| {
                    if let Some(msg) = MidiMessage::parse(data) {
                        let _ = tx.send(msg);
                    }
                },
                (),
            )
            .map_err(|e| anyhow!("Failed to connect to source '{}': {}", name, e))?;
        info!("MIDI input connected: {}", name);

        Ok(Self {
            _connection: connection,
            receiver: rx,
        })
    }

    /// Receive all pending MIDI messages
    pub fn recv_all(&self) -> Vec<MidiMessage> {
        self.receiver.try_iter().collect()
    }
}

/// List all available MIDI destinations
pub fn list_destinations() -> Vec<(usize, String)> {
    let Ok(midi_out) = midir::MidiOutput::new(CLIENT_NAME) else {
        return Vec::new();
    };
    midi_out
        .ports()
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let name = midi_out
                .port_name(p)
                .unwrap_or_else(|_| format!("Unknown {}", i));
            (i, name)
        })
        .collect()
}

/// List all available MIDI sources
pub fn list_sources() -> Vec<(usize, String)> {
    let Ok(midi_in) = midir::MidiInput::new(CLIENT_NAME) else {
        return Vec::new();
    };
    midi_in
        .ports()
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let name = midi_in
                .port_name(p)
                .unwrap_or_else(|_| format!("Unknown {}", i));
            (i, name)
        })
        .collect()
}
