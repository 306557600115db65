// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! MIDI input parsing.
//!
//! Raw bytes from a controller are parsed into [`MidiMessage`] and then
//! mapped onto the sequencer's input events. Only the channel voice
//! messages the tracker records are decoded; everything else is kept raw.

use super::messages;
use crate::sequencer::{InputEvent, Route};

/// A channel message as received from an input port
#[derive(Debug, Clone, PartialEq)]
pub enum MidiMessage {
    /// Key pressed
    NoteOn { channel: u8, key: u8, velocity: u8 },
    /// Key released, including note-on with velocity 0
    NoteOff { channel: u8, key: u8, velocity: u8 },
    /// Controller moved
    ControlChange { channel: u8, parameter: u8, value: u8 },
    /// Patch selected
    ProgramChange { channel: u8, program: u8 },
    /// Anything else, bytes as received
    Unknown(Vec<u8>),
}

impl MidiMessage {
    /// Decode one message. Returns None only for an empty buffer.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let (&status, body) = data.split_first()?;
        let channel = status & 0x0F;
        let data7 = |i: usize| body.get(i).map(|b| b & 0x7F);

        let message = match (status & 0xF0, data7(0), data7(1)) {
            (messages::NOTE_ON, Some(key), Some(velocity)) if velocity > 0 => MidiMessage::NoteOn {
                channel,
                key,
                velocity,
            },
            (messages::NOTE_ON, Some(key), Some(_)) => MidiMessage::NoteOff {
                channel,
                key,
                velocity: 0,
            },
            (messages::NOTE_OFF, Some(key), Some(velocity)) => MidiMessage::NoteOff {
                channel,
                key,
                velocity,
            },
            (messages::CONTROL_CHANGE, Some(parameter), Some(value)) => MidiMessage::ControlChange {
                channel,
                parameter,
                value,
            },
            (messages::PROGRAM_CHANGE, Some(program), _) => {
                MidiMessage::ProgramChange { channel, program }
            }
            _ => MidiMessage::Unknown(data.to_vec()),
        };
        Some(message)
    }

    /// Sequencer input event for this message, if it has one
    pub fn to_input_event(&self, output: Route) -> Option<InputEvent> {
        match *self {
            MidiMessage::NoteOn { channel, key, velocity } => Some(InputEvent::NoteOn {
                key,
                velocity,
                channel,
                output,
            }),
            MidiMessage::NoteOff { channel, key, velocity } => Some(InputEvent::NoteOff {
                key,
                velocity,
                channel,
                output,
            }),
            MidiMessage::ControlChange { channel, parameter, value } => Some(InputEvent::Controller {
                parameter,
                value,
                channel,
                output,
            }),
            MidiMessage::ProgramChange { .. } | MidiMessage::Unknown(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DeviceIdx;

    #[test]
    fn test_parse_voice_messages() {
        assert_eq!(
            MidiMessage::parse(&[0x91, 60, 100]),
            Some(MidiMessage::NoteOn { channel: 1, key: 60, velocity: 100 })
        );
        assert_eq!(
            MidiMessage::parse(&[0x80, 60, 40]),
            Some(MidiMessage::NoteOff { channel: 0, key: 60, velocity: 40 })
        );
        assert_eq!(
            MidiMessage::parse(&[0xB3, 1, 64]),
            Some(MidiMessage::ControlChange { channel: 3, parameter: 1, value: 64 })
        );
        assert_eq!(
            MidiMessage::parse(&[0xC5, 0x85]),
            Some(MidiMessage::ProgramChange { channel: 5, program: 5 })
        );
    }

    #[test]
    fn test_zero_velocity_releases() {
        assert_eq!(
            MidiMessage::parse(&[0x90, 60, 0]),
            Some(MidiMessage::NoteOff { channel: 0, key: 60, velocity: 0 })
        );
    }

    #[test]
    fn test_parse_short_and_empty() {
        assert_eq!(MidiMessage::parse(&[]), None);
        assert_eq!(
            MidiMessage::parse(&[0x90, 60]),
            Some(MidiMessage::Unknown(vec![0x90, 60]))
        );
        assert_eq!(MidiMessage::parse(&[0xF8]), Some(MidiMessage::Unknown(vec![0xF8])));
    }

    #[test]
    fn test_to_input_event() {
        let route = Route::Device(DeviceIdx::new(1).unwrap());
        let event = MidiMessage::parse(&[0x92, 64, 90])
            .and_then(|m| m.to_input_event(route))
            .unwrap();
        assert_eq!(
            event,
            InputEvent::NoteOn {
                key: 64,
                velocity: 90,
                channel: 2,
                output: route
            }
        );

        let cc = MidiMessage::parse(&[0xB0, 7, 100])
            .and_then(|m| m.to_input_event(Route::Broadcast))
            .unwrap();
        assert_eq!(cc, InputEvent::controller(7, 100));

        assert!(MidiMessage::parse(&[0xC0, 5])
            .and_then(|m| m.to_input_event(Route::Broadcast))
            .is_none());
    }
}
