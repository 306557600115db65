// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Control system for keyboard input.
//!
//! This module provides:
//! - Keyboard shortcut handling with a tracker piano layout
//! - The actions the front end maps onto sequencer operations

pub mod keyboard;

pub use keyboard::{format_shortcut, KeyBinding, KeyContext, KeyboardController, Shortcut};

use crate::project::PlayMode;

/// Action that can be triggered by controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    // Notes
    /// Piano key, semitones above the current octave
    NoteKey(u8),
    /// Raise the keyboard octave
    OctaveUp,
    /// Lower the keyboard octave
    OctaveDown,

    // Transport
    /// Start playback in a mode
    Play(PlayMode),
    /// Stop playback
    Stop,
    /// Adjust the base tempo by delta
    AdjustTempo(i16),

    // Editing
    /// Flip edit mode
    ToggleEdit,
    /// Hex digit typed on a nibble column
    HexDigit(u8),
    /// Empty the cell under the cursor
    ClearCell,

    // Navigation
    /// Move the cursor by rows and columns
    MoveCursor { rows: i32, columns: i32 },
    /// Jump to the next track
    NextTrack,
    /// Jump to the previous track
    PrevTrack,
    /// Select another pattern of the current part
    SelectPattern(i32),
    /// Select another part of the current song
    SelectPart(i32),
    /// Select another song
    SelectSong(i32),

    // UI
    /// Save the project
    Save,
    /// Toggle help display
    ToggleHelp,
    /// Quit application
    Quit,
}

impl ControlAction {
    /// Whether the action only does something in edit mode. Piano keys
    /// still sound with edit off, so they are not included.
    pub fn needs_edit(&self) -> bool {
        matches!(self, ControlAction::HexDigit(_) | ControlAction::ClearCell)
    }
}
