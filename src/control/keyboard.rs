// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Keyboard shortcut handling.
//!
//! Two rows of the keyboard form a two-octave piano. Hex digits edit the
//! nibble under the cursor and win over piano keys on those columns. Plain
//! `q` quits only while edit mode is off, since it is a piano key otherwise.

use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyModifiers};

use super::ControlAction;
use crate::project::PlayMode;

/// Lower piano row, C to B
const LOWER_OCTAVE: [char; 12] = ['z', 's', 'x', 'd', 'c', 'v', 'g', 'b', 'h', 'n', 'j', 'm'];

/// Upper piano row, C to B one octave up
const UPPER_OCTAVE: [char; 12] = ['q', '2', 'w', '3', 'e', 'r', '5', 't', '6', 'y', '7', 'u'];

/// Highest selectable keyboard octave
pub const MAX_OCTAVE: u8 = 9;

/// Rows moved by PageUp/PageDown
const PAGE_ROWS: i32 = 16;

/// A keyboard shortcut definition
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shortcut {
    /// Key code
    pub code: KeyCode,
    /// Required modifiers
    pub modifiers: KeyModifiers,
}

impl Shortcut {
    /// Create a new shortcut
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    /// Create a shortcut with no modifiers
    pub fn key(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::NONE)
    }

    /// Create a shortcut with Ctrl modifier
    pub fn ctrl(code: KeyCode) -> Self {
        Self::new(code, KeyModifiers::CONTROL)
    }

    /// Check if this shortcut matches a key event
    pub fn matches(&self, code: KeyCode, modifiers: KeyModifiers) -> bool {
        let (code, modifiers) = normalize(code, modifiers);
        self.code == code && self.modifiers == modifiers
    }
}

/// A keyboard binding (shortcut to action)
#[derive(Debug, Clone)]
pub struct KeyBinding {
    /// The shortcut
    pub shortcut: Shortcut,
    /// The action to perform
    pub action: ControlAction,
    /// Description for help display
    pub description: String,
    /// Category for grouping in help
    pub category: String,
}

impl KeyBinding {
    /// Create a new key binding
    pub fn new(shortcut: Shortcut, action: ControlAction, description: impl Into<String>) -> Self {
        Self {
            shortcut,
            action,
            description: description.into(),
            category: "General".to_string(),
        }
    }

    /// Set the category
    pub fn category(mut self, cat: impl Into<String>) -> Self {
        self.category = cat.into();
        self
    }
}

/// Editor state a key is interpreted against
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyContext {
    /// Edit mode is on
    pub editing: bool,
    /// The cursor sits on a velocity, command or parameter nibble
    pub nibble: bool,
}

/// Keyboard controller with configurable bindings
#[derive(Debug, Clone)]
pub struct KeyboardController {
    bindings: HashMap<Shortcut, KeyBinding>,
    /// Bindings that replace the main ones while edit mode is off
    idle: HashMap<Shortcut, KeyBinding>,
    octave: u8,
    velocity: u8,
}

impl KeyboardController {
    /// Create an empty keyboard controller
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
            idle: HashMap::new(),
            octave: 4,
            velocity: 100,
        }
    }

    /// Create a keyboard controller with default bindings
    pub fn with_defaults() -> Self {
        let mut controller = Self::new();
        controller.add_default_bindings();
        controller
    }

    /// Builder: starting octave and entry velocity
    pub fn with_entry(mut self, octave: u8, velocity: u8) -> Self {
        self.octave = octave.min(MAX_OCTAVE);
        self.velocity = velocity.clamp(1, 127);
        self
    }

    fn add_default_bindings(&mut self) {
        // Piano
        for (offset, c) in LOWER_OCTAVE.iter().chain(UPPER_OCTAVE.iter()).enumerate() {
            self.add(
                KeyBinding::new(
                    Shortcut::key(KeyCode::Char(*c)),
                    ControlAction::NoteKey(offset as u8),
                    format!("Note +{}", offset),
                )
                .category("Notes"),
            );
        }

        self.add(KeyBinding::new(Shortcut::key(KeyCode::Char('+')), ControlAction::OctaveUp, "Octave Up").category("Notes"));
        self.add(KeyBinding::new(Shortcut::key(KeyCode::Char('=')), ControlAction::OctaveUp, "Octave Up").category("Notes"));
        self.add(KeyBinding::new(Shortcut::key(KeyCode::Char('-')), ControlAction::OctaveDown, "Octave Down").category("Notes"));

        // Transport
        let modes = [
            (5, PlayMode::PlayProject, "Play Project"),
            (6, PlayMode::PlaySong, "Play Song"),
            (7, PlayMode::PlayPart, "Play Part"),
            (8, PlayMode::PlayPattern, "Play Pattern"),
        ];
        for (key, mode, description) in modes {
            self.add(
                KeyBinding::new(Shortcut::key(KeyCode::F(key)), ControlAction::Play(mode), description)
                    .category("Transport"),
            );
        }
        self.add(KeyBinding::new(Shortcut::key(KeyCode::Esc), ControlAction::Stop, "Stop").category("Transport"));
        self.add(
            KeyBinding::new(Shortcut::ctrl(KeyCode::Up), ControlAction::AdjustTempo(1), "Tempo +1")
                .category("Transport"),
        );
        self.add(
            KeyBinding::new(Shortcut::ctrl(KeyCode::Down), ControlAction::AdjustTempo(-1), "Tempo -1")
                .category("Transport"),
        );

        // Editing
        self.add(KeyBinding::new(Shortcut::key(KeyCode::Char(' ')), ControlAction::ToggleEdit, "Toggle Edit").category("Editing"));
        self.add(KeyBinding::new(Shortcut::key(KeyCode::Delete), ControlAction::ClearCell, "Clear Cell").category("Editing"));
        self.add(KeyBinding::new(Shortcut::key(KeyCode::Backspace), ControlAction::ClearCell, "Clear Cell").category("Editing"));

        // Navigation
        let moves = [
            (KeyCode::Up, -1, 0, "Row Up"),
            (KeyCode::Down, 1, 0, "Row Down"),
            (KeyCode::Left, 0, -1, "Column Left"),
            (KeyCode::Right, 0, 1, "Column Right"),
            (KeyCode::PageUp, -PAGE_ROWS, 0, "Page Up"),
            (KeyCode::PageDown, PAGE_ROWS, 0, "Page Down"),
        ];
        for (code, rows, columns, description) in moves {
            self.add(
                KeyBinding::new(Shortcut::key(code), ControlAction::MoveCursor { rows, columns }, description)
                    .category("Navigation"),
            );
        }
        self.add(KeyBinding::new(Shortcut::key(KeyCode::Tab), ControlAction::NextTrack, "Next Track").category("Navigation"));
        self.add(KeyBinding::new(Shortcut::key(KeyCode::BackTab), ControlAction::PrevTrack, "Previous Track").category("Navigation"));
        self.add(KeyBinding::new(Shortcut::key(KeyCode::Char(']')), ControlAction::SelectPattern(1), "Next Pattern").category("Navigation"));
        self.add(KeyBinding::new(Shortcut::key(KeyCode::Char('[')), ControlAction::SelectPattern(-1), "Previous Pattern").category("Navigation"));
        self.add(KeyBinding::new(Shortcut::key(KeyCode::Char('}')), ControlAction::SelectPart(1), "Next Part").category("Navigation"));
        self.add(KeyBinding::new(Shortcut::key(KeyCode::Char('{')), ControlAction::SelectPart(-1), "Previous Part").category("Navigation"));
        self.add(KeyBinding::new(Shortcut::ctrl(KeyCode::Right), ControlAction::SelectSong(1), "Next Song").category("Navigation"));
        self.add(KeyBinding::new(Shortcut::ctrl(KeyCode::Left), ControlAction::SelectSong(-1), "Previous Song").category("Navigation"));

        // UI
        self.add(KeyBinding::new(Shortcut::ctrl(KeyCode::Char('s')), ControlAction::Save, "Save").category("UI"));
        self.add(KeyBinding::new(Shortcut::key(KeyCode::Char('?')), ControlAction::ToggleHelp, "Toggle Help").category("UI"));
        self.add(KeyBinding::new(Shortcut::key(KeyCode::F(1)), ControlAction::ToggleHelp, "Toggle Help").category("UI"));
        self.add(KeyBinding::new(Shortcut::ctrl(KeyCode::Char('c')), ControlAction::Quit, "Quit").category("UI"));
        self.add(KeyBinding::new(Shortcut::ctrl(KeyCode::Char('q')), ControlAction::Quit, "Quit").category("UI"));

        self.idle.insert(
            Shortcut::key(KeyCode::Char('q')),
            KeyBinding::new(Shortcut::key(KeyCode::Char('q')), ControlAction::Quit, "Quit (edit off)").category("UI"),
        );
    }

    /// Add a key binding
    pub fn add(&mut self, binding: KeyBinding) {
        self.bindings.insert(binding.shortcut.clone(), binding);
    }

    /// Get action for a key event, ignoring editor state
    pub fn get_action(&self, code: KeyCode, modifiers: KeyModifiers) -> Option<&ControlAction> {
        let (code, modifiers) = normalize(code, modifiers);
        self.bindings.get(&Shortcut::new(code, modifiers)).map(|b| &b.action)
    }

    /// Resolve a key event against the editor state
    pub fn process_key(&self, code: KeyCode, modifiers: KeyModifiers, ctx: KeyContext) -> Option<ControlAction> {
        let (code, modifiers) = normalize(code, modifiers);

        if ctx.nibble && modifiers == KeyModifiers::NONE {
            if let KeyCode::Char(c) = code {
                if let Some(digit) = c.to_digit(16) {
                    return Some(ControlAction::HexDigit(digit as u8));
                }
            }
        }

        let shortcut = Shortcut::new(code, modifiers);
        if !ctx.editing {
            if let Some(binding) = self.idle.get(&shortcut) {
                return Some(binding.action);
            }
        }
        self.bindings.get(&shortcut).map(|b| b.action)
    }

    /// MIDI key for a piano offset at the current octave. Key 0 is reserved
    /// for "no note", so the lowest C is never produced.
    pub fn note_key(&self, offset: u8) -> Option<u8> {
        let key = self.octave as u16 * 12 + offset as u16;
        (1..=127).contains(&key).then_some(key as u8)
    }

    /// Current octave
    pub fn octave(&self) -> u8 {
        self.octave
    }

    /// Velocity for notes played on the keyboard
    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    /// Raise the octave, saturating
    pub fn octave_up(&mut self) {
        self.octave = (self.octave + 1).min(MAX_OCTAVE);
    }

    /// Lower the octave, saturating
    pub fn octave_down(&mut self) {
        self.octave = self.octave.saturating_sub(1);
    }

    /// Get all bindings for help display
    pub fn bindings(&self) -> impl Iterator<Item = &KeyBinding> {
        self.bindings.values().chain(self.idle.values())
    }

    /// Get bindings grouped by category
    pub fn bindings_by_category(&self) -> HashMap<String, Vec<&KeyBinding>> {
        let mut grouped: HashMap<String, Vec<&KeyBinding>> = HashMap::new();

        for binding in self.bindings() {
            grouped
                .entry(binding.category.clone())
                .or_default()
                .push(binding);
        }

        grouped
    }
}

impl Default for KeyboardController {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Terminals disagree on whether shifted characters carry SHIFT
fn normalize(code: KeyCode, modifiers: KeyModifiers) -> (KeyCode, KeyModifiers) {
    match code {
        KeyCode::Char(_) | KeyCode::BackTab => (code, modifiers.difference(KeyModifiers::SHIFT)),
        _ => (code, modifiers),
    }
}

/// Format a shortcut for display
pub fn format_shortcut(shortcut: &Shortcut) -> String {
    let mut parts = Vec::new();

    if shortcut.modifiers.contains(KeyModifiers::CONTROL) {
        parts.push("Ctrl");
    }
    if shortcut.modifiers.contains(KeyModifiers::ALT) {
        parts.push("Alt");
    }
    if shortcut.modifiers.contains(KeyModifiers::SHIFT) {
        parts.push("Shift");
    }

    let key = match shortcut.code {
        KeyCode::Char(' ') => "Space".to_string(),
        KeyCode::Char(c) => c.to_uppercase().to_string(),
        KeyCode::F(n) => format!("F{}", n),
        KeyCode::Up => "↑".to_string(),
        KeyCode::Down => "↓".to_string(),
        KeyCode::Left => "←".to_string(),
        KeyCode::Right => "→".to_string(),
        KeyCode::Esc => "Esc".to_string(),
        KeyCode::Tab => "Tab".to_string(),
        KeyCode::BackTab => "Shift+Tab".to_string(),
        KeyCode::Backspace => "Backspace".to_string(),
        KeyCode::Delete => "Delete".to_string(),
        KeyCode::PageUp => "PageUp".to_string(),
        KeyCode::PageDown => "PageDown".to_string(),
        _ => "?".to_string(),
    };

    parts.push(&key);
    parts.join("+")
}
