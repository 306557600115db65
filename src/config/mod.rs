// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Front-end settings.
//!
//! Settings come from an optional `trak.yaml` in the working directory.
//! Every field has a default, so a partial file is fine and a missing file
//! means all defaults.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::project::DEFAULT_ROWS;

/// Default settings file name
pub const SETTINGS_FILE: &str = "trak.yaml";

/// Root settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// Studio file loaded when none is given on the command line
    #[serde(default)]
    pub studio: Option<PathBuf>,
    /// Input poll timeout in milliseconds
    #[serde(default = "default_poll_ms")]
    pub poll_ms: u64,
    /// Octave of the lower piano row
    #[serde(default = "default_octave")]
    pub octave: u8,
    /// Velocity of notes entered from the computer keyboard
    #[serde(default = "default_velocity")]
    pub velocity: u8,
    /// Echo input events to the output
    #[serde(default = "default_thru")]
    pub thru: bool,
    /// Rows of the pattern in a new project
    #[serde(default = "default_pattern_rows")]
    pub pattern_rows: usize,
    /// MIDI port selection
    #[serde(default)]
    pub midi: MidiSettings,
}

fn default_poll_ms() -> u64 {
    10
}
fn default_octave() -> u8 {
    4
}
fn default_velocity() -> u8 {
    100
}
fn default_thru() -> bool {
    true
}
fn default_pattern_rows() -> usize {
    DEFAULT_ROWS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            studio: None,
            poll_ms: default_poll_ms(),
            octave: default_octave(),
            velocity: default_velocity(),
            thru: default_thru(),
            pattern_rows: default_pattern_rows(),
            midi: MidiSettings::default(),
        }
    }
}

/// MIDI port names, matched by substring
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MidiSettings {
    /// Output port per studio device name
    #[serde(default)]
    pub outputs: HashMap<String, String>,
    /// Input port
    #[serde(default)]
    pub input: Option<String>,
}

impl Settings {
    /// Load settings from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read settings file: {:?}", path.as_ref()))?;
        Self::from_yaml(&contents)
    }

    /// Parse settings from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let settings: Settings =
            serde_yaml::from_str(yaml).context("Failed to parse YAML settings")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize to a YAML string
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize settings to YAML")
    }

    /// Save settings to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = self.to_yaml()?;
        fs::write(path.as_ref(), yaml)
            .with_context(|| format!("Failed to write settings file: {:?}", path.as_ref()))
    }

    /// Load settings, falling back to defaults. A missing file is silent;
    /// an unreadable or invalid one is logged.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(settings) => {
                info!("settings loaded from {:?}", path);
                settings
            }
            Err(e) => {
                warn!("ignoring settings: {:#}", e);
                Self::default()
            }
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.octave > 9 {
            anyhow::bail!("octave {} out of range 0-9", self.octave);
        }
        if self.velocity == 0 || self.velocity > 127 {
            anyhow::bail!("velocity {} out of range 1-127", self.velocity);
        }
        if self.pattern_rows == 0 || self.pattern_rows > 256 {
            anyhow::bail!("pattern_rows {} out of range 1-256", self.pattern_rows);
        }
        Ok(())
    }

    /// Output port configured for a device
    pub fn output_port(&self, device: &str) -> Option<&str> {
        self.midi.outputs.get(device).map(String::as_str)
    }
}
