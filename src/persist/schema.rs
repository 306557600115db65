// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Field layout of every persisted structure.
//!
//! Cursors, playback mode and sounding keys are runtime state and are not
//! stored.

use anyhow::Result;

use super::{describe_all, key, Describe, Visitor};
use crate::arrangement::{Part, PartPatternRef, Song, SongPartRef};
use crate::index::{
    DeviceIdx, InstrumentIdx, PartIdx, PartPatternIdx, PatternIdx, RowIdx, SettingIdx, SongIdx,
    SongPartIdx, TrackIdx, MAX_PARAMETERS, MAX_POLYPHONY,
};
use crate::project::{Effect, Note, Pattern, PatternTrackBinding, Project, Row, Track, TrackRow};
use crate::studio::{Device, Instrument, Setting, Studio};

impl Describe for Setting {
    fn describe<V: Visitor>(&mut self, v: &mut V, prefix: &str) -> Result<()> {
        v.field(&key(prefix, "name"), &mut self.name)?;
        v.field(&key(prefix, "program"), &mut self.program)
    }
}

impl Describe for Instrument {
    fn describe<V: Visitor>(&mut self, v: &mut V, prefix: &str) -> Result<()> {
        v.field(&key(prefix, "name"), &mut self.name)?;
        v.field(&key(prefix, "polyphony"), &mut self.polyphony)?;
        v.field(&key(prefix, "parameters"), &mut self.parameters)?;
        describe_all(v, &key(prefix, "settings"), &mut self.settings, SettingIdx::CAPACITY)
    }
}

impl Describe for Device {
    fn describe<V: Visitor>(&mut self, v: &mut V, prefix: &str) -> Result<()> {
        v.field(&key(prefix, "name"), &mut self.name)?;
        v.field(&key(prefix, "channel"), &mut self.channel)?;
        describe_all(v, &key(prefix, "instruments"), &mut self.instruments, InstrumentIdx::CAPACITY)
    }
}

impl Describe for Studio {
    fn describe<V: Visitor>(&mut self, v: &mut V, prefix: &str) -> Result<()> {
        v.field(&key(prefix, "name"), &mut self.name)?;
        describe_all(v, &key(prefix, "devices"), &mut self.devices, DeviceIdx::CAPACITY)
    }
}

impl Describe for Note {
    fn describe<V: Visitor>(&mut self, v: &mut V, prefix: &str) -> Result<()> {
        v.field(&key(prefix, "key"), &mut self.key)?;
        v.field(&key(prefix, "velocity"), &mut self.velocity)
    }
}

impl Describe for Effect {
    fn describe<V: Visitor>(&mut self, v: &mut V, prefix: &str) -> Result<()> {
        v.field(&key(prefix, "command"), &mut self.command)?;
        v.field(&key(prefix, "parameter"), &mut self.parameter)
    }
}

impl Describe for TrackRow {
    fn describe<V: Visitor>(&mut self, v: &mut V, prefix: &str) -> Result<()> {
        describe_all(v, &key(prefix, "notes"), &mut self.notes, MAX_POLYPHONY)?;
        describe_all(v, &key(prefix, "effects"), &mut self.effects, MAX_PARAMETERS)
    }
}

impl Describe for Row {
    fn describe<V: Visitor>(&mut self, v: &mut V, prefix: &str) -> Result<()> {
        v.field(&key(prefix, "tempo"), &mut self.tempo)?;
        describe_all(v, &key(prefix, "tracks"), &mut self.tracks, TrackIdx::CAPACITY)
    }
}

impl Describe for PatternTrackBinding {
    fn describe<V: Visitor>(&mut self, v: &mut V, prefix: &str) -> Result<()> {
        v.field(&key(prefix, "instrument"), &mut self.instrument)?;
        v.field(&key(prefix, "setting"), &mut self.setting)
    }
}

impl Describe for Pattern {
    fn describe<V: Visitor>(&mut self, v: &mut V, prefix: &str) -> Result<()> {
        v.field(&key(prefix, "name"), &mut self.name)?;
        v.field(&key(prefix, "tempo"), &mut self.tempo)?;
        describe_all(v, &key(prefix, "bindings"), &mut self.bindings, TrackIdx::CAPACITY)?;
        describe_all(v, &key(prefix, "rows"), &mut self.rows, RowIdx::CAPACITY)
    }
}

impl Describe for Track {
    fn describe<V: Visitor>(&mut self, v: &mut V, prefix: &str) -> Result<()> {
        v.field(&key(prefix, "name"), &mut self.name)?;
        v.field(&key(prefix, "device"), &mut self.device)
    }
}

impl Describe for PartPatternRef {
    fn describe<V: Visitor>(&mut self, v: &mut V, prefix: &str) -> Result<()> {
        v.field(&key(prefix, "pattern"), &mut self.pattern)
    }
}

impl Describe for Part {
    fn describe<V: Visitor>(&mut self, v: &mut V, prefix: &str) -> Result<()> {
        v.field(&key(prefix, "name"), &mut self.name)?;
        v.field(&key(prefix, "tempo"), &mut self.tempo)?;
        describe_all(v, &key(prefix, "patterns"), &mut self.patterns, PartPatternIdx::CAPACITY)
    }
}

impl Describe for SongPartRef {
    fn describe<V: Visitor>(&mut self, v: &mut V, prefix: &str) -> Result<()> {
        v.field(&key(prefix, "part"), &mut self.part)
    }
}

impl Describe for Song {
    fn describe<V: Visitor>(&mut self, v: &mut V, prefix: &str) -> Result<()> {
        v.field(&key(prefix, "name"), &mut self.name)?;
        v.field(&key(prefix, "tempo"), &mut self.tempo)?;
        describe_all(v, &key(prefix, "parts"), &mut self.parts, SongPartIdx::CAPACITY)
    }
}

impl Describe for Project {
    fn describe<V: Visitor>(&mut self, v: &mut V, prefix: &str) -> Result<()> {
        v.field(&key(prefix, "name"), &mut self.name)?;
        v.field(&key(prefix, "tempo"), &mut self.tempo)?;
        v.field(&key(prefix, "quantization"), &mut self.quantization)?;
        describe_all(v, &key(prefix, "tracks"), &mut self.tracks, TrackIdx::CAPACITY)?;
        describe_all(v, &key(prefix, "patterns"), &mut self.patterns, PatternIdx::CAPACITY)?;
        describe_all(v, &key(prefix, "parts"), &mut self.parts, PartIdx::CAPACITY)?;
        describe_all(v, &key(prefix, "songs"), &mut self.songs, SongIdx::CAPACITY)
    }
}
