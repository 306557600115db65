// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Studio catalog of devices and instruments.
//!
//! The studio describes the MIDI gear a project plays through. Each device
//! has a MIDI channel and a list of instruments; each instrument exposes a
//! number of note slots (polyphony) and effect slots (parameters) per row.
//! The catalog is read-only while the sequencer runs.

use crate::error::EngineError;
use crate::index::{DeviceIdx, InstrumentIdx, SettingIdx, MAX_PARAMETERS, MAX_POLYPHONY};

/// A named patch/setting of an instrument
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Setting {
    /// Setting name
    pub name: String,
    /// Program number to select on the device
    pub program: u8,
}

impl Setting {
    /// Create a new setting
    pub fn new(name: impl Into<String>, program: u8) -> Self {
        Self {
            name: name.into(),
            program,
        }
    }
}

/// An instrument exposed by a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    /// Instrument name
    pub name: String,
    /// Note slots per row
    pub polyphony: u8,
    /// Effect slots per row
    pub parameters: u8,
    /// Named settings
    pub settings: Vec<Setting>,
}

impl Default for Instrument {
    fn default() -> Self {
        Self {
            name: "Instrument".to_string(),
            polyphony: 1,
            parameters: 0,
            settings: Vec::new(),
        }
    }
}

impl Instrument {
    /// Create a new instrument
    pub fn new(name: impl Into<String>, polyphony: u8, parameters: u8) -> Self {
        Self {
            name: name.into(),
            polyphony,
            parameters,
            settings: Vec::new(),
        }
    }

    /// Builder: add a setting
    pub fn with_setting(mut self, setting: Setting) -> Self {
        self.settings.push(setting);
        self
    }

    /// Check the voice layout fits the row storage limits
    pub fn validate(&self) -> Result<(), EngineError> {
        let reason = if self.polyphony == 0 {
            "polyphony must be at least 1"
        } else if self.polyphony as usize > MAX_POLYPHONY {
            "polyphony exceeds 16"
        } else if self.parameters as usize > MAX_PARAMETERS {
            "parameters exceed 16"
        } else {
            return Ok(());
        };
        Err(EngineError::InvalidInstrument {
            name: self.name.clone(),
            reason,
        })
    }
}

/// A MIDI device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Device name
    pub name: String,
    /// MIDI channel (0-15)
    pub channel: u8,
    /// Instruments on this device
    pub instruments: Vec<Instrument>,
}

impl Default for Device {
    fn default() -> Self {
        Self {
            name: "Device".to_string(),
            channel: 0,
            instruments: Vec::new(),
        }
    }
}

impl Device {
    /// Create a new device on a channel
    pub fn new(name: impl Into<String>, channel: u8) -> Self {
        Self {
            name: name.into(),
            channel: channel.min(15),
            instruments: Vec::new(),
        }
    }

    /// Builder: add an instrument
    pub fn with_instrument(mut self, instrument: Instrument) -> Self {
        self.instruments.push(instrument);
        self
    }
}

/// Shape of one track's row storage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceLayout {
    /// Note slots
    pub notes: usize,
    /// Effect slots
    pub effects: usize,
}

/// The studio catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Studio {
    /// Studio name
    pub name: String,
    /// Devices
    pub devices: Vec<Device>,
}

impl Default for Studio {
    fn default() -> Self {
        Self {
            name: "Default Studio".to_string(),
            devices: vec![
                Device::new("General MIDI", 0).with_instrument(
                    Instrument::new("Piano", 2, 1)
                        .with_setting(Setting::new("Grand", 0))
                        .with_setting(Setting::new("Bright", 1)),
                ),
                Device::new("Drums", 9).with_instrument(
                    Instrument::new("Kit", 4, 2).with_setting(Setting::new("Standard", 0)),
                ),
            ],
        }
    }
}

impl Studio {
    /// Create an empty studio
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            devices: Vec::new(),
        }
    }

    /// Builder: add a device
    pub fn with_device(mut self, device: Device) -> Self {
        self.devices.push(device);
        self
    }

    /// Number of devices
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Look up a device
    pub fn device(&self, device: DeviceIdx) -> Result<&Device, EngineError> {
        self.devices
            .get(device.get())
            .ok_or_else(|| EngineError::out_of_range("device", device.get(), self.devices.len()))
    }

    /// Look up an instrument of a device
    pub fn instrument(
        &self,
        device: DeviceIdx,
        instrument: InstrumentIdx,
    ) -> Result<&Instrument, EngineError> {
        let dev = self.device(device)?;
        dev.instruments.get(instrument.get()).ok_or_else(|| {
            EngineError::out_of_range("instrument", instrument.get(), dev.instruments.len())
        })
    }

    /// Note slots the instrument exposes per row
    pub fn polyphony(&self, device: DeviceIdx, instrument: InstrumentIdx) -> Result<usize, EngineError> {
        Ok(self.instrument(device, instrument)?.polyphony as usize)
    }

    /// Effect slots the instrument exposes per row
    pub fn parameters(&self, device: DeviceIdx, instrument: InstrumentIdx) -> Result<usize, EngineError> {
        Ok(self.instrument(device, instrument)?.parameters as usize)
    }

    /// MIDI channel of a device
    pub fn channel(&self, device: DeviceIdx) -> Result<u8, EngineError> {
        Ok(self.device(device)?.channel)
    }

    /// Row storage shape for an instrument
    pub fn layout(&self, device: DeviceIdx, instrument: InstrumentIdx) -> Result<VoiceLayout, EngineError> {
        let inst = self.instrument(device, instrument)?;
        Ok(VoiceLayout {
            notes: inst.polyphony as usize,
            effects: inst.parameters as usize,
        })
    }

    /// Setting name, for display
    pub fn setting_name(
        &self,
        device: DeviceIdx,
        instrument: InstrumentIdx,
        setting: SettingIdx,
    ) -> Option<&str> {
        self.instrument(device, instrument)
            .ok()?
            .settings
            .get(setting.get())
            .map(|s| s.name.as_str())
    }

    /// Check every device and instrument
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.devices.len() > DeviceIdx::CAPACITY {
            return Err(EngineError::CapacityExceeded {
                what: "device list",
                capacity: DeviceIdx::CAPACITY,
            });
        }
        for device in &self.devices {
            if device.channel > 15 {
                return Err(EngineError::InvalidInstrument {
                    name: device.name.clone(),
                    reason: "device channel must be 0-15",
                });
            }
            if device.instruments.is_empty() {
                return Err(EngineError::InvalidInstrument {
                    name: device.name.clone(),
                    reason: "device has no instruments",
                });
            }
            if device.instruments.len() > InstrumentIdx::CAPACITY {
                return Err(EngineError::CapacityExceeded {
                    what: "instrument list",
                    capacity: InstrumentIdx::CAPACITY,
                });
            }
            for instrument in &device.instruments {
                instrument.validate()?;
            }
        }
        if self.devices.is_empty() {
            return Err(EngineError::out_of_range("device", 0, 0));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_studio_queries() {
        let studio = Studio::default();
        studio.validate().unwrap();

        let gm = DeviceIdx::ZERO;
        let drums = DeviceIdx::new(1).unwrap();
        assert_eq!(studio.polyphony(gm, InstrumentIdx::ZERO).unwrap(), 2);
        assert_eq!(studio.parameters(gm, InstrumentIdx::ZERO).unwrap(), 1);
        assert_eq!(studio.channel(drums).unwrap(), 9);
        assert_eq!(
            studio.setting_name(gm, InstrumentIdx::ZERO, SettingIdx::new(1).unwrap()),
            Some("Bright")
        );
    }

    #[test]
    fn test_out_of_range_lookup() {
        let studio = Studio::default();
        let missing = DeviceIdx::new(5).unwrap();
        assert_eq!(
            studio.channel(missing),
            Err(EngineError::out_of_range("device", 5, 2))
        );
        assert!(studio
            .polyphony(DeviceIdx::ZERO, InstrumentIdx::new(3).unwrap())
            .is_err());
    }

    #[test]
    fn test_validation_rejects_bad_layout() {
        let studio = Studio::new("Bad")
            .with_device(Device::new("Synth", 0).with_instrument(Instrument::new("Mute", 0, 0)));
        assert!(matches!(
            studio.validate(),
            Err(EngineError::InvalidInstrument { .. })
        ));

        let studio = Studio::new("Wide")
            .with_device(Device::new("Synth", 0).with_instrument(Instrument::new("Huge", 4, 17)));
        assert!(studio.validate().is_err());
    }

    #[test]
    fn test_device_channel_clamped() {
        let device = Device::new("Out", 20);
        assert_eq!(device.channel, 15);

        let mut studio = Studio::default();
        studio.devices[0].channel = 16;
        assert_eq!(
            studio.validate(),
            Err(EngineError::InvalidInstrument {
                name: "General MIDI".to_string(),
                reason: "device channel must be 0-15",
            })
        );
    }
}
