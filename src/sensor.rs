//! Sensor descriptors
//!
//! A descriptor ties one named sensor to its place in the register map and
//! to the arithmetic needed to turn raw words into a value in `unit`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical quantity a sensor measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    Current,
    Duration,
    Energy,
    Frequency,
    Power,
    Temperature,
    Voltage,
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceClass::Current => "current",
            DeviceClass::Duration => "duration",
            DeviceClass::Energy => "energy",
            DeviceClass::Frequency => "frequency",
            DeviceClass::Power => "power",
            DeviceClass::Temperature => "temperature",
            DeviceClass::Voltage => "voltage",
        };
        f.write_str(s)
    }
}

/// How consecutive readings of a sensor relate to each other
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    /// Instantaneous value
    #[default]
    Measurement,
    /// Counter that only grows until it is reset
    TotalIncreasing,
}

impl fmt::Display for StateClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateClass::Measurement => f.write_str("measurement"),
            StateClass::TotalIncreasing => f.write_str("total_increasing"),
        }
    }
}

fn default_word_count() -> u16 {
    1
}

fn default_scale() -> f64 {
    1.0
}

/// Declaration of one sensor in a device's register map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorDescriptor {
    /// Human-readable sensor name, unique within a device
    pub name: String,

    /// Physical quantity, `None` for unit-less counters
    #[serde(default)]
    pub device_class: Option<DeviceClass>,

    /// Aggregation behaviour of the reading
    #[serde(default)]
    pub state_class: StateClass,

    /// Unit of the scaled value
    #[serde(default)]
    pub unit: Option<String>,

    /// Reinterpret the raw word as two's complement
    #[serde(default)]
    pub signed: bool,

    /// Absolute address of the first register
    pub register_offset: u16,

    /// Number of consecutive 16-bit registers
    #[serde(default = "default_word_count")]
    pub word_count: u16,

    /// Multiplier applied to the raw magnitude
    #[serde(default = "default_scale")]
    pub scale: f64,

    /// Note on an entry whose declaration is known to be questionable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suspect: Option<String>,
}

impl SensorDescriptor {
    /// Create an unsigned single-register descriptor with a scale of 1
    pub fn new(
        name: &str,
        device_class: Option<DeviceClass>,
        state_class: StateClass,
        unit: Option<&str>,
        register_offset: u16,
    ) -> Self {
        Self {
            name: name.to_string(),
            device_class,
            state_class,
            unit: unit.map(str::to_string),
            signed: false,
            register_offset,
            word_count: default_word_count(),
            scale: default_scale(),
            suspect: None,
        }
    }

    /// Set signedness
    pub fn with_signed(mut self, signed: bool) -> Self {
        self.signed = signed;
        self
    }

    /// Set the scale factor
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Set the register width
    pub fn with_word_count(mut self, word_count: u16) -> Self {
        self.word_count = word_count;
        self
    }

    /// Mark the entry as suspect
    pub fn with_suspect(mut self, note: &str) -> Self {
        self.suspect = Some(note.to_string());
        self
    }

    /// One past the last register this descriptor occupies
    pub fn end_offset(&self) -> u32 {
        u32::from(self.register_offset) + u32::from(self.word_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_fields_are_omitted() {
        let yaml = "name: Battery Cycles\nregister_offset: 0x22c\n";
        let d: SensorDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(d.register_offset, 0x22c);
        assert_eq!(d.word_count, 1);
        assert_eq!(d.scale, 1.0);
        assert!(!d.signed);
        assert_eq!(d.device_class, None);
        assert_eq!(d.unit, None);
        assert_eq!(d.state_class, StateClass::Measurement);
    }

    #[test]
    fn classes_use_snake_case() {
        let yaml = "name: Today Sold Power\ndevice_class: energy\n\
                    state_class: total_increasing\nunit: kWh\n\
                    register_offset: 537\nscale: 0.01\n";
        let d: SensorDescriptor = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(d.device_class, Some(DeviceClass::Energy));
        assert_eq!(d.state_class, StateClass::TotalIncreasing);
        assert_eq!(d.state_class.to_string(), "total_increasing");
    }

    #[test]
    fn end_offset_does_not_wrap() {
        let d = SensorDescriptor::new("Edge", None, StateClass::Measurement, None, u16::MAX)
            .with_word_count(2);
        assert_eq!(d.end_offset(), 0x1_0001);
    }
}
