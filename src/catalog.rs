//! Device catalog
//!
//! Maps each supported device model to its ordered register map. The
//! catalog is validated once when it is built and is read-only afterwards,
//! so it can be shared behind an `Arc` by any number of readers.

use crate::error::{Result, SolarmanError};
use crate::sensor::{DeviceClass, SensorDescriptor, StateClass};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Model identifier of the LSW-3 stick logger
pub const LSW3: &str = "LSW-3";

/// First register of the LSW-3 telemetry block
pub const LSW3_BASE_REGISTER: u16 = 0x20c;

/// Register map of one device model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDefinition {
    /// Model identifier, e.g. `LSW-3`
    pub model: String,

    /// Register the telemetry block is read from
    pub base_register: u16,

    /// Sensors in ascending register order
    pub sensors: Vec<SensorDescriptor>,
}

/// Contiguous span of holding registers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterWindow {
    pub start: u16,
    pub count: u32,
}

impl RegisterWindow {
    /// Split into consecutive requests of at most `max` registers
    pub fn chunks(&self, max: u16) -> Vec<(u16, u16)> {
        let max = u32::from(max.max(1));
        let mut out = Vec::new();
        let mut done = 0u32;
        while done < self.count {
            let quantity = (self.count - done).min(max);
            // start + count never exceeds 0x10000, so every chunk start fits
            let address = (u32::from(self.start) + done) as u16;
            out.push((address, quantity as u16));
            done += quantity;
        }
        out
    }
}

impl DeviceDefinition {
    /// Window covering the base register through the end of the last sensor
    pub fn read_window(&self) -> RegisterWindow {
        let end = self
            .sensors
            .iter()
            .map(SensorDescriptor::end_offset)
            .max()
            .unwrap_or(u32::from(self.base_register));
        RegisterWindow {
            start: self.base_register,
            count: end.saturating_sub(u32::from(self.base_register)),
        }
    }

    /// Look up a sensor by name
    pub fn sensor(&self, name: &str) -> Option<&SensorDescriptor> {
        self.sensors.iter().find(|s| s.name == name)
    }

    fn validate(&self) -> Result<()> {
        let fail = |sensor: &str, message: String| {
            Err(SolarmanError::catalog_ordering(
                self.model.clone(),
                sensor.to_string(),
                message,
            ))
        };

        if self.model.trim().is_empty() {
            return fail("", "model name cannot be empty".to_string());
        }
        if self.sensors.is_empty() {
            return fail("", "device declares no sensors".to_string());
        }

        let mut names = HashSet::new();
        let mut previous: Option<&SensorDescriptor> = None;

        for sensor in &self.sensors {
            if sensor.name.trim().is_empty() {
                return fail(
                    &sensor.name,
                    format!("sensor at 0x{:04x} has no name", sensor.register_offset),
                );
            }
            if !names.insert(sensor.name.as_str()) {
                return fail(&sensor.name, "duplicate sensor name".to_string());
            }
            if sensor.word_count == 0 {
                return fail(&sensor.name, "word_count must be at least 1".to_string());
            }
            if !sensor.scale.is_finite() {
                return fail(&sensor.name, format!("scale {} is not finite", sensor.scale));
            }
            if sensor.register_offset < self.base_register {
                return fail(
                    &sensor.name,
                    format!(
                        "register 0x{:04x} lies below base register 0x{:04x}",
                        sensor.register_offset, self.base_register
                    ),
                );
            }
            if sensor.end_offset() > 0x1_0000 {
                return fail(&sensor.name, "extends past register 0xffff".to_string());
            }
            if let Some(prev) = previous {
                if sensor.register_offset < prev.register_offset {
                    return fail(
                        &sensor.name,
                        format!(
                            "register 0x{:04x} declared after 0x{:04x} ('{}')",
                            sensor.register_offset, prev.register_offset, prev.name
                        ),
                    );
                }
                if prev.end_offset() > u32::from(sensor.register_offset) {
                    return fail(
                        &sensor.name,
                        format!(
                            "register 0x{:04x} overlaps '{}' (0x{:04x}, {} words)",
                            sensor.register_offset,
                            prev.name,
                            prev.register_offset,
                            prev.word_count
                        ),
                    );
                }
            }
            previous = Some(sensor);
        }

        Ok(())
    }
}

/// Immutable set of device register maps
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceCatalog {
    devices: BTreeMap<String, DeviceDefinition>,
}

impl DeviceCatalog {
    /// Build a catalog, validating every device
    pub fn new<I>(devices: I) -> Result<Self>
    where
        I: IntoIterator<Item = DeviceDefinition>,
    {
        let mut map = BTreeMap::new();
        for device in devices {
            device.validate()?;
            if map.contains_key(&device.model) {
                return Err(SolarmanError::catalog_ordering(
                    device.model.clone(),
                    String::new(),
                    "device model registered twice".to_string(),
                ));
            }
            map.insert(device.model.clone(), device);
        }
        Ok(Self { devices: map })
    }

    /// The shipped register maps
    pub fn builtin() -> Result<Self> {
        Self::new([lsw3()])
    }

    /// Add user-defined devices; a definition for an existing model
    /// replaces it
    pub fn with_devices<I>(mut self, extra: I) -> Result<Self>
    where
        I: IntoIterator<Item = DeviceDefinition>,
    {
        let mut seen = HashSet::new();
        for device in extra {
            device.validate()?;
            if !seen.insert(device.model.clone()) {
                return Err(SolarmanError::catalog_ordering(
                    device.model.clone(),
                    String::new(),
                    "device model registered twice".to_string(),
                ));
            }
            self.devices.insert(device.model.clone(), device);
        }
        Ok(self)
    }

    /// Full definition of a model
    pub fn device(&self, model: &str) -> Result<&DeviceDefinition> {
        self.devices
            .get(model)
            .ok_or_else(|| SolarmanError::unknown_device(model))
    }

    /// Ordered sensors of a model
    pub fn descriptors_for(&self, model: &str) -> Result<&[SensorDescriptor]> {
        self.device(model).map(|d| d.sensors.as_slice())
    }

    /// Registered model identifiers, sorted
    pub fn models(&self) -> Vec<&str> {
        self.devices.keys().map(String::as_str).collect()
    }
}

fn lsw3() -> DeviceDefinition {
    use DeviceClass::{Energy, Frequency, Power, Temperature};
    use StateClass::{Measurement, TotalIncreasing};

    let sensor = SensorDescriptor::new;

    let sensors = vec![
        sensor("Inverter Frequency", Some(Frequency), Measurement, Some("Hz"), 0x20c)
            .with_scale(0.01),
        sensor("Battery Charge/Discharge", Some(Power), Measurement, Some("W"), 0x20d)
            .with_scale(10.0)
            .with_suspect("bidirectional flow declared unsigned"),
        sensor("Battery Charge", Some(Energy), Measurement, Some("kWh"), 0x210),
        sensor("Battery Temp", Some(Temperature), Measurement, Some("°C"), 0x211),
        sensor("Grid Power IO", Some(Power), Measurement, Some("W"), 0x212)
            .with_signed(true)
            .with_scale(-10.0),
        sensor("House Consumption", Some(Power), Measurement, Some("W"), 0x213).with_scale(10.0),
        sensor("PV Power", Some(Power), Measurement, Some("W"), 0x215).with_scale(10.0),
        sensor("Today Generated Power", Some(Energy), TotalIncreasing, Some("kWh"), 0x218)
            .with_scale(0.01),
        sensor("Today Sold Power", Some(Energy), TotalIncreasing, Some("kWh"), 0x219)
            .with_scale(0.01),
        sensor("Today Bought Power", Some(Energy), TotalIncreasing, Some("kWh"), 0x21a)
            .with_scale(0.01),
        sensor("Today Consumption Power", Some(Energy), TotalIncreasing, Some("kWh"), 0x21b)
            .with_scale(0.01),
        sensor("Battery Cycles", None, TotalIncreasing, None, 0x22c),
        sensor("Inverter Temp", Some(Temperature), Measurement, Some("°C"), 0x238),
        sensor("Inverter Heatsink Temp", Some(Temperature), Measurement, Some("°C"), 0x239),
    ];

    DeviceDefinition {
        model: LSW3.to_string(),
        base_register: LSW3_BASE_REGISTER,
        sensors,
    }
}
