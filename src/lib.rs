//! # Solarman-Modbus - register decoding for solar inverter loggers
//!
//! Reads telemetry from a solar inverter/battery logger over Modbus TCP and
//! maps raw holding-register words into named, scaled, typed sensor
//! readings for a home-automation platform.
//!
//! ## Architecture
//!
//! - `sensor`: sensor descriptors and their physical/aggregation classes
//! - `catalog`: per-device register maps, validated once and shared read-only
//! - `decoder`: pure register-block to reading conversion
//! - `modbus`: Modbus TCP transport behind the `RegisterSource` trait
//! - `poller`: one read-and-decode cycle per poll
//! - `config`: YAML configuration and validation
//! - `logging`: structured logging and tracing

pub mod catalog;
pub mod config;
pub mod decoder;
pub mod error;
pub mod logging;
pub mod modbus;
pub mod poller;
pub mod sensor;

// Re-export commonly used types
pub use catalog::{DeviceCatalog, DeviceDefinition};
pub use config::Config;
pub use decoder::{DecodeReport, DecodedReading, ReadingValue, decode, decode_partial};
pub use error::{Result, SolarmanError};
pub use sensor::{DeviceClass, SensorDescriptor, StateClass};
