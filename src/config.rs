//! Configuration management for solarman-modbus
//!
//! This module handles loading, validation, and saving of the application
//! configuration from YAML files. Besides transport and logging settings the
//! file may declare extra device register maps, which are merged into the
//! built-in catalog.

use crate::catalog::{DeviceCatalog, DeviceDefinition, LSW3};
use crate::error::{Result, SolarmanError};
use crate::logging::parse_log_level;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;

/// Largest quantity a single Modbus read-holding-registers request may ask for
pub const MODBUS_MAX_READ_QUANTITY: u16 = 125;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Modbus TCP connection configuration
    pub modbus: ModbusConfig,

    /// Device model to poll, e.g. `LSW-3`
    pub device: String,

    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Additional device register maps
    pub devices: Vec<DeviceDefinition>,
}

/// Modbus TCP connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModbusConfig {
    /// IP address of the logger
    pub ip: String,

    /// TCP port (typically 502)
    pub port: u16,

    /// Modbus unit identifier of the inverter behind the logger
    pub slave_id: u8,

    /// Largest number of registers requested in one read
    pub max_registers_per_read: u16,

    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,

    /// Per-request timeout in milliseconds
    pub read_timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Console level override
    pub console_level: Option<String>,

    /// File level override
    pub file_level: Option<String>,

    /// Path to log file; its directory receives the daily rotated files
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to log to file
    pub file_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the first default location that exists
    pub fn load() -> Result<Self> {
        let default_paths = [
            "solarman_config.yaml",
            "/data/solarman_config.yaml",
            "/etc/solarman-modbus/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        // Fall back to default configuration
        Ok(Config::default())
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Built-in catalog merged with the configured devices
    pub fn catalog(&self) -> Result<DeviceCatalog> {
        DeviceCatalog::builtin()?.with_devices(self.devices.iter().cloned())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.modbus.ip.is_empty() {
            return Err(SolarmanError::validation(
                "modbus.ip",
                "IP address cannot be empty",
            ));
        }

        if self.modbus.port == 0 {
            return Err(SolarmanError::validation(
                "modbus.port",
                "Port must be greater than 0",
            ));
        }

        if self.modbus.max_registers_per_read == 0
            || self.modbus.max_registers_per_read > MODBUS_MAX_READ_QUANTITY
        {
            return Err(SolarmanError::validation(
                "modbus.max_registers_per_read",
                "Must be between 1 and 125",
            ));
        }

        if self.modbus.connect_timeout_ms == 0 || self.modbus.read_timeout_ms == 0 {
            return Err(SolarmanError::validation(
                "modbus.timeouts",
                "Must be greater than 0",
            ));
        }

        if self.poll_interval_ms == 0 {
            return Err(SolarmanError::validation(
                "poll_interval_ms",
                "Must be greater than 0",
            ));
        }

        parse_log_level(&self.logging.level)?;
        for level in [&self.logging.console_level, &self.logging.file_level]
            .into_iter()
            .flatten()
        {
            parse_log_level(level)?;
        }

        if self.device.trim().is_empty() {
            return Err(SolarmanError::validation("device", "Cannot be empty"));
        }

        // Device definitions must pass catalog validation and the selected
        // model must exist once they are merged
        self.catalog()?.device(&self.device)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.modbus.port, 502);
        assert_eq!(config.modbus.slave_id, 1);
        assert_eq!(config.device, LSW3);
        assert_eq!(config.poll_interval_ms, 60_000);
        assert!(config.devices.is_empty());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        // Test invalid IP
        config.modbus.ip = String::new();
        assert!(config.validate().is_err());

        // Reset and test oversized read
        config = Config::default();
        config.modbus.max_registers_per_read = 126;
        assert!(config.validate().is_err());

        // Reset and test unknown device
        config = Config::default();
        config.device = "LSW-9".to_string();
        assert!(matches!(
            config.validate(),
            Err(SolarmanError::UnknownDevice { .. })
        ));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = "modbus:\n  ip: 10.1.2.3\n";
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.modbus.ip, "10.1.2.3");
        assert_eq!(config.modbus.port, 502);
        assert_eq!(config.logging.level, "INFO");
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let yaml = serde_yaml::to_string(&config).unwrap();
        let deserialized: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.modbus.port, deserialized.modbus.port);
        assert_eq!(config.device, deserialized.device);
    }
}
