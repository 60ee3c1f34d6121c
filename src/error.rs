//! Error types and handling for solarman-modbus
//!
//! This module defines the error types used throughout the crate. The first
//! four variants are raised by the catalog and the decoder; the rest belong
//! to the configuration, logging and transport layers around them.

use thiserror::Error;

/// Result type alias for solarman-modbus operations
pub type Result<T> = std::result::Result<T, SolarmanError>;

/// Main error type for solarman-modbus
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolarmanError {
    /// Requested device model is not registered in the catalog
    #[error("Unknown device model: {model}")]
    UnknownDevice { model: String },

    /// Catalog entries out of order, overlapping or malformed
    #[error("Catalog error in {model} at '{sensor}': {message}")]
    CatalogOrdering {
        model: String,
        sensor: String,
        message: String,
    },

    /// Raw register block does not cover a descriptor
    #[error(
        "Register 0x{register:04x} for '{sensor}' out of range: \
         need {required} words, block has {available}"
    )]
    OutOfRange {
        sensor: String,
        register: u16,
        required: usize,
        available: usize,
    },

    /// Descriptor asks for an encoding the decoder does not implement
    #[error("Unsupported encoding for '{sensor}': {word_count} words, signed={signed}")]
    UnsupportedEncoding {
        sensor: String,
        word_count: u16,
        signed: bool,
    },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Modbus communication errors
    #[error("Modbus error: {message}")]
    Modbus { message: String },

    /// Timeout errors
    #[error("Timeout error: {message}")]
    Timeout { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl SolarmanError {
    /// Create a new unknown device error
    pub fn unknown_device<S: Into<String>>(model: S) -> Self {
        SolarmanError::UnknownDevice {
            model: model.into(),
        }
    }

    /// Create a new catalog ordering error
    pub fn catalog_ordering<S: Into<String>>(model: S, sensor: S, message: S) -> Self {
        SolarmanError::CatalogOrdering {
            model: model.into(),
            sensor: sensor.into(),
            message: message.into(),
        }
    }

    /// Create a new out-of-range error
    pub fn out_of_range<S: Into<String>>(
        sensor: S,
        register: u16,
        required: usize,
        available: usize,
    ) -> Self {
        SolarmanError::OutOfRange {
            sensor: sensor.into(),
            register,
            required,
            available,
        }
    }

    /// Create a new unsupported encoding error
    pub fn unsupported_encoding<S: Into<String>>(sensor: S, word_count: u16, signed: bool) -> Self {
        SolarmanError::UnsupportedEncoding {
            sensor: sensor.into(),
            word_count,
            signed,
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        SolarmanError::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        SolarmanError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new Modbus error
    pub fn modbus<S: Into<String>>(message: S) -> Self {
        SolarmanError::Modbus {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        SolarmanError::Timeout {
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        SolarmanError::Io {
            message: message.into(),
        }
    }

    /// Whether the error came from the catalog or the decoder rather than
    /// from configuration or transport
    pub fn is_decoding_error(&self) -> bool {
        matches!(
            self,
            SolarmanError::UnknownDevice { .. }
                | SolarmanError::CatalogOrdering { .. }
                | SolarmanError::OutOfRange { .. }
                | SolarmanError::UnsupportedEncoding { .. }
        )
    }
}

impl From<std::io::Error> for SolarmanError {
    fn from(err: std::io::Error) -> Self {
        SolarmanError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for SolarmanError {
    fn from(err: serde_yaml::Error) -> Self {
        SolarmanError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for SolarmanError {
    fn from(err: serde_json::Error) -> Self {
        SolarmanError::Serialization {
            message: err.to_string(),
        }
    }
}
