//! Poll orchestration
//!
//! One poll cycle reads the device's register window (split into
//! Modbus-sized requests), decodes it against the catalog and hands back a
//! snapshot. Descriptors that fail to decode are logged and reported next to
//! the readings that succeeded.

use crate::catalog::DeviceCatalog;
use crate::config::{Config, MODBUS_MAX_READ_QUANTITY};
use crate::decoder::{DecodeReport, decode_partial};
use crate::error::{Result, SolarmanError};
use crate::logging::{LogContext, StructuredLogger, get_logger_with_context};
use crate::modbus::RegisterSource;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;

/// Result of one poll cycle
#[derive(Debug, Clone)]
pub struct PollSnapshot {
    pub device: String,
    pub timestamp: DateTime<Utc>,
    pub report: DecodeReport,
    pub duration_ms: u64,
}

impl PollSnapshot {
    /// `{sensor name: value}` object of the decoded readings
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .report
            .readings
            .iter()
            .map(|r| (r.name.clone(), serde_json::json!(r.value)))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

/// Drives poll cycles for one device over a register source
pub struct Poller<S: RegisterSource> {
    source: S,
    catalog: Arc<DeviceCatalog>,
    model: String,
    slave_id: u8,
    max_registers_per_read: u16,
    total_polls: u64,
    logger: StructuredLogger,
}

impl<S: RegisterSource> Poller<S> {
    /// Create a poller; fails if `model` is not in the catalog
    pub fn new(
        source: S,
        catalog: Arc<DeviceCatalog>,
        model: &str,
        slave_id: u8,
        max_registers_per_read: u16,
    ) -> Result<Self> {
        if !(1..=MODBUS_MAX_READ_QUANTITY).contains(&max_registers_per_read) {
            return Err(SolarmanError::validation(
                "max_registers_per_read".to_string(),
                format!(
                    "{} is outside 1..={}",
                    max_registers_per_read, MODBUS_MAX_READ_QUANTITY
                ),
            ));
        }
        let device = catalog.device(model)?;
        let logger = get_logger_with_context(
            LogContext::new("poller")
                .with_device(model)
                .with_field("slave_id", slave_id.to_string()),
        );

        for sensor in device.sensors.iter().filter(|s| s.suspect.is_some()) {
            logger.warn(&format!(
                "Catalog entry '{}' is marked suspect: {}",
                sensor.name,
                sensor.suspect.as_deref().unwrap_or_default()
            ));
        }

        Ok(Self {
            source,
            catalog,
            model: model.to_string(),
            slave_id,
            max_registers_per_read,
            total_polls: 0,
            logger,
        })
    }

    /// Create a poller from the configured device and Modbus settings
    pub fn from_config(source: S, catalog: Arc<DeviceCatalog>, config: &Config) -> Result<Self> {
        Self::new(
            source,
            catalog,
            &config.device,
            config.modbus.slave_id,
            config.modbus.max_registers_per_read,
        )
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    /// Completed poll cycles, successful or not at decode level
    pub fn total_polls(&self) -> u64 {
        self.total_polls
    }

    /// Run one read-and-decode cycle
    pub async fn poll_once(&mut self) -> Result<PollSnapshot> {
        if self.source.connection_status() == Some(false) {
            return Err(SolarmanError::modbus(format!(
                "Not connected: skipping poll of {}",
                self.model
            )));
        }

        let started = Instant::now();
        let catalog = Arc::clone(&self.catalog);
        let device = catalog.device(&self.model)?;

        let window = device.read_window();
        let mut raw = Vec::with_capacity(window.count as usize);
        for (address, quantity) in window.chunks(self.max_registers_per_read) {
            let words = self
                .source
                .read_holding_registers(self.slave_id, address, quantity)
                .await?;
            if words.len() != usize::from(quantity) {
                return Err(SolarmanError::modbus(format!(
                    "Short response at 0x{:04x}: expected {} registers, got {}",
                    address,
                    quantity,
                    words.len()
                )));
            }
            raw.extend_from_slice(&words);
        }

        let report = decode_partial(&raw, device.base_register, &device.sensors);
        for failure in &report.failures {
            self.logger.warn(&format!(
                "Failed to decode '{}': {}",
                failure.sensor, failure.error
            ));
        }

        self.total_polls += 1;
        let duration_ms = started.elapsed().as_millis() as u64;
        self.logger.debug(&format!(
            "Poll #{} decoded {} of {} sensors in {} ms",
            self.total_polls,
            report.readings.len(),
            device.sensors.len(),
            duration_ms
        ));

        Ok(PollSnapshot {
            device: self.model.clone(),
            timestamp: Utc::now(),
            report,
            duration_ms,
        })
    }
}
