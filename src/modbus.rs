//! Modbus TCP transport
//!
//! Thin async client used by the poller to fetch raw holding registers from
//! the logger. It opens one connection, applies per-operation timeouts and
//! reports failures; reconnecting is left to whoever drives it.

use crate::config::ModbusConfig;
use crate::error::{Result, SolarmanError};
use crate::logging::{StructuredLogger, get_logger};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::timeout;
use tokio_modbus::client::tcp;
use tokio_modbus::prelude::*;

/// Anything that can serve a block of holding registers
#[async_trait::async_trait]
pub trait RegisterSource: Send {
    /// `Some(false)` when the source knows it has no live link; sources
    /// without a notion of a connection report `None`
    fn connection_status(&self) -> Option<bool> {
        None
    }

    async fn read_holding_registers(
        &mut self,
        slave_id: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>>;
}

/// Modbus TCP client for the inverter logger
pub struct ModbusClient {
    /// Modbus TCP client connection
    client: Option<tokio_modbus::client::Context>,

    /// Configuration
    config: ModbusConfig,

    /// Connection timeout
    connection_timeout: Duration,

    /// Operation timeout
    operation_timeout: Duration,

    /// Logger
    logger: StructuredLogger,
}

impl ModbusClient {
    /// Create a new Modbus client
    pub fn new(config: &ModbusConfig) -> Self {
        Self {
            client: None,
            config: config.clone(),
            connection_timeout: Duration::from_millis(config.connect_timeout_ms),
            operation_timeout: Duration::from_millis(config.read_timeout_ms),
            logger: get_logger("modbus"),
        }
    }

    /// Connect to the Modbus server
    pub async fn connect(&mut self) -> Result<()> {
        let address = format!("{}:{}", self.config.ip, self.config.port);

        self.logger
            .info(&format!("Connecting to Modbus server at {}", address));

        let socket_addr: SocketAddr = address
            .parse()
            .map_err(|e| SolarmanError::modbus(format!("Invalid socket address: {}", e)))?;

        let slave = Slave(self.config.slave_id);
        match timeout(self.connection_timeout, tcp::connect_slave(socket_addr, slave)).await {
            Ok(Ok(client)) => {
                self.client = Some(client);
                self.logger.info("Successfully connected to Modbus server");
                Ok(())
            }
            Ok(Err(e)) => {
                let error_msg = format!("Failed to connect to Modbus server: {}", e);
                self.logger.error(&error_msg);
                Err(SolarmanError::modbus(error_msg))
            }
            Err(_) => {
                let error_msg = "Connection timeout".to_string();
                self.logger.error(&error_msg);
                Err(SolarmanError::timeout(error_msg))
            }
        }
    }

    /// Disconnect from the Modbus server
    pub fn disconnect(&mut self) {
        if self.client.take().is_some() {
            self.logger.info("Disconnecting from Modbus server");
        }
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Read holding registers
    pub async fn read_holding_registers(
        &mut self,
        slave_id: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>> {
        let timeout_duration = self.operation_timeout;

        // Log before borrowing client
        self.logger.debug(&format!(
            "Reading {} registers from address 0x{:04x} on slave {}",
            count, address, slave_id
        ));

        let client = self.get_client()?;
        client.set_slave(Slave(slave_id));
        let request = client.read_holding_registers(address, count);

        let outcome = match timeout(timeout_duration, request).await {
            Ok(Ok(Ok(response))) => Ok(response),
            Ok(Ok(Err(exception))) => Err(SolarmanError::modbus(format!(
                "Device rejected read at 0x{:04x}: {}",
                address, exception
            ))),
            Ok(Err(e)) => Err(SolarmanError::modbus(format!(
                "Failed to read holding registers: {}",
                e
            ))),
            Err(_) => Err(SolarmanError::timeout("Read operation timeout")),
        };

        match &outcome {
            Ok(response) => self.logger.trace(&format!(
                "Read {} registers: {:?}",
                response.len(),
                response
            )),
            Err(e) => self.logger.error(&e.to_string()),
        }
        outcome
    }

    /// Get client reference or error if not connected
    fn get_client(&mut self) -> Result<&mut tokio_modbus::client::Context> {
        self.client
            .as_mut()
            .ok_or_else(|| SolarmanError::modbus("Not connected to Modbus server"))
    }
}

#[async_trait::async_trait]
impl RegisterSource for ModbusClient {
    fn connection_status(&self) -> Option<bool> {
        Some(self.is_connected())
    }

    async fn read_holding_registers(
        &mut self,
        slave_id: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>> {
        ModbusClient::read_holding_registers(self, slave_id, address, count).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modbus_client_creation() {
        let config = ModbusConfig::default();
        let client = ModbusClient::new(&config);
        assert!(!client.is_connected());
        assert_eq!(client.connection_status(), Some(false));
        assert_eq!(client.operation_timeout, Duration::from_millis(2000));
    }

    #[test]
    fn test_disconnect_when_not_connected_is_noop() {
        let mut client = ModbusClient::new(&ModbusConfig::default());
        client.disconnect();
        assert!(!client.is_connected());
    }
}
