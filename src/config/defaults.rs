use super::*;

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            ip: "192.168.1.100".to_string(),
            port: 502,
            slave_id: 1,
            max_registers_per_read: 125,
            connect_timeout_ms: 5000,
            read_timeout_ms: 2000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "INFO".to_string(),
            console_level: None,
            file_level: None,
            file: "/tmp/solarman-modbus.log".to_string(),
            backup_count: 5,
            console_output: true,
            file_output: false,
            json_format: false,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            modbus: ModbusConfig::default(),
            device: LSW3.to_string(),
            poll_interval_ms: 60_000,
            logging: LoggingConfig::default(),
            devices: Vec::new(),
        }
    }
}
