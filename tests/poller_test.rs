use solarman_modbus::catalog::{DeviceCatalog, DeviceDefinition, LSW3};
use solarman_modbus::decoder::ReadingValue;
use solarman_modbus::error::{Result, SolarmanError};
use solarman_modbus::modbus::RegisterSource;
use solarman_modbus::poller::Poller;
use solarman_modbus::sensor::{SensorDescriptor, StateClass};
use std::collections::HashMap;
use std::io;
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::writer::MakeWriter;

/// In-memory register bank that records every request
#[derive(Default)]
struct FakeLogger {
    registers: HashMap<u16, u16>,
    requests: Vec<(u8, u16, u16)>,
    truncate_by: usize,
    fail_with: Option<SolarmanError>,
    connected: Option<bool>,
}

impl FakeLogger {
    fn with(values: &[(u16, u16)]) -> Self {
        Self {
            registers: values.iter().copied().collect(),
            ..Default::default()
        }
    }
}

#[async_trait::async_trait]
impl RegisterSource for FakeLogger {
    fn connection_status(&self) -> Option<bool> {
        self.connected
    }

    async fn read_holding_registers(
        &mut self,
        slave_id: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>> {
        self.requests.push((slave_id, address, count));
        if let Some(err) = self.fail_with.clone() {
            return Err(err);
        }
        let mut out: Vec<u16> = (0..count)
            .map(|i| *self.registers.get(&(address + i)).unwrap_or(&0))
            .collect();
        out.truncate(out.len().saturating_sub(self.truncate_by));
        Ok(out)
    }
}

/// Collects formatted log output in memory
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;
    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn builtin() -> Arc<DeviceCatalog> {
    Arc::new(DeviceCatalog::builtin().unwrap())
}

#[tokio::test]
async fn poll_reads_window_and_decodes() {
    let source = FakeLogger::with(&[(0x20c, 5000), (0x212, 65486), (0x22c, 12), (0x238, 41)]);
    let mut poller = Poller::new(source, builtin(), LSW3, 1, 125).unwrap();

    let snapshot = poller.poll_once().await.unwrap();

    assert_eq!(poller.source().requests, vec![(1, 0x20c, 46)]);
    assert_eq!(snapshot.device, LSW3);
    assert!(snapshot.report.is_complete());
    let json = snapshot.to_json();
    assert_eq!(json["Inverter Frequency"], serde_json::json!(50.0));
    assert_eq!(json["Grid Power IO"], serde_json::json!(500));
    assert_eq!(json["Battery Cycles"], serde_json::json!(12));
    assert_eq!(json["Inverter Temp"], serde_json::json!(41));
}

#[tokio::test]
async fn large_windows_are_split_into_requests() {
    let source = FakeLogger::with(&[(0x239, 55)]);
    let mut poller = Poller::new(source, builtin(), LSW3, 3, 20).unwrap();

    let snapshot = poller.poll_once().await.unwrap();

    assert_eq!(
        poller.source().requests,
        vec![(3, 0x20c, 20), (3, 0x220, 20), (3, 0x234, 6)]
    );
    assert_eq!(
        snapshot.report.get("Inverter Heatsink Temp").unwrap().value,
        ReadingValue::Integer(55)
    );
}

#[tokio::test]
async fn short_response_is_rejected() {
    let source = FakeLogger {
        truncate_by: 1,
        ..Default::default()
    };
    let mut poller = Poller::new(source, builtin(), LSW3, 1, 125).unwrap();

    let err = poller.poll_once().await.unwrap_err();
    assert!(err.to_string().contains("Short response"));
    assert_eq!(poller.total_polls(), 0);
}

#[tokio::test]
async fn transport_errors_propagate() {
    let source = FakeLogger {
        fail_with: Some(SolarmanError::timeout("Read operation timeout")),
        ..Default::default()
    };
    let mut poller = Poller::new(source, builtin(), LSW3, 1, 125).unwrap();

    assert!(matches!(
        poller.poll_once().await,
        Err(SolarmanError::Timeout { .. })
    ));
}

#[tokio::test]
async fn undecodable_sensor_does_not_abort_the_cycle() {
    let device = DeviceDefinition {
        model: "mixed".to_string(),
        base_register: 0x40,
        sensors: vec![
            SensorDescriptor::new("Energy", None, StateClass::TotalIncreasing, None, 0x40)
                .with_word_count(2),
            SensorDescriptor::new("Signed Pair", None, StateClass::Measurement, None, 0x42)
                .with_word_count(2)
                .with_signed(true),
            SensorDescriptor::new("Temp", None, StateClass::Measurement, None, 0x44),
        ],
    };
    let catalog = Arc::new(DeviceCatalog::new([device]).unwrap());
    let source = FakeLogger::with(&[(0x40, 0x0002), (0x41, 0x0003), (0x44, 21)]);
    let mut poller = Poller::new(source, catalog, "mixed", 1, 125).unwrap();

    let snapshot = poller.poll_once().await.unwrap();

    assert_eq!(snapshot.report.readings.len(), 2);
    assert_eq!(
        snapshot.report.get("Energy").unwrap().value,
        ReadingValue::Integer(0x0002_0003)
    );
    assert_eq!(snapshot.report.failures.len(), 1);
    assert_eq!(snapshot.report.failures[0].sensor, "Signed Pair");
    assert!(snapshot.to_json().get("Signed Pair").is_none());
}

#[tokio::test]
async fn disconnected_source_fails_before_reading() {
    let source = FakeLogger {
        connected: Some(false),
        ..Default::default()
    };
    let mut poller = Poller::new(source, builtin(), LSW3, 1, 125).unwrap();

    let err = poller.poll_once().await.unwrap_err();
    assert!(matches!(err, SolarmanError::Modbus { .. }));
    assert!(err.to_string().contains("Not connected"));
    assert!(poller.source().requests.is_empty());
    assert_eq!(poller.total_polls(), 0);

    // A source that reports a live link polls normally
    poller.source_mut().connected = Some(true);
    assert!(poller.poll_once().await.is_ok());
    assert_eq!(poller.source().requests.len(), 1);
}

#[test]
fn oversized_read_quantity_is_rejected() {
    let err = Poller::new(FakeLogger::default(), builtin(), LSW3, 1, 126)
        .err()
        .unwrap();
    assert!(matches!(err, SolarmanError::Validation { .. }));
}

#[test]
fn suspect_catalog_entries_are_warned_about() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();

    tracing::subscriber::with_default(subscriber, || {
        Poller::new(FakeLogger::default(), builtin(), LSW3, 1, 125).unwrap();
    });

    let output = logs.contents();
    assert!(output.contains("WARN"));
    assert!(output.contains("'Battery Charge/Discharge' is marked suspect"));
    assert!(output.contains("bidirectional flow declared unsigned"));
    assert!(!output.contains("'Grid Power IO' is marked suspect"));
}
