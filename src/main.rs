use anyhow::Result;
use solarman_modbus::config::Config;
use solarman_modbus::logging::init_logging;
use solarman_modbus::modbus::ModbusClient;
use solarman_modbus::poller::Poller;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {}", path, e))?,
        None => Config::load()?,
    };
    config.validate()?;
    init_logging(&config.logging)?;

    info!(
        "solarman-modbus {} polling {} at {}:{}",
        env!("CARGO_PKG_VERSION"),
        config.device,
        config.modbus.ip,
        config.modbus.port
    );

    let catalog = Arc::new(config.catalog()?);
    let mut client = ModbusClient::new(&config.modbus);
    client.connect().await?;

    let mut poller = Poller::from_config(client, catalog, &config)?;
    let mut interval = tokio::time::interval(Duration::from_millis(config.poll_interval_ms));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match poller.poll_once().await {
                    Ok(snapshot) => println!("{}", snapshot.to_json()),
                    Err(e) if e.is_decoding_error() => {
                        error!("Catalog rejected poll of {}: {}", config.device, e);
                    }
                    Err(e) => warn!("Poll cycle failed, retrying next interval: {}", e),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested after {} polls", poller.total_polls());
                break;
            }
        }
    }

    poller.source_mut().disconnect();
    Ok(())
}
