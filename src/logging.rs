//! Structured logging and tracing for solarman-modbus
//!
//! Console output (plain or JSON) plus an optional daily-rotated log file,
//! all routed through the tracing ecosystem. The catalog and decoder never
//! log; the transport and poller do, through [`StructuredLogger`].

use crate::config::LoggingConfig;
use crate::error::{Result, SolarmanError};
use once_cell::sync::OnceCell;
use std::path::Path;
use std::sync::Once;
use tracing::{Level, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod level;
mod structured;

pub use level::{level_rank, min_level, parse_log_level};
pub use structured::{LogContext, StructuredLogger, get_logger, get_logger_with_context};

// Keep the non-blocking worker guard alive for the entire process lifetime
static LOG_GUARD: OnceCell<WorkerGuard> = OnceCell::new();
static INIT_ONCE: Once = Once::new();
static INIT_ERROR: OnceCell<String> = OnceCell::new();

/// Initialize logging system based on configuration
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    INIT_ONCE.call_once(|| {
        let init_result = (|| -> Result<()> {
            let base_level = parse_log_level(&config.level)?;
            let console_level = level::level_or(config.console_level.as_ref(), base_level);
            let file_level = level::level_or(config.file_level.as_ref(), base_level);

            let most_verbose = min_level(console_level, file_level);
            let filter = build_env_filter(most_verbose);

            if should_use_console_only(config) {
                init_console_only_logging(filter, config.json_format, console_level)
            } else {
                init_file_logging(config, filter, console_level, file_level)
            }
        })();

        if let Err(e) = init_result {
            let _ = INIT_ERROR.set(e.to_string());
        }
    });

    if let Some(err) = INIT_ERROR.get() {
        return Err(SolarmanError::config(err.clone()));
    }
    Ok(())
}

fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("solarman_modbus={},tokio_modbus=warn", level).into())
}

fn should_use_console_only(config: &LoggingConfig) -> bool {
    cfg!(test)
        || !config.file_output
        || std::env::var_os("SOLARMAN_DISABLE_FILE_LOG").is_some()
}

fn init_console_only_logging(
    filter: EnvFilter,
    json_format: bool,
    console_level: Level,
) -> Result<()> {
    let console_layer = {
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false);
        if json_format {
            layer
                .json()
                .with_filter(LevelFilter::from_level(console_level))
                .boxed()
        } else {
            layer
                .with_filter(LevelFilter::from_level(console_level))
                .boxed()
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .try_init()
        .map_err(|e| SolarmanError::config(format!("Failed to install subscriber: {}", e)))?;

    info!(
        "Logging initialized - console_level: {:?}, console-only",
        console_level
    );
    Ok(())
}

fn init_file_logging(
    config: &LoggingConfig,
    filter: EnvFilter,
    console_level: Level,
    file_level: Level,
) -> Result<()> {
    let registry = tracing_subscriber::registry().with(filter);

    let file_appender = rolling::Builder::new()
        .rotation(rolling::Rotation::DAILY)
        .filename_prefix("solarman-modbus")
        .filename_suffix("log")
        .max_log_files(config.backup_count.max(1) as usize)
        .build({
            // If config.file is a file path, use its parent dir; otherwise treat as dir
            let p = Path::new(&config.file);
            if p.extension().is_some() {
                p.parent().unwrap_or(p)
            } else {
                p
            }
        })
        .map_err(|e| SolarmanError::io(format!("Failed to create log file appender: {}", e)))?;

    let (non_blocking_appender, guard) = non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    let file_layer = {
        let base = fmt::layer()
            .with_writer(non_blocking_appender)
            .with_ansi(false)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false);
        if config.json_format {
            base.json()
                .with_filter(LevelFilter::from_level(file_level))
                .boxed()
        } else {
            base.with_filter(LevelFilter::from_level(file_level))
                .boxed()
        }
    };

    let subscriber = registry.with(file_layer);

    let installed = if config.console_output {
        let console_layer = {
            let base = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false);
            if config.json_format {
                base.json()
                    .with_filter(LevelFilter::from_level(console_level))
                    .boxed()
            } else {
                base.with_filter(LevelFilter::from_level(console_level))
                    .boxed()
            }
        };
        subscriber.with(console_layer).try_init()
    } else {
        subscriber.try_init()
    };
    installed.map_err(|e| SolarmanError::config(format!("Failed to install subscriber: {}", e)))?;

    info!(
        "Logging initialized - console_level: {:?}, file_level: {:?}, file: {}",
        console_level, file_level, config.file
    );
    Ok(())
}
