//! Component-scoped loggers
//!
//! Every event carries a `fields` value such as
//! `component=poller,device=LSW-3,slave_id=1`, so lines from the transport
//! and the poller can be told apart in one log stream.

use std::collections::BTreeMap;
use tracing::Level;

/// Who is logging: a component, optionally the device it serves, plus any
/// extra key/value pairs
#[derive(Debug, Clone)]
pub struct LogContext {
    pub component: String,
    pub device: Option<String>,
    /// Rendered in key order after `component` and `device`
    pub extra_fields: BTreeMap<String, String>,
}

impl LogContext {
    pub fn new(component: &str) -> Self {
        Self {
            component: component.to_string(),
            device: None,
            extra_fields: BTreeMap::new(),
        }
    }

    pub fn with_device(mut self, device: &str) -> Self {
        self.device = Some(device.to_string());
        self
    }

    pub fn with_field(mut self, key: &str, value: String) -> Self {
        self.extra_fields.insert(key.to_string(), value);
        self
    }
}

/// Logger that stamps its [`LogContext`] on every event
#[derive(Debug, Clone)]
pub struct StructuredLogger {
    pub(crate) context: LogContext,
}

impl StructuredLogger {
    pub fn new(context: LogContext) -> Self {
        Self { context }
    }

    pub fn trace(&self, message: &str) {
        self.emit(Level::TRACE, message);
    }

    pub fn debug(&self, message: &str) {
        self.emit(Level::DEBUG, message);
    }

    pub fn info(&self, message: &str) {
        self.emit(Level::INFO, message);
    }

    pub fn warn(&self, message: &str) {
        self.emit(Level::WARN, message);
    }

    pub fn error(&self, message: &str) {
        self.emit(Level::ERROR, message);
    }

    // `tracing` needs the level as a constant at each call site
    fn emit(&self, level: Level, message: &str) {
        let fields = self.format_fields();
        match level {
            Level::TRACE => tracing::trace!(%fields, "{}", message),
            Level::DEBUG => tracing::debug!(%fields, "{}", message),
            Level::INFO => tracing::info!(%fields, "{}", message),
            Level::WARN => tracing::warn!(%fields, "{}", message),
            Level::ERROR => tracing::error!(%fields, "{}", message),
        }
    }

    pub(crate) fn format_fields(&self) -> String {
        let context = &self.context;
        std::iter::once(("component", context.component.as_str()))
            .chain(context.device.as_deref().map(|d| ("device", d)))
            .chain(
                context
                    .extra_fields
                    .iter()
                    .map(|(k, v)| (k.as_str(), v.as_str())),
            )
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Logger for a bare component
pub fn get_logger(component: &str) -> StructuredLogger {
    StructuredLogger::new(LogContext::new(component))
}

pub fn get_logger_with_context(context: LogContext) -> StructuredLogger {
    StructuredLogger::new(context)
}
