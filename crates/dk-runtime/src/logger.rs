//! Logging side-channel.
//!
//! All diagnostics flow through a caller-supplied callback and never
//! affect control flow. Severities mirror the status levels of the
//! exported interface.

/// Message severity handed to the log callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Ok,
    Warning,
    Error,
}

/// Receives every diagnostic the runtime emits.
///
/// Implementations must not panic; the runtime calls this from every
/// operation, including failure paths.
pub trait Logger {
    fn log(&self, severity: Severity, category: &str, message: &str);
}

/// Default logger: routes messages to the `tracing` ecosystem, so hosts
/// that install a subscriber see runtime diagnostics alongside their own.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, severity: Severity, category: &str, message: &str) {
        match severity {
            Severity::Ok => tracing::info!(category, "{}", message),
            Severity::Warning => tracing::warn!(category, "{}", message),
            Severity::Error => tracing::error!(category, "{}", message),
        }
    }
}

/// Discards everything. Useful in tests asserting on returned errors.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _severity: Severity, _category: &str, _message: &str) {}
}
