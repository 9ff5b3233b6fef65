//! Process-wide [`Logger`] used by the `log_*!` macros.
//!
//! The instance is created from [`LoggerConfig::default`] on first use
//! unless [`init`] installed one earlier. [`init`] may be called again to
//! reconfigure: the previous logger is drained and shut down.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use super::{level::Severity, logger::Logger};
use crate::{config::LoggerConfig, error::LogResult};

static LOGGER: Lazy<RwLock<Option<Arc<Logger>>>> = Lazy::new(|| RwLock::new(None));

/// Installs a logger built from `config`, replacing any previous one.
pub fn init(config: LoggerConfig) -> LogResult<Arc<Logger>> {
    let logger = Arc::new(Logger::new(config)?);
    let previous = LOGGER.write().replace(Arc::clone(&logger));
    if let Some(previous) = previous {
        if let Err(e) = previous.shutdown() {
            tracing::warn!(error = %e, "Previous logger did not shut down cleanly");
        }
    }
    Ok(logger)
}

/// Returns the installed logger, creating a default one on first use.
pub fn logger() -> LogResult<Arc<Logger>> {
    if let Some(logger) = LOGGER.read().as_ref() {
        return Ok(Arc::clone(logger));
    }

    let mut slot = LOGGER.write();
    if let Some(logger) = slot.as_ref() {
        return Ok(Arc::clone(logger));
    }
    let logger = Arc::new(Logger::new(LoggerConfig::default())?);
    *slot = Some(Arc::clone(&logger));
    Ok(logger)
}

pub fn log(
    level: Severity,
    message: impl Into<String>,
) -> LogResult<()> {
    logger()?.log(level, message)
}

pub fn change_base_name(
    base_name: impl Into<String>,
    append_date: bool,
) -> LogResult<()> {
    logger()?.change_base_name(base_name, append_date)
}

pub fn set_threshold(threshold: Severity) -> LogResult<()> {
    logger()?.set_threshold(threshold);
    Ok(())
}

pub fn reset_to_default() -> LogResult<()> {
    logger()?.reset_to_default()
}

pub fn flush() -> LogResult<()> {
    logger()?.flush()
}

/// Drains and removes the installed logger. The next use creates a fresh
/// default one.
pub fn shutdown() -> LogResult<()> {
    let current = LOGGER.write().take();
    match current {
        Some(logger) => logger.shutdown(),
        None => Ok(()),
    }
}

/// Logs a formatted message through the process-wide logger.
///
/// Evaluates to `LogResult<()>`.
#[macro_export]
macro_rules! log_at {
    ($level:expr, $($arg:tt)+) => {
        $crate::logging::global::log($level, ::std::format!($($arg)+))
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)+) => {
        $crate::log_at!($crate::logging::Severity::Debug, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)+) => {
        $crate::log_at!($crate::logging::Severity::Info, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)+) => {
        $crate::log_at!($crate::logging::Severity::Warn, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)+) => {
        $crate::log_at!($crate::logging::Severity::Error, $($arg)+)
    };
}

#[macro_export]
macro_rules! log_fatal {
    ($($arg:tt)+) => {
        $crate::log_at!($crate::logging::Severity::Fatal, $($arg)+)
    };
}
