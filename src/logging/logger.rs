use std::{error::Error, path::PathBuf, sync::Arc};

use parking_lot::RwLock;

use super::{
    archive::ArchiveReport,
    clock::{Clock, SystemClock},
    entry::{ExceptionDetail, LogEntry},
    level::{should_emit, Severity},
    sinks::{Writer, WriterStats},
};
use crate::{
    config::LoggerConfig,
    error::{ArchiveResult, LogResult},
};

/// Rolling file logger: severity filter, formatter and writer behind one
/// handle.
///
/// Settings passed to [`Logger::new`] are remembered;
/// [`Logger::reset_to_default`] returns to them.
#[derive(Debug)]
pub struct Logger {
    initial: LoggerConfig,
    config: RwLock<LoggerConfig>,
    writer: Writer,
    clock: Arc<dyn Clock>,
}

impl Logger {
    pub fn new(config: LoggerConfig) -> LogResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: LoggerConfig,
        clock: Arc<dyn Clock>,
    ) -> LogResult<Self> {
        config.validate()?;
        let writer = Writer::new(
            config.strategy,
            config.file_target(),
            config.formatter(),
            Arc::clone(&clock),
        )?;

        tracing::debug!(
            directory = %config.directory.display(),
            base_name = %config.base_name,
            threshold = %config.threshold,
            strategy = ?config.strategy,
            "Logger initialized"
        );

        Ok(Self {
            initial: config.clone(),
            config: RwLock::new(config),
            writer,
            clock,
        })
    }

    /// Logs `message` at `level` if it passes the threshold.
    pub fn log(
        &self,
        level: Severity,
        message: impl Into<String>,
    ) -> LogResult<()> {
        if !self.enabled(level) {
            return Ok(());
        }
        self.writer
            .write(LogEntry::at(self.clock.now(), level, message))
    }

    /// Logs an entry carrying `err` and its `source()` chain.
    pub fn log_error<E>(
        &self,
        level: Severity,
        message: impl Into<String>,
        err: &E,
    ) -> LogResult<()>
    where
        E: Error + ?Sized,
    {
        if !self.enabled(level) {
            return Ok(());
        }
        let entry = LogEntry::at(self.clock.now(), level, message)
            .with_exception(ExceptionDetail::from_error(err));
        self.writer.write(entry)
    }

    /// Writes a prepared entry, still subject to the threshold.
    pub fn log_entry(
        &self,
        entry: LogEntry,
    ) -> LogResult<()> {
        if !self.enabled(entry.level()) {
            return Ok(());
        }
        self.writer.write(entry)
    }

    pub fn debug(
        &self,
        message: impl Into<String>,
    ) -> LogResult<()> {
        self.log(Severity::Debug, message)
    }

    pub fn info(
        &self,
        message: impl Into<String>,
    ) -> LogResult<()> {
        self.log(Severity::Info, message)
    }

    pub fn warn(
        &self,
        message: impl Into<String>,
    ) -> LogResult<()> {
        self.log(Severity::Warn, message)
    }

    pub fn error(
        &self,
        message: impl Into<String>,
    ) -> LogResult<()> {
        self.log(Severity::Error, message)
    }

    pub fn fatal(
        &self,
        message: impl Into<String>,
    ) -> LogResult<()> {
        self.log(Severity::Fatal, message)
    }

    pub fn enabled(
        &self,
        level: Severity,
    ) -> bool {
        should_emit(level, self.threshold())
    }

    pub fn threshold(&self) -> Severity {
        self.config.read().threshold
    }

    pub fn set_threshold(
        &self,
        threshold: Severity,
    ) {
        let mut config = self.config.write();
        if config.threshold != threshold {
            tracing::debug!(from = %config.threshold, to = %threshold, "Log threshold changed");
            config.threshold = threshold;
        }
    }

    /// Switches to a new base name.
    ///
    /// Entries logged before the call go to the previous file; entries
    /// logged after it returns go to the new one.
    pub fn change_base_name(
        &self,
        base_name: impl Into<String>,
        append_date: bool,
    ) -> LogResult<()> {
        let mut config = self.config.write();
        config.base_name = base_name.into();
        config.append_date = append_date;

        self.writer
            .retarget(config.file_target(), config.flush_timeout())?;
        tracing::info!(
            base_name = %config.base_name,
            append_date,
            "Log base name changed"
        );
        Ok(())
    }

    /// Drains pending entries, then restores the target and threshold given
    /// at construction. The cached path and counters are cleared, so the
    /// next write resolves its file from scratch.
    pub fn reset_to_default(&self) -> LogResult<()> {
        let mut config = self.config.write();
        let timeout = config.flush_timeout();
        self.writer.flush(timeout)?;

        config.base_name = self.initial.base_name.clone();
        config.append_date = self.initial.append_date;
        config.threshold = self.initial.threshold;
        self.writer.retarget(config.file_target(), timeout)?;
        self.writer.file().metrics().reset();

        tracing::debug!(base_name = %config.base_name, "Logger reset to defaults");
        Ok(())
    }

    /// Blocks until every entry logged so far is on disk, bounded by the
    /// configured flush timeout.
    pub fn flush(&self) -> LogResult<()> {
        let timeout = self.config.read().flush_timeout();
        self.writer.flush(timeout)
    }

    pub fn shutdown(&self) -> LogResult<()> {
        let timeout = self.config.read().flush_timeout();
        self.writer.shutdown(timeout)
    }

    /// File the most recent entry went to.
    pub fn current_path(&self) -> PathBuf {
        self.writer.current_path()
    }

    pub fn stats(&self) -> WriterStats {
        self.writer.stats()
    }

    pub fn config(&self) -> LoggerConfig {
        self.config.read().clone()
    }

    /// Runs one archiver pass over the log directory.
    pub fn archive_old_logs(&self) -> ArchiveResult<ArchiveReport> {
        let archiver = self.config.read().archiver(Arc::clone(&self.clock));
        archiver.run()
    }
}
