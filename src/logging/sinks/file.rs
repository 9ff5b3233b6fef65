use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::PathBuf,
    sync::Arc,
};

use parking_lot::{Mutex, RwLock};

use super::metrics::{WriterMetrics, WriterStats};
use crate::{
    error::{LogError, LogResult},
    logging::{clock::Clock, entry::LogEntry, formatter::LineFormatter, path::FileTarget},
};

/// Synchronous file writer.
///
/// Every call resolves the path for today, creates the directory if needed,
/// opens the file in append mode, writes one line and closes the handle.
/// No handle is held between calls, so other processes may append to or
/// read the same file. There is no application-level file lock: concurrent
/// appenders rely on the OS appending small writes atomically.
#[derive(Debug)]
pub struct FileWriter {
    target: RwLock<FileTarget>,
    formatter: LineFormatter,
    clock: Arc<dyn Clock>,
    last_path: Mutex<Option<PathBuf>>,
    metrics: Arc<WriterMetrics>,
}

impl FileWriter {
    pub fn new(
        target: FileTarget,
        formatter: LineFormatter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            target: RwLock::new(target),
            formatter,
            clock,
            last_path: Mutex::new(None),
            metrics: Arc::new(WriterMetrics::new()),
        }
    }

    /// Formats and appends one entry. Errors are returned, not retried.
    pub fn write(
        &self,
        entry: &LogEntry,
    ) -> LogResult<()> {
        let line = self.formatter.format(entry);
        self.write_line(&line)
    }

    /// Appends an already formatted line plus `\n`.
    pub fn write_line(
        &self,
        line: &str,
    ) -> LogResult<()> {
        let path = self.target.read().resolve(self.clock.today());

        match append_line(&path, line) {
            Ok(()) => {
                self.metrics.record_written();
                *self.last_path.lock() = Some(path);
                Ok(())
            }
            Err(e) => {
                self.metrics.record_failure(&e);
                Err(e)
            }
        }
    }

    /// Path of the last successful write, or today's path if nothing has
    /// been written since the target was set.
    ///
    /// Date rollover shows up here only after the next write.
    pub fn current_path(&self) -> PathBuf {
        if let Some(path) = self.last_path.lock().clone() {
            return path;
        }
        self.resolve_now()
    }

    /// Path a write issued right now would go to.
    pub fn resolve_now(&self) -> PathBuf {
        self.target.read().resolve(self.clock.today())
    }

    pub fn target(&self) -> FileTarget {
        self.target.read().clone()
    }

    /// Switches to a new target and forgets the cached path.
    pub fn set_target(
        &self,
        target: FileTarget,
    ) {
        *self.target.write() = target;
        *self.last_path.lock() = None;
    }

    pub fn formatter(&self) -> LineFormatter {
        self.formatter
    }

    pub fn metrics(&self) -> &Arc<WriterMetrics> {
        &self.metrics
    }

    pub fn stats(&self) -> WriterStats {
        self.metrics.get_stats(0)
    }
}

fn append_line(
    path: &std::path::Path,
    line: &str,
) -> LogResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| LogError::io(parent, e))?;
        }
    }

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| LogError::io(path, e))?;

    // Одна запись на строку: append маленьких буферов атомарен на уровне ОС.
    let mut buf = String::with_capacity(line.len() + 1);
    buf.push_str(line);
    buf.push('\n');
    file.write_all(buf.as_bytes())
        .map_err(|e| LogError::io(path, e))?;

    Ok(())
}
