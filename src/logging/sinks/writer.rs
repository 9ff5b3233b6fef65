use std::{path::PathBuf, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

use super::{file::FileWriter, metrics::WriterStats, queued::QueuedWriter};
use crate::{
    error::LogResult,
    logging::{clock::Clock, entry::LogEntry, formatter::LineFormatter, path::FileTarget},
};

/// How entries reach the disk.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WriteStrategy {
    /// Write on the caller's thread; errors go back to the caller.
    Sync,
    /// Enqueue and let the background worker write.
    #[default]
    Queued,
}

/// A file writer with one of two strategies.
#[derive(Debug)]
pub enum Writer {
    Sync(FileWriter),
    Queued(QueuedWriter),
}

impl Writer {
    pub fn new(
        strategy: WriteStrategy,
        target: FileTarget,
        formatter: LineFormatter,
        clock: Arc<dyn Clock>,
    ) -> LogResult<Self> {
        let file = FileWriter::new(target, formatter, clock);
        match strategy {
            WriteStrategy::Sync => Ok(Writer::Sync(file)),
            WriteStrategy::Queued => Ok(Writer::Queued(QueuedWriter::start(file)?)),
        }
    }

    pub fn strategy(&self) -> WriteStrategy {
        match self {
            Writer::Sync(_) => WriteStrategy::Sync,
            Writer::Queued(_) => WriteStrategy::Queued,
        }
    }

    pub fn write(
        &self,
        entry: LogEntry,
    ) -> LogResult<()> {
        match self {
            Writer::Sync(file) => file.write(&entry),
            Writer::Queued(queue) => queue.enqueue(entry),
        }
    }

    /// Writes a batch in order. The sync strategy stops at the first error.
    pub fn write_batch(
        &self,
        entries: Vec<LogEntry>,
    ) -> LogResult<()> {
        match self {
            Writer::Sync(file) => entries.iter().try_for_each(|entry| file.write(entry)),
            Writer::Queued(queue) => queue.enqueue_batch(entries),
        }
    }

    /// No-op for the sync strategy: nothing is ever buffered.
    pub fn flush(
        &self,
        timeout: Duration,
    ) -> LogResult<()> {
        match self {
            Writer::Sync(_) => Ok(()),
            Writer::Queued(queue) => queue.flush(timeout),
        }
    }

    pub fn retarget(
        &self,
        target: FileTarget,
        timeout: Duration,
    ) -> LogResult<()> {
        match self {
            Writer::Sync(file) => {
                file.set_target(target);
                Ok(())
            }
            Writer::Queued(queue) => queue.retarget(target, timeout),
        }
    }

    pub fn shutdown(
        &self,
        timeout: Duration,
    ) -> LogResult<()> {
        match self {
            Writer::Sync(_) => Ok(()),
            Writer::Queued(queue) => queue.shutdown(timeout),
        }
    }

    pub fn file(&self) -> &FileWriter {
        match self {
            Writer::Sync(file) => file,
            Writer::Queued(queue) => queue.file(),
        }
    }

    pub fn current_path(&self) -> PathBuf {
        self.file().current_path()
    }

    pub fn target(&self) -> FileTarget {
        self.file().target()
    }

    pub fn stats(&self) -> WriterStats {
        match self {
            Writer::Sync(file) => file.stats(),
            Writer::Queued(queue) => queue.stats(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use chrono::NaiveDate;
    use tempfile::tempdir;

    use super::*;
    use crate::logging::{clock::ManualClock, level::Severity};

    /// Тест проверяет одинаковое поведение обеих стратегий записи.
    #[test]
    fn test_both_strategies_write_same_lines() {
        for strategy in [WriteStrategy::Sync, WriteStrategy::Queued] {
            let tmp = tempdir().unwrap();
            let writer = Writer::new(
                strategy,
                FileTarget::new(tmp.path(), "both", true),
                LineFormatter::default(),
                Arc::new(ManualClock::at_local_date(
                    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
                )),
            )
            .unwrap();
            assert_eq!(writer.strategy(), strategy);

            writer.write(LogEntry::new(Severity::Info, "one")).unwrap();
            writer
                .write_batch(vec![
                    LogEntry::new(Severity::Warn, "two"),
                    LogEntry::new(Severity::Error, "three"),
                ])
                .unwrap();
            writer.flush(Duration::from_secs(5)).unwrap();

            let content = fs::read_to_string(writer.current_path()).unwrap();
            let levels: Vec<_> = content
                .lines()
                .map(|l| l.split(',').nth(1).unwrap().to_string())
                .collect();
            assert_eq!(levels, vec!["INFO", "WARN", "ERROR"], "{strategy:?}");
            assert_eq!(writer.stats().written, 3);

            writer.shutdown(Duration::from_secs(5)).unwrap();
        }
    }
}
