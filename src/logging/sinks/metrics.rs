use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

/// Счётчики записи в файл.
#[derive(Debug, Default)]
pub struct WriterMetrics {
    /// Кол-во успешно записанных строк
    pub written: AtomicU64,
    /// Кол-во строк, которые не удалось записать
    pub failed: AtomicU64,
    /// Текст последней ошибки записи
    last_error: Mutex<Option<String>>,
}

/// Snapshot of a writer's counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriterStats {
    pub written: u64,
    pub failed: u64,
    /// Entries accepted but not yet written (queued strategy only).
    pub pending: usize,
    pub last_error: Option<String>,
}

impl WriterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_written(&self) {
        self.written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(
        &self,
        error: &dyn std::fmt::Display,
    ) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        *self.last_error.lock() = Some(error.to_string());
    }

    pub fn get_stats(
        &self,
        pending: usize,
    ) -> WriterStats {
        WriterStats {
            written: self.written.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            pending,
            last_error: self.last_error.lock().clone(),
        }
    }

    pub fn reset(&self) {
        self.written.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        *self.last_error.lock() = None;
    }
}
