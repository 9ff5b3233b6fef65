use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use parking_lot::{Mutex, RwLock};

use super::{file::FileWriter, metrics::WriterStats};
use crate::{
    error::{LogError, LogResult},
    logging::{entry::LogEntry, path::FileTarget},
};

/// Таймаут по умолчанию для drain при drop.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Commands understood by the drain worker.
enum Command {
    Entry(LogEntry),
    Batch(Vec<LogEntry>),
    /// Switch target once everything queued before it is written.
    Retarget(FileTarget, Sender<()>),
    /// Acknowledge once everything queued before it is written.
    Flush(Sender<()>),
    Shutdown(Sender<()>),
}

/// Queued writer: producers enqueue without blocking, one background
/// worker drains the queue in FIFO order through a [`FileWriter`].
///
/// Worker-side I/O errors cannot reach the producer that already returned,
/// so they are counted in the shared metrics and reported via `tracing`.
pub struct QueuedWriter {
    file: Arc<FileWriter>,
    sender: RwLock<Option<Sender<Command>>>,
    pending: Arc<AtomicUsize>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl QueuedWriter {
    /// Запускает фоновый поток записи.
    pub fn start(file: FileWriter) -> LogResult<Self> {
        let file = Arc::new(file);
        let pending = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = mpsc::channel();

        let worker_file = Arc::clone(&file);
        let worker_pending = Arc::clone(&pending);
        let handle = thread::Builder::new()
            .name("logroll-writer".into())
            .spawn(move || drain_worker(rx, worker_file, worker_pending))
            .map_err(LogError::Spawn)?;

        Ok(Self {
            file,
            sender: RwLock::new(Some(tx)),
            pending,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Queues one entry and returns immediately.
    pub fn enqueue(
        &self,
        entry: LogEntry,
    ) -> LogResult<()> {
        self.submit(1, Command::Entry(entry))
    }

    /// Queues a batch; its entries are written contiguously and in order.
    pub fn enqueue_batch(
        &self,
        entries: Vec<LogEntry>,
    ) -> LogResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        self.submit(entries.len(), Command::Batch(entries))
    }

    /// Blocks until every entry queued before this call is written, or
    /// `timeout` elapses. A timeout is not fatal; the caller may retry.
    pub fn flush(
        &self,
        timeout: Duration,
    ) -> LogResult<()> {
        let (ack_tx, ack_rx) = mpsc::channel();
        self.submit(0, Command::Flush(ack_tx))?;
        self.wait_ack(&ack_rx, timeout)
    }

    /// Switches the target after draining what was queued before the call.
    ///
    /// Entries queued earlier land in the old file; entries queued after
    /// the call returns land in the new one. On timeout the switch still
    /// happens once the worker reaches it.
    pub fn retarget(
        &self,
        target: FileTarget,
        timeout: Duration,
    ) -> LogResult<()> {
        let (ack_tx, ack_rx) = mpsc::channel();
        self.submit(0, Command::Retarget(target, ack_tx))?;
        self.wait_ack(&ack_rx, timeout)
    }

    /// Drains the queue and stops the worker. Later writes fail with
    /// [`LogError::WriterClosed`].
    pub fn shutdown(
        &self,
        timeout: Duration,
    ) -> LogResult<()> {
        let Some(sender) = self.sender.write().take() else {
            return Ok(());
        };

        let start = Instant::now();
        let (ack_tx, ack_rx) = mpsc::channel();
        if sender.send(Command::Shutdown(ack_tx)).is_err() {
            return Err(LogError::WriterClosed);
        }
        drop(sender);

        self.wait_ack(&ack_rx, timeout)?;

        if let Some(handle) = self.worker.lock().take() {
            if handle.join().is_err() {
                tracing::error!("Log writer thread panicked during shutdown");
            }
        }

        tracing::debug!(
            shutdown_duration_ms = start.elapsed().as_millis() as u64,
            "Queued log writer stopped"
        );
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.sender.read().is_none()
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    pub fn current_path(&self) -> PathBuf {
        self.file.current_path()
    }

    pub fn file(&self) -> &FileWriter {
        &self.file
    }

    pub fn stats(&self) -> WriterStats {
        self.file.metrics().get_stats(self.pending())
    }

    fn submit(
        &self,
        count: usize,
        command: Command,
    ) -> LogResult<()> {
        let guard = self.sender.read();
        let Some(sender) = guard.as_ref() else {
            return Err(LogError::WriterClosed);
        };

        self.pending.fetch_add(count, Ordering::AcqRel);
        if sender.send(command).is_err() {
            self.pending.fetch_sub(count, Ordering::AcqRel);
            return Err(LogError::WriterClosed);
        }
        Ok(())
    }

    fn wait_ack(
        &self,
        ack: &Receiver<()>,
        timeout: Duration,
    ) -> LogResult<()> {
        match ack.recv_timeout(timeout) {
            Ok(()) => Ok(()),
            Err(RecvTimeoutError::Timeout) => {
                let pending = self.pending();
                tracing::warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    pending,
                    "Log writer did not drain in time"
                );
                Err(LogError::FlushTimeout {
                    waited: timeout,
                    pending,
                })
            }
            Err(RecvTimeoutError::Disconnected) => Err(LogError::WriterClosed),
        }
    }
}

impl Drop for QueuedWriter {
    fn drop(&mut self) {
        if !self.is_closed() {
            if let Err(e) = self.shutdown(DEFAULT_DRAIN_TIMEOUT) {
                eprintln!("WARNING: queued log writer dropped without clean shutdown: {e}");
            }
        }
    }
}

impl std::fmt::Debug for QueuedWriter {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("QueuedWriter")
            .field("file", &self.file)
            .field("pending", &self.pending())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Фоновый воркер: единственный потребитель очереди.
fn drain_worker(
    rx: Receiver<Command>,
    file: Arc<FileWriter>,
    pending: Arc<AtomicUsize>,
) {
    while let Ok(command) = rx.recv() {
        match command {
            Command::Entry(entry) => write_one(&file, &pending, &entry),
            Command::Batch(entries) => {
                for entry in &entries {
                    write_one(&file, &pending, entry);
                }
            }
            Command::Retarget(target, ack) => {
                tracing::debug!(
                    base_name = %target.base_name,
                    directory = %target.directory.display(),
                    "Log target switched"
                );
                file.set_target(target);
                let _ = ack.send(());
            }
            Command::Flush(ack) => {
                let _ = ack.send(());
            }
            Command::Shutdown(ack) => {
                let _ = ack.send(());
                break;
            }
        }
    }
}

fn write_one(
    file: &FileWriter,
    pending: &AtomicUsize,
    entry: &LogEntry,
) {
    if let Err(e) = file.write(entry) {
        tracing::warn!(error = %e, level = %entry.level(), "Queued log entry was not written");
    }
    pending.fetch_sub(1, Ordering::AcqRel);
}
