pub mod file;
pub mod metrics;
pub mod queued;
pub mod writer;

// Publicly re-export the writer types to simplify access from external code.
pub use file::FileWriter;
pub use metrics::{WriterMetrics, WriterStats};
pub use queued::{QueuedWriter, DEFAULT_DRAIN_TIMEOUT};
pub use writer::{WriteStrategy, Writer};
