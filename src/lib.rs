/// Logger configuration loading.
pub mod config;
/// Error types of the writers and the archiver.
pub mod error;
/// Rolling file logging: formatting, path resolution, writers, archiving.
pub mod logging;

// -----------------------------------------------------------------------------
//  Frequently used public types
// -----------------------------------------------------------------------------

/// config
pub use config::{ArchiveConfig, LoggerConfig};
/// Operation errors and result types.
pub use error::{ArchiveError, ArchiveResult, LogError, LogResult};
/// Logger, entries and the archiver.
pub use logging::{
    ArchiveReport, Archiver, ExceptionDetail, FileTarget, LineFormatter, LogEntry, Logger,
    Severity, TimestampMode, Timezone, WriteStrategy,
};
