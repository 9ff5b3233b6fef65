use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

pub type LogResult<T> = Result<T, LogError>;

#[derive(Error, Debug)]
pub enum LogError {
    // ==== System / External ====
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    // ==== Writer ====
    #[error("Flush timed out after {}ms with {pending} entries pending", .waited.as_millis())]
    FlushTimeout { waited: Duration, pending: usize },

    #[error("Log writer is closed")]
    WriterClosed,

    #[error("Failed to spawn writer thread: {0}")]
    Spawn(#[source] io::Error),

    // ==== General ====
    #[error("Invalid logger configuration: {0}")]
    Config(String),
}

impl LogError {
    pub fn io(
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Таймаут flush не фатален: вызывающий может повторить попытку.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::FlushTimeout { .. })
    }
}
