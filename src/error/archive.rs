use std::{io, path::PathBuf};

use thiserror::Error;

pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Ошибки архивации каталогов со старыми логами.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// The archive exists but does not hold every file of the source directory.
    #[error("Archive {} is missing {} file(s): {}", .archive.display(), .missing.len(), .missing.join(", "))]
    Incomplete {
        archive: PathBuf,
        missing: Vec<String>,
    },

    /// A file of the year directory differs from its namesake in the archive.
    #[error("Archive {} already holds different content for: {}", .archive.display(), .names.join(", "))]
    Collision {
        archive: PathBuf,
        names: Vec<String>,
    },

    #[error("Archive target already exists: {}", .target.display())]
    Conflict { target: PathBuf },
}

impl ArchiveError {
    pub fn io(
        path: impl Into<PathBuf>,
        source: io::Error,
    ) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
