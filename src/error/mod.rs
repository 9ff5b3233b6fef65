pub mod archive;
pub mod log;

pub use archive::{ArchiveError, ArchiveResult};
pub use log::{LogError, LogResult};
