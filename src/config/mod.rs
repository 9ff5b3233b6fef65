pub mod settings;

pub use settings::{ArchiveConfig, LoggerConfig, ENV_PREFIX};
