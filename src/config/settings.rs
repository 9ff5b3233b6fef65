use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::{
    error::{LogError, LogResult},
    logging::{
        archive::{parse_year, Archiver, DEFAULT_ARCHIVE_DIR_NAME, DEFAULT_ARCHIVE_THRESHOLD_DAYS},
        clock::Clock,
        formatter::{LineFormatter, TimestampMode, Timezone},
        level::Severity,
        path::{FileTarget, DEFAULT_BASE_NAME},
        sinks::WriteStrategy,
    },
};

/// Prefix of environment overrides: `LOGROLL_THRESHOLD=warn`,
/// `LOGROLL_ARCHIVE__THRESHOLD_DAYS=60`.
pub const ENV_PREFIX: &str = "LOGROLL";

const DEFAULT_DIRECTORY: &str = "logs";
const DEFAULT_FLUSH_TIMEOUT_MS: u64 = 5000;

/// Logger configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub base_name: String,
    pub directory: PathBuf,
    pub append_date: bool,
    pub threshold: Severity,
    /// Dated files go to `<directory>/<yyyy>/`; undated ones stay put.
    pub group_by_year: bool,
    pub timezone: Timezone,
    pub timestamp_mode: TimestampMode,
    pub strategy: WriteStrategy,
    pub flush_timeout_ms: u64,
    pub archive: ArchiveConfig,
}

/// Настройки архивации старых логов.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Directory inside `directory` that receives `<year>.zip` files.
    pub dir_name: String,
    pub threshold_days: u32,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            base_name: DEFAULT_BASE_NAME.to_string(),
            directory: PathBuf::from(DEFAULT_DIRECTORY),
            append_date: true,
            threshold: Severity::default(),
            group_by_year: true,
            timezone: Timezone::default(),
            timestamp_mode: TimestampMode::default(),
            strategy: WriteStrategy::default(),
            flush_timeout_ms: DEFAULT_FLUSH_TIMEOUT_MS,
            archive: ArchiveConfig::default(),
        }
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            dir_name: DEFAULT_ARCHIVE_DIR_NAME.to_string(),
            threshold_days: DEFAULT_ARCHIVE_THRESHOLD_DAYS,
        }
    }
}

impl LoggerConfig {
    /// Defaults, then the optional file at `path`, then `LOGROLL_*`
    /// environment variables. The result is validated.
    pub fn load(path: Option<&Path>) -> LogResult<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        let cfg = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: LoggerConfig = cfg.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> LogResult<()> {
        if self.flush_timeout_ms == 0 {
            return Err(LogError::Config(
                "flush_timeout_ms must be greater than 0".into(),
            ));
        }
        let dir_name = self.archive.dir_name.trim();
        if dir_name.is_empty() {
            return Err(LogError::Config("archive.dir_name cannot be empty".into()));
        }
        if dir_name.contains(['/', '\\']) || dir_name == "." || dir_name == ".." {
            return Err(LogError::Config(format!(
                "archive.dir_name must be a plain directory name, got {dir_name:?}"
            )));
        }
        if parse_year(dir_name).is_some() {
            return Err(LogError::Config(format!(
                "archive.dir_name {dir_name:?} would be taken for a year directory"
            )));
        }
        Ok(())
    }

    pub fn file_target(&self) -> FileTarget {
        FileTarget::new(&self.directory, &self.base_name, self.append_date)
            .with_group_by_year(self.group_by_year)
    }

    pub fn formatter(&self) -> LineFormatter {
        LineFormatter::new(self.timezone, self.timestamp_mode)
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }

    pub fn archiver(
        &self,
        clock: Arc<dyn Clock>,
    ) -> Archiver {
        Archiver::new(&self.directory)
            .with_archive_dir_name(self.archive.dir_name.trim())
            .with_threshold_days(self.archive.threshold_days)
            .with_clock(clock)
    }
}
