pub mod archive;
pub mod clock;
pub mod entry;
pub mod formatter;
pub mod global;
pub mod level;
pub mod logger;
pub mod path;
pub mod sinks;

pub use archive::{
    ArchiveReport, ArchiveState, ArchiveStats, Archiver, YearOutcome, YearReport,
    DEFAULT_ARCHIVE_DIR_NAME, DEFAULT_ARCHIVE_THRESHOLD_DAYS,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use entry::{ExceptionDetail, LogEntry};
pub use formatter::{
    format, format_timestamp, parse_line, parse_timestamp, LineFormatter, ParsedLine,
    TimestampMode, Timezone,
};
pub use level::{should_emit, ParseSeverityError, Severity};
pub use logger::Logger;
pub use path::{parse_file_date, FileTarget, DEFAULT_BASE_NAME, DEFAULT_EXTENSION};
pub use sinks::{FileWriter, QueuedWriter, WriteStrategy, Writer, WriterStats};
