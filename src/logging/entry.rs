use std::error::Error;

use chrono::{DateTime, Utc};

use super::level::Severity;

/// Structured failure detail attached to an error entry.
///
/// `cause` follows the `source()` chain of the originating error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionDetail {
    pub type_name: String,
    pub message: String,
    pub cause: Option<Box<ExceptionDetail>>,
}

/// A single log record. Timestamp and level are fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    timestamp: DateTime<Utc>,
    level: Severity,
    message: String,
    exception: Option<ExceptionDetail>,
}

impl ExceptionDetail {
    pub fn new(
        type_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(
        mut self,
        cause: ExceptionDetail,
    ) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Строит цепочку из ошибки и всех её `source()`.
    ///
    /// Имя типа известно только для внешней ошибки; у причин остаётся
    /// только сообщение.
    pub fn from_error<E>(err: &E) -> Self
    where
        E: Error + ?Sized,
    {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(inner) = source {
            causes.push(inner.to_string());
            source = inner.source();
        }

        let mut cause = None;
        for message in causes.into_iter().rev() {
            cause = Some(Box::new(ExceptionDetail {
                type_name: String::new(),
                message,
                cause,
            }));
        }

        Self {
            type_name: short_type_name(std::any::type_name::<E>()).to_string(),
            message: err.to_string(),
            cause,
        }
    }

    /// Iterates this detail followed by every nested cause.
    pub fn chain(&self) -> impl Iterator<Item = &ExceptionDetail> {
        std::iter::successors(Some(self), |&d| d.cause.as_deref())
    }
}

impl LogEntry {
    /// Creates an entry stamped with the current instant.
    pub fn new(
        level: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self::at(Utc::now(), level, message)
    }

    pub fn at(
        timestamp: DateTime<Utc>,
        level: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            level,
            message: message.into(),
            exception: None,
        }
    }

    pub fn with_exception(
        mut self,
        exception: ExceptionDetail,
    ) -> Self {
        self.exception = Some(exception);
        self
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn level(&self) -> Severity {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn exception(&self) -> Option<&ExceptionDetail> {
        self.exception.as_ref()
    }
}

/// `std::io::error::Error` -> `Error`, generics are kept as-is.
fn short_type_name(full: &str) -> &str {
    let head = full.split('<').next().unwrap_or(full);
    match head.rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}
