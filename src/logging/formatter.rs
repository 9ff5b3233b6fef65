use std::fmt::Write;

use chrono::{DateTime, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{
    entry::{ExceptionDetail, LogEntry},
    level::Severity,
};

/// Field separator of a rendered line.
pub const FIELD_SEPARATOR: char = ',';
/// Prefix of every nested cause segment.
pub const CAUSED_BY: &str = "Caused by: ";

#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Timezone {
    Utc,
    #[default]
    Local,
}

/// Порядок полей даты и формат часов в отметке времени.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TimestampMode {
    /// 10/19/2026 01:05:09 PM
    MonthDayYear12h,
    /// 10/19/2026 13:05:09
    MonthDayYear24h,
    /// 2026-10-19 01:05:09 PM
    YearMonthDay12h,
    /// 2026-10-19 13:05:09
    #[default]
    YearMonthDay24h,
}

/// Renders entries as `<timestamp>,<LEVEL>,<message>[,<exception>...]`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LineFormatter {
    pub timezone: Timezone,
    pub mode: TimestampMode,
}

/// A rendered line split back into its leading fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine<'a> {
    pub timestamp: &'a str,
    pub level: Severity,
    /// Message plus any exception segments.
    pub rest: &'a str,
}

impl TimestampMode {
    pub const ALL: [TimestampMode; 4] = [
        TimestampMode::MonthDayYear12h,
        TimestampMode::MonthDayYear24h,
        TimestampMode::YearMonthDay12h,
        TimestampMode::YearMonthDay24h,
    ];

    /// strftime pattern for this mode.
    pub fn pattern(&self) -> &'static str {
        match self {
            TimestampMode::MonthDayYear12h => "%m/%d/%Y %I:%M:%S %p",
            TimestampMode::MonthDayYear24h => "%m/%d/%Y %H:%M:%S",
            TimestampMode::YearMonthDay12h => "%Y-%m-%d %I:%M:%S %p",
            TimestampMode::YearMonthDay24h => "%Y-%m-%d %H:%M:%S",
        }
    }
}

impl LineFormatter {
    pub fn new(
        timezone: Timezone,
        mode: TimestampMode,
    ) -> Self {
        Self { timezone, mode }
    }

    pub fn format(
        &self,
        entry: &LogEntry,
    ) -> String {
        format(entry, self.timezone, self.mode)
    }
}

/// Renders the timestamp of an instant in the requested zone and mode.
pub fn format_timestamp(
    at: DateTime<Utc>,
    timezone: Timezone,
    mode: TimestampMode,
) -> String {
    match timezone {
        Timezone::Utc => at.format(mode.pattern()).to_string(),
        Timezone::Local => at.with_timezone(&Local).format(mode.pattern()).to_string(),
    }
}

/// Formats a log line. Never fails: an empty message yields an empty field.
///
/// CR and LF in the message and exception text are written as `\r` and
/// `\n`, so every entry stays on one physical line.
pub fn format(
    entry: &LogEntry,
    timezone: Timezone,
    mode: TimestampMode,
) -> String {
    let mut line = format_timestamp(entry.timestamp(), timezone, mode);
    line.push(FIELD_SEPARATOR);
    line.push_str(entry.level().as_str());
    line.push(FIELD_SEPARATOR);
    push_escaped(&mut line, entry.message());

    if let Some(exception) = entry.exception() {
        write_exception(&mut line, exception);
    }
    line
}

fn write_exception(
    out: &mut String,
    exception: &ExceptionDetail,
) {
    for (depth, detail) in exception.chain().enumerate() {
        out.push(FIELD_SEPARATOR);
        if depth > 0 {
            out.push_str(CAUSED_BY);
        }
        if !detail.type_name.is_empty() {
            // write! в String не может вернуть ошибку
            let _ = write!(out, "{}: ", detail.type_name);
        }
        push_escaped(out, &detail.message);
    }
}

fn push_escaped(
    out: &mut String,
    text: &str,
) {
    for c in text.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
}

/// Parses a timestamp rendered by [`format_timestamp`] back into an instant.
///
/// Seconds are the finest unit kept, so the result is within one second of
/// the capture instant.
pub fn parse_timestamp(
    text: &str,
    timezone: Timezone,
    mode: TimestampMode,
) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(text.trim(), mode.pattern()).ok()?;
    match timezone {
        Timezone::Utc => Some(naive.and_utc()),
        Timezone::Local => naive
            .and_local_timezone(Local)
            .earliest()
            .map(|local| local.with_timezone(&Utc)),
    }
}

/// Splits a rendered line into timestamp text, level and the rest.
///
/// Returns `None` for anything that is not a well-formed line; never panics.
pub fn parse_line(line: &str) -> Option<ParsedLine<'_>> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut fields = line.splitn(3, FIELD_SEPARATOR);
    let timestamp = fields.next()?;
    let level = fields.next()?.parse::<Severity>().ok()?;
    let rest = fields.next()?;

    if timestamp.is_empty() {
        return None;
    }

    Some(ParsedLine {
        timestamp,
        level,
        rest,
    })
}
