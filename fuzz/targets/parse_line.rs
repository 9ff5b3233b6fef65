#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use logroll::logging::{parse_file_date, parse_line, parse_timestamp, TimestampMode, Timezone};

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    line: String,
    utc: bool,
    mode: u8,
}

fuzz_target!(|input: FuzzInput| {
    let timezone = if input.utc {
        Timezone::Utc
    } else {
        Timezone::Local
    };
    let mode = TimestampMode::ALL[usize::from(input.mode) % TimestampMode::ALL.len()];

    // Ни разбор строки, ни разбор имени файла не должны паниковать.
    if let Some(parsed) = parse_line(&input.line) {
        assert!(!parsed.timestamp.is_empty());
        let _ = parse_timestamp(parsed.timestamp, timezone, mode);
    }
    let _ = parse_file_date(&input.line);
});
