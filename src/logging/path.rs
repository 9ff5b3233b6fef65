use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};

/// Base name used when none (or a blank one) is configured.
pub const DEFAULT_BASE_NAME: &str = "logroll";
/// Extension appended when the base name carries none.
pub const DEFAULT_EXTENSION: &str = ".txt";
/// Date stamp written into new file names: `2026-10-19`.
pub const DATE_STAMP_FORMAT: &str = "%Y-%m-%d";
/// Date stamp found in files from older releases: `10-19-2026`.
pub const LEGACY_DATE_STAMP_FORMAT: &str = "%m-%d-%Y";

/// Where and under which name the active log file lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTarget {
    pub directory: PathBuf,
    pub base_name: String,
    pub append_date: bool,
    /// Put dated files under `<directory>/<yyyy>/`. Undated files always
    /// stay in `directory`.
    pub group_by_year: bool,
}

impl FileTarget {
    pub fn new(
        directory: impl Into<PathBuf>,
        base_name: impl Into<String>,
        append_date: bool,
    ) -> Self {
        Self {
            directory: directory.into(),
            base_name: base_name.into(),
            append_date,
            group_by_year: true,
        }
    }

    pub fn with_group_by_year(
        mut self,
        group_by_year: bool,
    ) -> Self {
        self.group_by_year = group_by_year;
        self
    }

    /// Resolves the file that entries written on `date` go to.
    pub fn resolve(
        &self,
        date: NaiveDate,
    ) -> PathBuf {
        let dir = if self.group_by_year && self.append_date {
            year_directory(&self.directory, date.year())
        } else {
            self.directory.clone()
        };
        dir.join(file_name(&self.base_name, self.append_date, date))
    }
}

/// `<directory>/<yyyy>`
pub fn year_directory(
    directory: &Path,
    year: i32,
) -> PathBuf {
    directory.join(format!("{year:04}"))
}

/// Builds the file name: `<base>[_<yyyy-MM-dd>]<ext>`.
///
/// A blank base name falls back to [`DEFAULT_BASE_NAME`]; a missing
/// extension becomes [`DEFAULT_EXTENSION`].
pub fn file_name(
    base_name: &str,
    append_date: bool,
    date: NaiveDate,
) -> String {
    let base_name = match base_name.trim() {
        "" => DEFAULT_BASE_NAME,
        trimmed => trimmed,
    };
    let (stem, extension) = split_extension(base_name);
    let extension = extension.unwrap_or(DEFAULT_EXTENSION);

    if append_date {
        format!("{stem}_{}{extension}", date.format(DATE_STAMP_FORMAT))
    } else {
        format!("{stem}{extension}")
    }
}

/// Splits `app.log` into (`app`, `.log`). Leading-dot names have no extension.
fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => (&name[..idx], Some(&name[idx..])),
        _ => (name, None),
    }
}

/// Extracts the date stamp from a daily file name.
///
/// Both `<base>_2026-10-19.txt` and the legacy `<base>_10-19-2026.txt`
/// are recognised.
pub fn parse_file_date(file_name: &str) -> Option<NaiveDate> {
    let (stem, _) = split_extension(file_name);
    if stem.len() < 10 || !stem.is_char_boundary(stem.len() - 10) {
        return None;
    }
    let tail = &stem[stem.len() - 10..];

    NaiveDate::parse_from_str(tail, DATE_STAMP_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(tail, LEGACY_DATE_STAMP_FORMAT))
        .ok()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[test]
    fn test_file_name_with_date() {
        assert_eq!(
            file_name("TestLogFile", true, day()),
            "TestLogFile_2026-10-19.txt"
        );
        assert_eq!(file_name("app.log", true, day()), "app_2026-10-19.log");
    }

    #[test]
    fn test_file_name_without_date() {
        assert_eq!(file_name("TestLogFile", false, day()), "TestLogFile.txt");
        assert_eq!(file_name("app.log", false, day()), "app.log");
    }

    /// Тест проверяет fallback на имя по умолчанию для пустого base name.
    #[test]
    fn test_blank_base_name_falls_back() {
        assert_eq!(file_name("", false, day()), "logroll.txt");
        assert_eq!(file_name("   ", true, day()), "logroll_2026-10-19.txt");
    }

    #[test]
    fn test_dotfile_and_trailing_dot() {
        assert_eq!(file_name(".hidden", false, day()), ".hidden.txt");
        assert_eq!(file_name("trail.", true, day()), "trail._2026-10-19.txt");
    }

    #[test]
    fn test_resolve_groups_by_year() {
        let target = FileTarget::new("/var/log/app", "service", true);
        assert_eq!(
            target.resolve(day()),
            PathBuf::from("/var/log/app/2026/service_2026-10-19.txt")
        );

        let flat = target.with_group_by_year(false);
        assert_eq!(
            flat.resolve(day()),
            PathBuf::from("/var/log/app/service_2026-10-19.txt")
        );
    }

    /// Тест проверяет смену пути на границе суток.
    #[test]
    fn test_resolve_rolls_over_with_date() {
        let target = FileTarget::new("logs", "svc", true);
        let next = day().succ_opt().unwrap();
        assert_ne!(target.resolve(day()), target.resolve(next));

        let undated = FileTarget::new("logs", "svc", false).with_group_by_year(false);
        assert_eq!(undated.resolve(day()), undated.resolve(next));
    }

    /// Файл без даты не переезжает в каталог нового года 1 января.
    #[test]
    fn test_undated_file_ignores_year_grouping() {
        let target = FileTarget::new("logs", "svc", false);
        assert!(target.group_by_year);
        let new_year = NaiveDate::from_ymd_opt(2027, 1, 1).unwrap();
        assert_eq!(target.resolve(day()), PathBuf::from("logs/svc.txt"));
        assert_eq!(target.resolve(day()), target.resolve(new_year));
    }

    #[test]
    fn test_parse_file_date_both_formats() {
        assert_eq!(parse_file_date("svc_2026-10-19.txt"), Some(day()));
        assert_eq!(parse_file_date("svc_10-19-2026.txt"), Some(day()));
        assert_eq!(parse_file_date("2026-10-19"), Some(day()));
        assert_eq!(parse_file_date("svc.txt"), None);
        assert_eq!(parse_file_date("svc_13-45-2026.txt"), None);
        assert_eq!(parse_file_date("журнал_тест.txt"), None);
    }

    proptest! {
        /// Имя файла всегда равно base + ("_" + дата) + расширение.
        #[test]
        fn prop_file_name_matches_expected(
            base in "[A-Za-z][A-Za-z0-9_-]{0,15}",
            append in any::<bool>(),
            offset in 0i64..3650,
        ) {
            let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + chrono::Duration::days(offset);
            let expected = if append {
                format!("{base}_{}.txt", date.format("%Y-%m-%d"))
            } else {
                format!("{base}.txt")
            };
            prop_assert_eq!(file_name(&base, append, date), expected.clone());

            if append {
                prop_assert_eq!(parse_file_date(&expected), Some(date));
            }
        }
    }
}
