//! Bundling of old year directories into `<log_dir>/<archive_dir>/<year>.zip`.
//!
//! Each year directory moves through `Unarchived → Bundling → Archived`, or
//! stays `Skipped` while it is too recent. The archive is written to a temp
//! file next to its final location and persisted without clobbering, so a
//! reader never sees a partial `<year>.zip`. The year directory is removed
//! only after every file in it is confirmed present in the archive.
//!
//! When `<year>.zip` already exists (an earlier pass, or a stray moved in
//! from the log directory), files it lacks are appended to a copy that then
//! replaces it.

use std::{
    collections::{BTreeMap, HashSet},
    fs::{self, File},
    io::{self, Read, Seek, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use chrono::{DateTime, Datelike, Local, NaiveDate};
use tempfile::NamedTempFile;
use zip::{
    result::ZipError, write::SimpleFileOptions, CompressionMethod, ZipArchive, ZipWriter,
};

use super::{
    clock::{Clock, SystemClock},
    path::{parse_file_date, year_directory},
};
use crate::error::{ArchiveError, ArchiveResult};

/// Name of the archive directory inside the log directory.
pub const DEFAULT_ARCHIVE_DIR_NAME: &str = "ArchivedLogs";
/// Days after January 1 of the following year before a year is bundled.
pub const DEFAULT_ARCHIVE_THRESHOLD_DAYS: u32 = 30;

const ARCHIVE_EXTENSION: &str = "zip";
/// Entries at or above this size are written with Zip64 headers.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveState {
    Unarchived,
    Bundling,
    Archived,
    Skipped,
}

/// What happened to one year during a pass.
#[derive(Debug)]
pub enum YearOutcome {
    /// Not eligible yet.
    Skipped,
    /// Bundled in this pass; the year directory was removed.
    Archived { archive: PathBuf, files: usize },
    /// Files missing from an existing archive were added to it; the year
    /// directory was removed.
    Merged { archive: PathBuf, added: usize },
    /// The archive already held every file; the leftover directory was removed.
    AlreadyArchived { archive: PathBuf },
    /// A loose `<year>.zip` was moved into the archive directory.
    StrayMoved { archive: PathBuf },
    /// The year stays unarchived; nothing on disk was changed for it.
    Failed(ArchiveError),
}

#[derive(Debug)]
pub struct YearReport {
    pub year: i32,
    pub outcome: YearOutcome,
}

/// Result of one archiver pass.
#[derive(Debug, Default)]
pub struct ArchiveReport {
    pub years: Vec<YearReport>,
    /// Loose dated files moved into their year directory.
    pub filed: usize,
}

/// Счётчики архивации.
#[derive(Debug, Default)]
pub struct ArchiveMetrics {
    pub passes: AtomicU64,
    pub archived: AtomicU64,
    pub strays_moved: AtomicU64,
    pub files_filed: AtomicU64,
    pub failures: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArchiveStats {
    pub passes: u64,
    pub archived: u64,
    pub strays_moved: u64,
    pub files_filed: u64,
    pub failures: u64,
}

/// On-demand archiver for a log directory.
///
/// Not a timer: a housekeeping task is expected to call [`Archiver::run`]
/// periodically.
#[derive(Debug, Clone)]
pub struct Archiver {
    log_dir: PathBuf,
    archive_dir_name: String,
    threshold_days: u32,
    clock: Arc<dyn Clock>,
    metrics: Arc<ArchiveMetrics>,
}

impl YearOutcome {
    pub fn state(&self) -> ArchiveState {
        match self {
            YearOutcome::Skipped => ArchiveState::Skipped,
            YearOutcome::Archived { .. }
            | YearOutcome::Merged { .. }
            | YearOutcome::AlreadyArchived { .. }
            | YearOutcome::StrayMoved { .. } => ArchiveState::Archived,
            YearOutcome::Failed(_) => ArchiveState::Unarchived,
        }
    }
}

impl ArchiveReport {
    /// Years bundled in this pass, into a new or an existing archive.
    pub fn archived_years(&self) -> Vec<i32> {
        self.years
            .iter()
            .filter(|r| {
                matches!(
                    r.outcome,
                    YearOutcome::Archived { .. } | YearOutcome::Merged { .. }
                )
            })
            .map(|r| r.year)
            .collect()
    }

    pub fn skipped_years(&self) -> Vec<i32> {
        self.years
            .iter()
            .filter(|r| r.outcome.state() == ArchiveState::Skipped)
            .map(|r| r.year)
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = (i32, &ArchiveError)> {
        self.years.iter().filter_map(|r| match &r.outcome {
            YearOutcome::Failed(e) => Some((r.year, e)),
            _ => None,
        })
    }

    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    /// `true` when the pass changed nothing on disk.
    pub fn is_noop(&self) -> bool {
        self.filed == 0
            && self
                .years
                .iter()
                .all(|r| matches!(r.outcome, YearOutcome::Skipped))
    }
}

impl ArchiveMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_stats(&self) -> ArchiveStats {
        ArchiveStats {
            passes: self.passes.load(Ordering::Relaxed),
            archived: self.archived.load(Ordering::Relaxed),
            strays_moved: self.strays_moved.load(Ordering::Relaxed),
            files_filed: self.files_filed.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    fn record(
        &self,
        outcome: &YearOutcome,
    ) {
        let counter = match outcome {
            YearOutcome::Archived { .. } | YearOutcome::Merged { .. } => &self.archived,
            YearOutcome::StrayMoved { .. } => &self.strays_moved,
            YearOutcome::Failed(_) => &self.failures,
            YearOutcome::Skipped | YearOutcome::AlreadyArchived { .. } => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl Archiver {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            archive_dir_name: DEFAULT_ARCHIVE_DIR_NAME.to_string(),
            threshold_days: DEFAULT_ARCHIVE_THRESHOLD_DAYS,
            clock: Arc::new(SystemClock),
            metrics: Arc::new(ArchiveMetrics::new()),
        }
    }

    pub fn with_archive_dir_name(
        mut self,
        name: impl Into<String>,
    ) -> Self {
        self.archive_dir_name = name.into();
        self
    }

    pub fn with_threshold_days(
        mut self,
        days: u32,
    ) -> Self {
        self.threshold_days = days;
        self
    }

    pub fn with_clock(
        mut self,
        clock: Arc<dyn Clock>,
    ) -> Self {
        self.clock = clock;
        self
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.log_dir.join(&self.archive_dir_name)
    }

    pub fn archive_path(
        &self,
        year: i32,
    ) -> PathBuf {
        self.archive_dir().join(archive_file_name(year))
    }

    pub fn metrics(&self) -> ArchiveStats {
        self.metrics.get_stats()
    }

    /// A year is eligible once more than `threshold_days` days have passed
    /// since January 1 of the following year. The current year never is.
    pub fn is_eligible(
        &self,
        year: i32,
        today: NaiveDate,
    ) -> bool {
        if year >= today.year() {
            return false;
        }
        match NaiveDate::from_ymd_opt(year + 1, 1, 1) {
            Some(next_year) => (today - next_year).num_days() > i64::from(self.threshold_days),
            None => false,
        }
    }

    /// Runs one pass over the log directory.
    ///
    /// Only pass-level problems (log directory unreadable, archive directory
    /// not creatable) are returned as `Err`; a failing year is recorded in
    /// the report and the remaining years are still processed.
    pub fn run(&self) -> ArchiveResult<ArchiveReport> {
        let mut report = ArchiveReport::default();
        if !self.log_dir.is_dir() {
            tracing::debug!(log_dir = %self.log_dir.display(), "No log directory, nothing to archive");
            return Ok(report);
        }

        self.metrics.passes.fetch_add(1, Ordering::Relaxed);
        let today = self.clock.today();
        let archive_dir = self.archive_dir();
        fs::create_dir_all(&archive_dir).map_err(|e| ArchiveError::io(&archive_dir, e))?;

        report.filed = self.file_loose_logs(today, &mut report.years)?;

        let scan = self.scan()?;

        for (year, stray) in &scan.strays {
            let outcome = self.move_stray(*year, stray);
            self.finish_year(&mut report.years, *year, outcome);
        }

        for (year, dir) in &scan.year_dirs {
            let outcome = if self.is_eligible(*year, today) {
                self.archive_year(*year, dir)
            } else {
                tracing::debug!(year, "Year not eligible for archiving yet");
                YearOutcome::Skipped
            };
            self.finish_year(&mut report.years, *year, outcome);
        }

        tracing::info!(
            log_dir = %self.log_dir.display(),
            archived = report.archived_years().len(),
            filed = report.filed,
            failed = report.failures().count(),
            "Log archive pass finished"
        );
        Ok(report)
    }

    fn finish_year(
        &self,
        years: &mut Vec<YearReport>,
        year: i32,
        outcome: YearOutcome,
    ) {
        if let YearOutcome::Failed(e) = &outcome {
            tracing::warn!(year, error = %e, "Archiving year failed, continuing with the rest");
        }
        self.metrics.record(&outcome);
        years.push(YearReport { year, outcome });
    }

    /// Moves loose dated daily files of past years into their year directory.
    fn file_loose_logs(
        &self,
        today: NaiveDate,
        years: &mut Vec<YearReport>,
    ) -> ArchiveResult<usize> {
        let mut filed = 0;
        for entry in read_dir(&self.log_dir)? {
            let path = entry.path();
            if !path.is_file() || parse_archive_year(&path).is_some() {
                continue;
            }
            let Some(date) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_file_date)
            else {
                continue;
            };
            if date.year() >= today.year() {
                continue;
            }

            let year_dir = year_directory(&self.log_dir, date.year());
            let result = fs::create_dir_all(&year_dir)
                .and_then(|_| fs::rename(&path, year_dir.join(entry.file_name())));
            match result {
                Ok(()) => {
                    filed += 1;
                    self.metrics.files_filed.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(file = %path.display(), year = date.year(), "Loose log file filed");
                }
                Err(e) => {
                    let outcome = YearOutcome::Failed(ArchiveError::io(&path, e));
                    self.finish_year(years, date.year(), outcome);
                }
            }
        }
        Ok(filed)
    }

    fn scan(&self) -> ArchiveResult<Scan> {
        let archive_dir = self.archive_dir();
        let mut scan = Scan::default();
        for entry in read_dir(&self.log_dir)? {
            let path = entry.path();
            if path == archive_dir {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };

            if path.is_dir() {
                if let Some(year) = parse_year(name) {
                    scan.year_dirs.insert(year, path);
                }
            } else if let Some(year) = parse_archive_year(&path) {
                scan.strays.insert(year, path);
            }
        }
        Ok(scan)
    }

    fn move_stray(
        &self,
        year: i32,
        stray: &Path,
    ) -> YearOutcome {
        let target = self.archive_path(year);
        if target.exists() {
            return YearOutcome::Failed(ArchiveError::Conflict { target });
        }
        match fs::rename(stray, &target) {
            Ok(()) => {
                tracing::info!(
                    from = %stray.display(),
                    to = %target.display(),
                    "Stray log archive moved"
                );
                YearOutcome::StrayMoved { archive: target }
            }
            Err(e) => YearOutcome::Failed(ArchiveError::io(stray, e)),
        }
    }

    fn archive_year(
        &self,
        year: i32,
        dir: &Path,
    ) -> YearOutcome {
        match self.try_archive_year(year, dir) {
            Ok(outcome) => outcome,
            Err(e) => YearOutcome::Failed(e),
        }
    }

    fn try_archive_year(
        &self,
        year: i32,
        dir: &Path,
    ) -> ArchiveResult<YearOutcome> {
        let target = self.archive_path(year);
        let files = collect_files(dir)?;
        let names = files
            .iter()
            .map(|f| entry_name(f))
            .collect::<Vec<_>>();

        if target.exists() {
            return self.complete_existing(year, dir, target, &files, &names);
        }

        tracing::info!(
            year,
            files = files.len(),
            state = ?ArchiveState::Bundling,
            "Bundling year directory"
        );
        bundle(&files, &self.archive_dir(), &target)?;
        verify_contains(&target, &names)?;
        remove_year_dir(dir)?;

        tracing::info!(
            year,
            archive = %target.display(),
            files = files.len(),
            "Year directory archived"
        );
        Ok(YearOutcome::Archived {
            archive: target,
            files: files.len(),
        })
    }
}

impl Archiver {
    /// A year directory whose archive already exists, e.g. after a stray
    /// `<year>.zip` was moved in. Files the archive lacks are added to it;
    /// a file whose archived copy has different content stops the year.
    fn complete_existing(
        &self,
        year: i32,
        dir: &Path,
        target: PathBuf,
        files: &[PathBuf],
        names: &[String],
    ) -> ArchiveResult<YearOutcome> {
        let (missing, collisions) = compare_with_archive(&target, files)?;
        if !collisions.is_empty() {
            return Err(ArchiveError::Collision {
                archive: target,
                names: collisions,
            });
        }

        if missing.is_empty() {
            remove_year_dir(dir)?;
            tracing::info!(year, archive = %target.display(), "Leftover year directory removed");
            return Ok(YearOutcome::AlreadyArchived { archive: target });
        }

        tracing::info!(
            year,
            files = missing.len(),
            state = ?ArchiveState::Bundling,
            "Adding missing files to existing archive"
        );
        merge(&missing, &self.archive_dir(), &target)?;
        verify_contains(&target, names)?;
        remove_year_dir(dir)?;

        tracing::info!(
            year,
            archive = %target.display(),
            added = missing.len(),
            "Year directory merged into existing archive"
        );
        Ok(YearOutcome::Merged {
            archive: target,
            added: missing.len(),
        })
    }
}

#[derive(Debug, Default)]
struct Scan {
    year_dirs: BTreeMap<i32, PathBuf>,
    strays: BTreeMap<i32, PathBuf>,
}

/// `2024` -> Some(2024); anything but four ASCII digits -> None.
pub(crate) fn parse_year(name: &str) -> Option<i32> {
    if name.len() == 4 && name.bytes().all(|b| b.is_ascii_digit()) {
        name.parse().ok()
    } else {
        None
    }
}

/// Year of a `<year>.zip` file name.
fn parse_archive_year(path: &Path) -> Option<i32> {
    let extension = path.extension()?.to_str()?;
    if !extension.eq_ignore_ascii_case(ARCHIVE_EXTENSION) {
        return None;
    }
    parse_year(path.file_stem()?.to_str()?)
}

fn archive_file_name(year: i32) -> String {
    format!("{year:04}.{ARCHIVE_EXTENSION}")
}

fn read_dir(dir: &Path) -> ArchiveResult<Vec<fs::DirEntry>> {
    fs::read_dir(dir)
        .and_then(|entries| entries.collect::<io::Result<Vec<_>>>())
        .map_err(|e| ArchiveError::io(dir, e))
}

/// All regular files under `dir`, nested ones included, sorted by path.
fn collect_files(dir: &Path) -> ArchiveResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        for entry in read_dir(&current)? {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                files.push(path);
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Flat entry name: the file name without any directory part.
fn entry_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn modified_time(metadata: &fs::Metadata) -> Option<zip::DateTime> {
    let modified: DateTime<Local> = metadata.modified().ok()?.into();
    zip::DateTime::try_from(modified.naive_local()).ok()
}

fn add_files<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    files: &[PathBuf],
) -> ArchiveResult<()> {
    for path in files {
        let metadata = fs::metadata(path).map_err(|e| ArchiveError::io(path, e))?;
        let mut options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .large_file(metadata.len() >= ZIP64_THRESHOLD);
        if let Some(modified) = modified_time(&metadata) {
            options = options.last_modified_time(modified);
        }

        zip.start_file(entry_name(path), options)?;
        let mut source = File::open(path).map_err(|e| ArchiveError::io(path, e))?;
        io::copy(&mut source, zip).map_err(|e| ArchiveError::io(path, e))?;
    }
    Ok(())
}

fn finish_synced(zip: ZipWriter<NamedTempFile>) -> ArchiveResult<NamedTempFile> {
    let mut tmp = zip.finish()?;
    tmp.as_file_mut()
        .sync_all()
        .map_err(|e| ArchiveError::io(tmp.path(), e))?;
    Ok(tmp)
}

/// Пишет zip во временный файл и атомарно переносит его в `target`.
fn bundle(
    files: &[PathBuf],
    archive_dir: &Path,
    target: &Path,
) -> ArchiveResult<()> {
    let tmp = NamedTempFile::new_in(archive_dir).map_err(|e| ArchiveError::io(archive_dir, e))?;
    let mut zip = ZipWriter::new(tmp);
    add_files(&mut zip, files)?;

    finish_synced(zip)?
        .persist_noclobber(target)
        .map_err(|e| {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                ArchiveError::Conflict {
                    target: target.to_path_buf(),
                }
            } else {
                ArchiveError::io(target, e.error)
            }
        })?;
    Ok(())
}

/// Дописывает `files` в копию существующего архива и атомарно заменяет им
/// `target`. Исходный архив не меняется до замены.
fn merge(
    files: &[PathBuf],
    archive_dir: &Path,
    target: &Path,
) -> ArchiveResult<()> {
    let mut tmp =
        NamedTempFile::new_in(archive_dir).map_err(|e| ArchiveError::io(archive_dir, e))?;
    let mut existing = File::open(target).map_err(|e| ArchiveError::io(target, e))?;
    io::copy(&mut existing, tmp.as_file_mut()).map_err(|e| ArchiveError::io(target, e))?;

    let mut zip = ZipWriter::new_append(tmp)?;
    add_files(&mut zip, files)?;

    finish_synced(zip)?
        .persist(target)
        .map_err(|e| ArchiveError::io(target, e.error))?;
    Ok(())
}

/// Splits `files` into those absent from `archive` and the names whose
/// archived copy differs from the file on disk.
fn compare_with_archive(
    archive: &Path,
    files: &[PathBuf],
) -> ArchiveResult<(Vec<PathBuf>, Vec<String>)> {
    let file = File::open(archive).map_err(|e| ArchiveError::io(archive, e))?;
    let mut zip = ZipArchive::new(file)?;

    let mut missing = Vec::new();
    let mut collisions = Vec::new();
    for path in files {
        let name = entry_name(path);
        let mut entry = match zip.by_name(&name) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => {
                missing.push(path.clone());
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let size = entry.size();
        if !same_content(&mut entry, size, path)? {
            collisions.push(name);
        }
    }
    Ok((missing, collisions))
}

fn same_content(
    archived: &mut impl Read,
    archived_size: u64,
    path: &Path,
) -> ArchiveResult<bool> {
    let metadata = fs::metadata(path).map_err(|e| ArchiveError::io(path, e))?;
    if metadata.len() != archived_size {
        return Ok(false);
    }
    let mut packed = Vec::new();
    archived
        .read_to_end(&mut packed)
        .map_err(|e| ArchiveError::io(path, e))?;
    let on_disk = fs::read(path).map_err(|e| ArchiveError::io(path, e))?;
    Ok(packed == on_disk)
}

fn verify_contains(
    archive: &Path,
    names: &[String],
) -> ArchiveResult<()> {
    let file = File::open(archive).map_err(|e| ArchiveError::io(archive, e))?;
    let zip = ZipArchive::new(file)?;
    let present: HashSet<&str> = zip.file_names().collect();

    let missing: Vec<String> = names
        .iter()
        .filter(|name| !present.contains(name.as_str()))
        .cloned()
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ArchiveError::Incomplete {
            archive: archive.to_path_buf(),
            missing,
        })
    }
}

fn remove_year_dir(dir: &Path) -> ArchiveResult<()> {
    fs::remove_dir_all(dir).map_err(|e| ArchiveError::io(dir, e))
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::logging::clock::ManualClock;

    fn date(
        y: i32,
        m: u32,
        d: u32,
    ) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn archiver_on(
        dir: &Path,
        today: NaiveDate,
        threshold_days: u32,
    ) -> Archiver {
        Archiver::new(dir)
            .with_threshold_days(threshold_days)
            .with_clock(Arc::new(ManualClock::at_local_date(today)))
    }

    fn zip_names(path: &Path) -> Vec<String> {
        let archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        names
    }

    #[test]
    fn test_parse_year_and_archive_year() {
        assert_eq!(parse_year("2024"), Some(2024));
        assert_eq!(parse_year("24"), None);
        assert_eq!(parse_year("20x4"), None);
        assert_eq!(parse_archive_year(Path::new("/logs/2023.zip")), Some(2023));
        assert_eq!(parse_archive_year(Path::new("/logs/2023.ZIP")), Some(2023));
        assert_eq!(parse_archive_year(Path::new("/logs/2023.tar")), None);
        assert_eq!(parse_archive_year(Path::new("/logs/old.zip")), None);
    }

    /// Тест проверяет границу: ровно threshold дней не архивирует, на день
    /// больше архивирует.
    #[test]
    fn test_eligibility_boundary() {
        let archiver = Archiver::new("unused").with_threshold_days(30);
        // 2025-01-31 ровно 30 дней после 2025-01-01
        assert!(!archiver.is_eligible(2024, date(2025, 1, 31)));
        assert!(archiver.is_eligible(2024, date(2025, 2, 1)));
        // Текущий год никогда не архивируется
        assert!(!archiver.is_eligible(2025, date(2025, 12, 31)));
        assert!(!archiver.is_eligible(2026, date(2025, 12, 31)));

        let zero = Archiver::new("unused").with_threshold_days(0);
        assert!(!zero.is_eligible(2024, date(2025, 1, 1)));
        assert!(zero.is_eligible(2024, date(2025, 1, 2)));
    }

    #[test]
    fn test_missing_log_dir_is_not_an_error() {
        let tmp = tempdir().unwrap();
        let archiver = archiver_on(&tmp.path().join("absent"), date(2026, 10, 19), 30);
        let report = archiver.run().unwrap();
        assert!(report.years.is_empty());
        assert!(report.is_noop());
    }

    /// Тест проверяет плоскую упаковку: вложенные каталоги не сохраняются.
    #[test]
    fn test_bundle_flattens_nested_files() {
        let tmp = tempdir().unwrap();
        let year_dir = tmp.path().join("2020");
        fs::create_dir_all(year_dir.join("nested")).unwrap();
        fs::write(year_dir.join("a_2020-01-01.txt"), "a").unwrap();
        fs::write(year_dir.join("nested").join("b_2020-01-02.txt"), "b").unwrap();

        let archiver = archiver_on(tmp.path(), date(2026, 10, 19), 30);
        let report = archiver.run().unwrap();

        assert_eq!(report.archived_years(), vec![2020]);
        assert_eq!(
            zip_names(&archiver.archive_path(2020)),
            vec!["a_2020-01-01.txt", "b_2020-01-02.txt"]
        );
        assert!(!year_dir.exists());
    }

    /// Тест проверяет, что при конфликте имён частичный архив не остаётся, а
    /// каталог года не трогается.
    #[test]
    fn test_failed_bundle_leaves_directory_untouched() {
        let tmp = tempdir().unwrap();
        let year_dir = tmp.path().join("2019");
        fs::create_dir_all(year_dir.join("x")).unwrap();
        fs::create_dir_all(year_dir.join("y")).unwrap();
        fs::write(year_dir.join("x").join("same.txt"), "1").unwrap();
        fs::write(year_dir.join("y").join("same.txt"), "2").unwrap();
        fs::create_dir_all(tmp.path().join("2020")).unwrap();
        fs::write(tmp.path().join("2020").join("ok.txt"), "ok").unwrap();

        let archiver = archiver_on(tmp.path(), date(2026, 10, 19), 30);
        let report = archiver.run().unwrap();

        let failures: Vec<_> = report.failures().map(|(y, _)| y).collect();
        assert_eq!(failures, vec![2019]);
        assert!(year_dir.join("x").join("same.txt").exists());
        assert!(!archiver.archive_path(2019).exists());
        // Остальные годы обрабатываются дальше
        assert_eq!(report.archived_years(), vec![2020]);

        let leftovers: Vec<_> = fs::read_dir(archiver.archive_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(leftovers, vec!["2020.zip"]);
        assert_eq!(archiver.metrics().failures, 1);
    }

    /// Файл, появившийся в уже заархивированном году, дописывается в архив.
    #[test]
    fn test_late_file_is_merged_into_existing_archive() {
        let tmp = tempdir().unwrap();
        let archiver = archiver_on(tmp.path(), date(2026, 10, 19), 30);

        let year_dir = tmp.path().join("2021");
        fs::create_dir_all(&year_dir).unwrap();
        fs::write(year_dir.join("first.txt"), "1").unwrap();
        archiver.run().unwrap();
        assert!(!year_dir.exists());

        fs::create_dir_all(&year_dir).unwrap();
        fs::write(year_dir.join("late.txt"), "2").unwrap();
        let report = archiver.run().unwrap();

        assert!(report.is_clean());
        assert!(matches!(
            report.years[0].outcome,
            YearOutcome::Merged { added: 1, .. }
        ));
        assert_eq!(report.archived_years(), vec![2021]);
        assert_eq!(
            zip_names(&archiver.archive_path(2021)),
            vec!["first.txt", "late.txt"]
        );
        assert!(!year_dir.exists());
        assert!(archiver.run().unwrap().is_noop());
    }

    /// Тест проверяет миграцию: лишний `<year>.zip` и каталог того же года
    /// сводятся в один архив за один проход.
    #[test]
    fn test_stray_and_year_directory_end_in_one_archive() {
        let tmp = tempdir().unwrap();
        let stray = tmp.path().join("2020.zip");
        let mut old = ZipWriter::new(File::create(&stray).unwrap());
        old.start_file("old_2020-01-01.txt", SimpleFileOptions::default())
            .unwrap();
        old.write_all(b"from an older release\n").unwrap();
        old.finish().unwrap();

        let year_dir = tmp.path().join("2020");
        fs::create_dir_all(&year_dir).unwrap();
        fs::write(year_dir.join("a_2020-01-01.txt"), "leftover").unwrap();

        let archiver = archiver_on(tmp.path(), date(2026, 10, 19), 30);
        let report = archiver.run().unwrap();

        assert!(report.is_clean(), "{report:?}");
        assert!(matches!(report.years[0].outcome, YearOutcome::StrayMoved { .. }));
        assert!(matches!(report.years[1].outcome, YearOutcome::Merged { added: 1, .. }));
        assert!(!stray.exists());
        assert!(!year_dir.exists());
        assert_eq!(
            zip_names(&archiver.archive_path(2020)),
            vec!["a_2020-01-01.txt", "old_2020-01-01.txt"]
        );

        let second = archiver.run().unwrap();
        assert!(second.is_noop());
        assert_eq!(archiver.metrics().failures, 0);
    }

    /// Одноимённый файл с другим содержимым не перезаписывает архив.
    #[test]
    fn test_differing_namesake_is_a_collision() {
        let tmp = tempdir().unwrap();
        let archiver = archiver_on(tmp.path(), date(2026, 10, 19), 30);

        let year_dir = tmp.path().join("2021");
        fs::create_dir_all(&year_dir).unwrap();
        fs::write(year_dir.join("same.txt"), "archived").unwrap();
        archiver.run().unwrap();
        let before = fs::read(archiver.archive_path(2021)).unwrap();

        fs::create_dir_all(&year_dir).unwrap();
        fs::write(year_dir.join("same.txt"), "rewritten").unwrap();
        fs::write(year_dir.join("other.txt"), "new").unwrap();
        let report = archiver.run().unwrap();

        let (year, err) = report.failures().next().unwrap();
        assert_eq!(year, 2021);
        assert!(
            matches!(err, ArchiveError::Collision { names, .. } if names == &vec!["same.txt".to_string()])
        );
        assert!(year_dir.join("same.txt").exists());
        assert!(year_dir.join("other.txt").exists());
        assert_eq!(fs::read(archiver.archive_path(2021)).unwrap(), before);
    }

    /// Каталог архивов с именем-годом не принимается за каталог года.
    #[test]
    fn test_year_named_archive_dir_is_not_rescanned() {
        let tmp = tempdir().unwrap();
        let year_dir = tmp.path().join("2020");
        fs::create_dir_all(&year_dir).unwrap();
        fs::write(year_dir.join("a.txt"), "a").unwrap();

        let archiver =
            archiver_on(tmp.path(), date(2026, 10, 19), 30).with_archive_dir_name("1999");
        assert_eq!(archiver.run().unwrap().archived_years(), vec![2020]);

        let second = archiver.run().unwrap();
        assert!(second.is_noop());
        assert!(archiver.archive_path(2020).exists());
    }

    /// Тест проверяет перенос старых файлов из корня в каталог года с
    /// поддержкой обоих форматов дат.
    #[test]
    fn test_loose_files_are_filed_then_archived() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("svc_2022-03-01.txt"), "new format").unwrap();
        fs::write(tmp.path().join("svc_03-02-2022.txt"), "legacy format").unwrap();
        fs::write(tmp.path().join("svc_2026-10-19.txt"), "current year").unwrap();
        fs::write(tmp.path().join("notes.txt"), "undated").unwrap();

        let archiver = archiver_on(tmp.path(), date(2026, 10, 19), 30);
        let report = archiver.run().unwrap();

        assert_eq!(report.filed, 2);
        assert_eq!(
            zip_names(&archiver.archive_path(2022)),
            vec!["svc_03-02-2022.txt", "svc_2022-03-01.txt"]
        );
        assert!(tmp.path().join("svc_2026-10-19.txt").exists());
        assert!(tmp.path().join("notes.txt").exists());
    }

    #[test]
    fn test_stray_conflict_is_reported() {
        let tmp = tempdir().unwrap();
        let archiver = archiver_on(tmp.path(), date(2026, 10, 19), 30);
        fs::create_dir_all(archiver.archive_dir()).unwrap();
        fs::write(archiver.archive_path(2018), b"already here").unwrap();
        fs::write(tmp.path().join("2018.zip"), b"stray").unwrap();

        let report = archiver.run().unwrap();
        let (year, err) = report.failures().next().unwrap();
        assert_eq!(year, 2018);
        assert!(matches!(err, ArchiveError::Conflict { .. }));
        assert!(tmp.path().join("2018.zip").exists());
        assert_eq!(fs::read(archiver.archive_path(2018)).unwrap(), b"already here");
    }
}
