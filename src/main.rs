//! logroll: command-line access to the rolling file logger.
//!
//! Appends entries, prints where today's entries go and runs archive
//! passes, so the archiver can be scheduled from cron or a systemd timer.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use logroll::{
    logging::{ArchiveReport, YearOutcome},
    Logger, LoggerConfig, Severity,
};
use tracing::debug;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_COMMIT"),
    ", built ",
    env!("BUILD_TIME"),
    ")"
);

#[derive(Parser)]
#[command(name = "logroll")]
#[command(version = VERSION)]
#[command(about = "Date-stamped rolling log files and yearly zip archives", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Файл конфигурации (TOML)
    #[arg(short, long, env = "LOGROLL_CONFIG")]
    config: Option<PathBuf>,
    /// Каталог логов (перекрывает конфигурацию)
    #[arg(short, long)]
    dir: Option<PathBuf>,
    /// Базовое имя файла логов
    #[arg(short, long)]
    base_name: Option<String>,
    /// Подробный вывод собственной диагностики
    #[arg(short, long)]
    verbose: bool,
    /// Только ошибки
    #[arg(short = 'q', long, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append one entry to today's log file
    Write {
        #[arg(short, long, default_value = "info")]
        level: Severity,
        #[arg(required = true)]
        message: Vec<String>,
    },
    /// Bundle eligible year directories into zip archives
    Archive,
    /// Print the file today's entries go to
    Path,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let config = load_config(&cli)?;
    debug!(?config, "Configuration loaded");

    let logger = Logger::new(config).context("Failed to start logger")?;
    let result = run(&cli.command, &logger);
    logger.shutdown().context("Failed to drain log writer")?;

    let failures = result?;
    if failures > 0 {
        std::process::exit(2);
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<LoggerConfig> {
    let mut config = LoggerConfig::load(cli.config.as_deref()).with_context(|| match &cli.config {
        Some(path) => format!("Failed to load configuration from {}", path.display()),
        None => "Failed to load configuration".to_string(),
    })?;
    if let Some(dir) = &cli.dir {
        config.directory = dir.clone();
    }
    if let Some(base_name) = &cli.base_name {
        config.base_name = base_name.clone();
    }
    Ok(config)
}

/// Returns the number of failed archive years.
fn run(
    command: &Commands,
    logger: &Logger,
) -> Result<usize> {
    match command {
        Commands::Write { level, message } => {
            let message = message.join(" ");
            if !logger.enabled(*level) {
                debug!(%level, threshold = %logger.threshold(), "Entry below threshold, skipped");
                return Ok(0);
            }
            logger.log(*level, message).context("Failed to write entry")?;
            logger.flush().context("Failed to flush entry")?;
            println!("{}", logger.current_path().display());
            Ok(0)
        }
        Commands::Archive => {
            let report = logger
                .archive_old_logs()
                .context("Archive pass failed")?;
            print_report(&report);
            Ok(report.failures().count())
        }
        Commands::Path => {
            println!("{}", logger.current_path().display());
            Ok(0)
        }
    }
}

fn print_report(report: &ArchiveReport) {
    if report.filed > 0 {
        println!("filed {} loose file(s) into year directories", report.filed);
    }
    for year in &report.years {
        match &year.outcome {
            YearOutcome::Skipped => println!("{}: skipped (not eligible yet)", year.year),
            YearOutcome::Archived { archive, files } => {
                println!("{}: archived {files} file(s) to {}", year.year, archive.display())
            }
            YearOutcome::AlreadyArchived { archive } => println!(
                "{}: already archived in {}, leftover directory removed",
                year.year,
                archive.display()
            ),
            YearOutcome::Merged { archive, added } => println!(
                "{}: added {added} file(s) to existing {}",
                year.year,
                archive.display()
            ),
            YearOutcome::StrayMoved { archive } => {
                println!("{}: moved stray archive to {}", year.year, archive.display())
            }
            YearOutcome::Failed(e) => eprintln!("{}: FAILED: {e}", year.year),
        }
    }
    if report.is_noop() {
        println!("nothing to archive");
    }
}

fn init_tracing(
    verbose: bool,
    quiet: bool,
) {
    use tracing_subscriber::{fmt, EnvFilter};

    // RUST_LOG перекрывает флаги
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if quiet {
            "error"
        } else if verbose {
            "debug"
        } else {
            "warn"
        })
    });

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    /// Тест проверяет, что версия несёт коммит и время сборки из build.rs.
    #[test]
    fn test_version_carries_build_metadata() {
        assert!(VERSION.starts_with(env!("CARGO_PKG_VERSION")));
        assert!(VERSION.contains(env!("GIT_COMMIT")));
        assert!(!env!("GIT_COMMIT").is_empty());
        assert!(chrono::DateTime::parse_from_rfc3339(env!("BUILD_TIME")).is_ok());
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }
}
