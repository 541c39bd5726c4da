//! Tracing setup for the server and the file CLI.
//!
//! The server writes compact lines to stdout and mirrors them, with targets and without ANSI
//! colors, into `SCAMMERIZE_LOG_FILE` (default `logs/scammerize.log`). The CLI keeps stdout for
//! summaries and logs to stderr only. Summarization code logs sizes, formats and fingerprints,
//! never document text.
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_VAR: &str = "SCAMMERIZE_LOG_FILE";
const DEFAULT_LOG_FILE: &str = "logs/scammerize.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the server subscriber. `RUST_LOG` overrides the `info` default.
///
/// A log file that cannot be opened is reported on stderr and the server keeps logging to stdout.
pub fn init_tracing() {
    let path = log_file_path(std::env::var(LOG_FILE_VAR).ok().as_deref());
    let file_layer = match open_log_writer(&path) {
        Ok((writer, guard)) => {
            let _ = LOG_GUARD.set(guard);
            Some(
                fmt::layer()
                    .with_writer(writer)
                    .with_target(true)
                    .with_ansi(false)
                    .compact(),
            )
        }
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", path.display());
            None
        }
    };

    tracing_subscriber::registry()
        .with(filter_or("info"))
        .with(fmt::layer().with_target(false).compact())
        .with(file_layer)
        .init();
}

/// Install the CLI subscriber: stderr only, `warn` unless `RUST_LOG` says otherwise.
pub fn init_cli_tracing() {
    tracing_subscriber::registry()
        .with(filter_or("warn"))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

fn filter_or(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

fn log_file_path(configured: Option<&str>) -> PathBuf {
    match configured.map(str::trim) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from(DEFAULT_LOG_FILE),
    }
}

/// Open `path` for appending behind a non-blocking writer, creating parent directories.
fn open_log_writer(path: &Path) -> std::io::Result<(NonBlocking, WorkerGuard)> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    Ok(tracing_appender::non_blocking(file))
}
