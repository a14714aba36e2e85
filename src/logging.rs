//! Tracing configuration and log routing.
//!
//! Logs go to stdout through a compact formatter and to a file. `Config::log_file` selects the
//! file path; without it, logs are appended to `logs/docsense.log`. The file writer is
//! non-blocking so slow disks never stall request handlers.
use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::config::Config;

const DEFAULT_LOG_FILE: &str = "logs/docsense.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Configure tracing subscribers for stdout and optional file logging.
///
/// - Respects `RUST_LOG` for filtering (defaults to `info`).
/// - Installs a compact stdout layer and, when the log file opens, a file layer.
/// - Keeps the non-blocking writer guard alive for the process lifetime.
pub fn init_tracing(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let file_layer = file_writer(config.log_file.as_deref()).map(|(writer, guard)| {
        let _ = LOG_GUARD.set(guard);
        fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();
}

/// Build a non-blocking writer appending to `path`, or to the default file when `None`.
///
/// Missing parent directories are created. Returns `None` when the file cannot be opened;
/// tracing is not installed yet, so the reason goes to stderr.
fn file_writer(path: Option<&str>) -> Option<(NonBlocking, WorkerGuard)> {
    let path = Path::new(path.unwrap_or(DEFAULT_LOG_FILE));
    let Some(file_name) = path.file_name() else {
        eprintln!("Log file path {} has no file name", path.display());
        return None;
    };
    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    if let Err(err) = std::fs::create_dir_all(directory) {
        eprintln!("Failed to create log directory {}: {err}", directory.display());
        return None;
    }

    match RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(directory)
    {
        Ok(appender) => Some(tracing_appender::non_blocking(appender)),
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", path.display());
            None
        }
    }
}
