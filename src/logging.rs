//! `tracing` subscriber setup.
//!
//! Events are printed to stdout and appended, without ANSI colours, to a log file. The file path
//! comes from [`Config::log_file`](crate::config::Config::log_file) and falls back to
//! `logs/embedgate.log`. File writes go through a non-blocking worker whose guard is held for the
//! lifetime of the process.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE: &str = "embedgate.log";

static FILE_WRITER_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber.
///
/// `filter` is an `EnvFilter` directive such as `info` or `embedgate=debug`; an unparsable
/// directive falls back to `info`. A log file that cannot be opened only disables the file layer.
pub fn init_tracing(filter: &str, log_file: Option<&Path>) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|err| {
        eprintln!("Invalid log filter {filter:?}: {err}; using info");
        EnvFilter::new("info")
    });
    let file_layer = file_writer(&log_path(log_file)).map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .with(file_layer)
        .init();
}

fn log_path(configured: Option<&Path>) -> PathBuf {
    configured.map_or_else(
        || Path::new(DEFAULT_LOG_DIR).join(DEFAULT_LOG_FILE),
        Path::to_path_buf,
    )
}

fn file_writer(path: &Path) -> Option<NonBlocking> {
    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty())
        && let Err(err) = std::fs::create_dir_all(parent)
    {
        eprintln!("Failed to create log directory {}: {err}", parent.display());
        return None;
    }

    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => {
            let (writer, guard) = tracing_appender::non_blocking(file);
            let _ = FILE_WRITER_GUARD.set(guard);
            Some(writer)
        }
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", path.display());
            None
        }
    }
}
