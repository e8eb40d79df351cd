//! Tracing subscriber setup shared by both binaries
//!
//! Logs go to stderr and to a daily rolling file. The filter defaults to
//! `info` and honors `RUST_LOG`. The log directory is `CLIPQA_LOG_DIR` if
//! set, otherwise `<data_local_dir>/clipqa/logs`.

use std::path::PathBuf;

use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

pub const LOG_DIR_ENV: &str = "CLIPQA_LOG_DIR";

/// Directory for rolling log files
pub fn log_dir() -> Option<PathBuf> {
    if let Some(dir) = std::env::var_os(LOG_DIR_ENV).filter(|d| !d.is_empty()) {
        return Some(PathBuf::from(dir));
    }
    dirs::data_local_dir().map(|d| d.join(crate::config::APP_NAME).join("logs"))
}

fn env_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy()
}

/// Install the global subscriber for `app`.
///
/// The returned guard flushes the file writer on drop and must live as long
/// as `main`. When no log directory is usable only stderr is set up.
pub fn init_logging(app: &str) -> Option<WorkerGuard> {
    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);

    let file = log_dir().and_then(|dir| {
        if let Err(e) = std::fs::create_dir_all(&dir) {
            eprintln!("[{app}] cannot create log directory {}: {e}", dir.display());
            return None;
        }
        RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(app)
            .filename_suffix("log")
            .build(&dir)
            .map_err(|e| eprintln!("[{app}] cannot open log file in {}: {e}", dir.display()))
            .ok()
    });

    match file {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            let _ = tracing_subscriber::registry()
                .with(env_filter())
                .with(stderr_layer)
                .with(file_layer)
                .try_init();
            Some(guard)
        }
        None => {
            let _ = tracing_subscriber::registry()
                .with(env_filter())
                .with(stderr_layer)
                .try_init();
            None
        }
    }
}
