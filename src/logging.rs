//! Log-file setup shared by both binaries.
//!
//! Each utility appends human-readable lines to its own text file:
//!
//! ```text
//! 2026-10-18 14:03:27.412 - INFO - relay listening on ws://127.0.0.1:8765
//! ```
//!
//! `RUST_LOG` still controls the filter (default `info`).

use chrono::Local;
use env_logger::{Builder, Env, Target};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Error from opening the log file or installing the logger.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("cannot open log file {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("logger already installed: {0}")]
    Install(#[from] log::SetLoggerError),
}

/// Install the global logger, appending to `path`.
pub fn init(path: &Path) -> Result<(), LoggingError> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::Open {
            path: path.display().to_string(),
            source,
        })?;

    Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.args()
            )
        })
        .try_init()?;
    Ok(())
}

/// Install the logger for a binary: the log file if possible, stderr
/// otherwise.  Also routes panics through the logger.
pub fn init_or_stderr(path: &Path) {
    if let Err(e) = init(path) {
        let _ = env_logger::try_init();
        log::warn!("{}; logging to stderr", e);
    }
    install_panic_hook();
}

/// Log panics at `error` level before the default hook runs.
pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        log::error!("unhandled panic: {}", info);
        default_hook(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unopenable_log_file_is_reported() {
        let err = init(Path::new("/nonexistent-dir/relaydeck/log.txt")).unwrap_err();
        assert!(matches!(err, LoggingError::Open { .. }));
        assert!(err.to_string().contains("/nonexistent-dir"));
    }
}
