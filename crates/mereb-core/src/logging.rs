//! File logging setup.
//!
//! Logs go to `${MEREB_HOME}/logs/mereb.log` so they never mix with command
//! output. The filter is read from `MEREB_LOG` (`EnvFilter` syntax).

use std::fs;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

/// Env var holding the log filter.
pub const LOG_ENV: &str = "MEREB_LOG";
const DEFAULT_FILTER: &str = "warn";
const LOG_FILE: &str = "mereb.log";

/// Installs the global subscriber writing into `log_dir`.
///
/// Returns the writer guard, which must be held until exit so buffered lines
/// get flushed. Returns `None` when the directory cannot be created or a
/// subscriber is already installed; logging is then silently off.
pub fn init(log_dir: &Path) -> Option<WorkerGuard> {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    fs::create_dir_all(log_dir).ok()?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE)
        .build(log_dir)
        .ok()?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()?;

    Some(guard)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_init_creates_log_dir() {
        let dir = tempdir().unwrap();
        let logs = dir.path().join("logs");

        let guard = init(&logs);
        assert!(logs.is_dir());
        if guard.is_some() {
            tracing::warn!("logging initialized");
            drop(guard);
            assert!(logs.join(LOG_FILE).exists());
        }
    }
}
