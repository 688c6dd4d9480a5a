//! Log setup: stderr plus one log file per run.

use chrono::{DateTime, Local};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_NAME: &str = "aw-watcher-input";

/// Directory holding the log files.
pub fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("activitywatch")
        .join(LOG_NAME)
        .join("log")
}

/// File name for a run started at `started`, e.g.
/// `aw-watcher-input-testing_2024-05-01T12-30-00.log`.
pub fn log_file_name(testing: bool, started: DateTime<Local>) -> String {
    let suffix = if testing { "-testing" } else { "" };
    format!(
        "{LOG_NAME}{suffix}_{}.log",
        started.format("%Y-%m-%dT%H-%M-%S")
    )
}

/// Open (or append to) the log file for this run inside `dir`.
pub fn open_log_file(
    dir: &Path,
    testing: bool,
    started: DateTime<Local>,
) -> std::io::Result<(File, PathBuf)> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(log_file_name(testing, started));
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((file, path))
}

/// Install the global subscriber. `RUST_LOG` wins over `verbose`.
///
/// Returns the log file path, or `None` when only stderr is in use.
pub fn init(verbose: bool, testing: bool) -> Option<PathBuf> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (file_layer, path, open_error) = match open_log_file(&log_dir(), testing, Local::now()) {
        Ok((file, path)) => (
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            ),
            Some(path),
            None,
        ),
        Err(e) => (None, None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    if let Some(e) = open_error {
        warn!("Logging to stderr only, could not open log file: {e}");
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Write;

    fn started() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_log_dir_is_per_watcher() {
        assert!(log_dir().ends_with("activitywatch/aw-watcher-input/log"));
    }

    #[test]
    fn test_log_file_name() {
        assert_eq!(
            log_file_name(false, started()),
            "aw-watcher-input_2024-05-01T12-30-00.log"
        );
        assert_eq!(
            log_file_name(true, started()),
            "aw-watcher-input-testing_2024-05-01T12-30-00.log"
        );
    }

    #[test]
    fn test_open_log_file_creates_directory_and_appends() {
        let dir = std::env::temp_dir()
            .join(format!("aw-watcher-input-log-test-{}", std::process::id()))
            .join("log");

        let (mut file, path) = open_log_file(&dir, false, started()).unwrap();
        writeln!(file, "first").unwrap();
        drop(file);

        let (mut file, again) = open_log_file(&dir, false, started()).unwrap();
        writeln!(file, "second").unwrap();
        drop(file);

        assert_eq!(path, again);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");

        let _ = std::fs::remove_dir_all(dir.parent().unwrap());
    }
}
