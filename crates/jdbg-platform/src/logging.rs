//! Logging helpers.
//!
//! Provides log-file rotation, default path resolution, and level conversion.
//! The `tracing-subscriber` setup itself lives in the binary crate because
//! `tracing-subscriber` is only a binary dependency.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::paths::PlatformPaths;

/// Maximum size of a single log file before rotation (10 MB).
pub const DEFAULT_MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Maximum number of rotated log files to retain.
pub const DEFAULT_MAX_LOG_FILES: u32 = 5;

/// File name of the active log.
pub const LOG_FILE_NAME: &str = "jdbg.log";

/// Return the default log file path: `<log_dir>/jdbg.log`.
pub fn default_log_file_path(paths: &dyn PlatformPaths) -> PathBuf {
    paths.log_dir().join(LOG_FILE_NAME)
}

/// Ensure the parent directory of a log file exists, creating it if necessary.
pub fn ensure_log_dir(log_path: &Path) -> io::Result<()> {
    if let Some(parent) = log_path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Rotate log files when the current file exceeds `max_size` bytes.
///
/// ```text
///   jdbg.log   → jdbg.log.1
///   jdbg.log.1 → jdbg.log.2
///   …
///   jdbg.log.<max_files> is deleted
/// ```
///
/// Does nothing when the file does not exist or is smaller than `max_size`.
pub fn rotate_log_files(log_path: &Path, max_size: u64, max_files: u32) -> io::Result<()> {
    if !log_path.exists() {
        return Ok(());
    }
    if fs::metadata(log_path)?.len() < max_size {
        return Ok(());
    }
    tracing::debug!("rotating log file {}", log_path.display());

    let oldest = rotated_path(log_path, max_files);
    if oldest.exists() {
        fs::remove_file(&oldest)?;
    }

    for i in (1..max_files).rev() {
        let from = rotated_path(log_path, i);
        if from.exists() {
            fs::rename(&from, rotated_path(log_path, i + 1))?;
        }
    }

    fs::rename(log_path, rotated_path(log_path, 1))?;
    Ok(())
}

/// Convert a log level name (case-insensitive) to a `tracing`-compatible
/// filter string.  Returns `"info"` for unrecognised values.
pub fn log_level_to_filter(level: &str) -> &'static str {
    match level.to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "info" => "info",
        "warn" => "warn",
        "error" => "error",
        _ => "info",
    }
}

// ── internal helpers ────────────────────────────────────────────────────────

fn rotated_path(base: &Path, index: u32) -> PathBuf {
    let name = base.file_name().unwrap_or_default().to_string_lossy();
    let parent = base.parent().unwrap_or_else(|| Path::new("."));
    parent.join(format!("{}.{}", name, index))
}

// ── tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::DefaultPaths;

    #[test]
    fn default_log_file_path_is_in_log_dir() {
        let paths = DefaultPaths::with_home("/home/tester");
        let path = default_log_file_path(&paths);
        assert!(path.starts_with(paths.log_dir()));
        assert!(path.extension().is_some_and(|e| e == "log"));
    }

    #[test]
    fn rotated_path_format_is_correct() {
        let base = Path::new("/tmp/jdbg.log");
        assert_eq!(rotated_path(base, 1), PathBuf::from("/tmp/jdbg.log.1"));
        assert_eq!(rotated_path(base, 3), PathBuf::from("/tmp/jdbg.log.3"));
    }

    #[test]
    fn rotate_no_op_when_file_missing() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = dir.path().join("jdbg.log");
        assert!(rotate_log_files(&log, DEFAULT_MAX_LOG_SIZE, DEFAULT_MAX_LOG_FILES).is_ok());
    }

    #[test]
    fn rotate_no_op_when_file_under_max_size() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = dir.path().join("jdbg.log");
        fs::write(&log, "small content").unwrap();
        rotate_log_files(&log, DEFAULT_MAX_LOG_SIZE, DEFAULT_MAX_LOG_FILES).unwrap();
        assert!(log.exists());
    }

    #[test]
    fn rotate_cascades_existing_rotated_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = dir.path().join("jdbg.log");
        fs::write(dir.path().join("jdbg.log.1"), "old1").unwrap();
        fs::write(dir.path().join("jdbg.log.2"), "old2").unwrap();
        fs::write(&log, "x".repeat(200)).unwrap();

        rotate_log_files(&log, 50, 3).unwrap();

        assert!(!log.exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("jdbg.log.1")).unwrap(),
            "x".repeat(200)
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("jdbg.log.2")).unwrap(),
            "old1"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("jdbg.log.3")).unwrap(),
            "old2"
        );
    }

    #[test]
    fn rotate_deletes_oldest_beyond_max_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = dir.path().join("jdbg.log");
        fs::write(dir.path().join("jdbg.log.1"), "old1").unwrap();
        fs::write(dir.path().join("jdbg.log.2"), "old2").unwrap();
        fs::write(&log, "x".repeat(200)).unwrap();

        rotate_log_files(&log, 50, 2).unwrap();

        assert!(!dir.path().join("jdbg.log.3").exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("jdbg.log.2")).unwrap(),
            "old1"
        );
    }

    #[test]
    fn ensure_log_dir_creates_nested_parents() {
        let dir = tempfile::TempDir::new().unwrap();
        let log = dir.path().join("a").join("b").join("jdbg.log");
        ensure_log_dir(&log).unwrap();
        ensure_log_dir(&log).unwrap();
        assert!(dir.path().join("a").join("b").exists());
    }

    #[test]
    fn log_level_to_filter_known_and_unknown() {
        assert_eq!(log_level_to_filter("TRACE"), "trace");
        assert_eq!(log_level_to_filter("Debug"), "debug");
        assert_eq!(log_level_to_filter("warn"), "warn");
        assert_eq!(log_level_to_filter("error"), "error");
        assert_eq!(log_level_to_filter("verbose"), "info");
        assert_eq!(log_level_to_filter(""), "info");
    }
}
