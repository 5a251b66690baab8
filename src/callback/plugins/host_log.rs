//! Local append-only logs for the operation-log callback.
//!
//! Each host result becomes one entry in `<dir>/<host>.log`:
//!
//! ```text
//! Oct 16 2026 10:30:45 - FAILED - {"msg":"boom","rc":1}
//!
//! ```
//!
//! Files are opened, written and closed per entry; nothing is held open
//! across notifications. A directory is ensured at most once per run.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use parking_lot::Mutex;
use tracing::debug;

use crate::callback::types::{ResultCategory, ResultRecord};
use crate::error::{Error, Result};

/// Current local time rendered with `format`.
pub(crate) fn timestamp(format: &str) -> String {
    Local::now().format(format).to_string()
}

/// Appends `data` to `path`, creating the file if needed.
fn append(path: &Path, data: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::io(path, e))?;
    file.write_all(data.as_bytes())
        .map_err(|e| Error::io(path, e))
}

// ============================================================================
// Host Log
// ============================================================================

/// Writer for per-host result logs.
#[derive(Debug)]
pub struct HostLogWriter {
    time_format: String,
    ensured: Mutex<HashSet<PathBuf>>,
}

impl HostLogWriter {
    /// Creates a writer stamping entries with `time_format`.
    pub fn new(time_format: impl Into<String>) -> Self {
        Self {
            time_format: time_format.into(),
            ensured: Mutex::new(HashSet::new()),
        }
    }

    /// Path of the log file for `host` inside `dir`.
    pub fn log_path(dir: &Path, host: &str) -> PathBuf {
        let name: String = host
            .chars()
            .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
            .collect();
        dir.join(format!("{}.log", name))
    }

    /// Makes sure `dir` exists. Returns `true` when this call did the work,
    /// `false` when the directory was already ensured during this run.
    pub fn ensure_dir(&self, dir: &Path) -> Result<bool> {
        let mut ensured = self.ensured.lock();
        if ensured.contains(dir) {
            return Ok(false);
        }
        if !dir.is_dir() {
            debug!("Creating log directory {}", dir.display());
            fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        }
        ensured.insert(dir.to_path_buf());
        Ok(true)
    }

    /// Directories ensured so far.
    pub fn ensured_directories(&self) -> Vec<PathBuf> {
        self.ensured.lock().iter().cloned().collect()
    }

    /// Formats one log entry: `<timestamp> - <CATEGORY> - <json>` plus a
    /// blank separator line.
    pub fn format_entry(&self, category: ResultCategory, record: &ResultRecord) -> Result<String> {
        let data = serde_json::to_string(record)?;
        Ok(format!(
            "{} - {} - {}\n\n",
            timestamp(&self.time_format),
            category,
            data
        ))
    }

    /// Appends a result entry for `host` under `dir`, returning the file path.
    pub fn append_result(
        &self,
        dir: &Path,
        host: &str,
        category: ResultCategory,
        record: &ResultRecord,
    ) -> Result<PathBuf> {
        self.ensure_dir(dir)?;
        let path = Self::log_path(dir, host);
        let entry = self.format_entry(category, record)?;
        append(&path, &entry)?;
        Ok(path)
    }
}

// ============================================================================
// Debug Log
// ============================================================================

/// Append-only debug log: `<timestamp> DEBUG ==> <label>: <message>`.
#[derive(Debug, Clone)]
pub struct DebugLog {
    path: PathBuf,
    label: String,
    time_format: String,
}

impl DebugLog {
    /// Creates a debug log writing to `path`.
    pub fn new(
        path: impl Into<PathBuf>,
        label: impl Into<String>,
        time_format: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            label: label.into(),
            time_format: time_format.into(),
        }
    }

    /// Path of the debug log.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one message, creating the parent directory if absent.
    pub fn write(&self, message: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
        }
        let line = format!(
            "{} DEBUG ==> {}: {}\n\n",
            timestamp(&self.time_format),
            self.label,
            message
        );
        append(&self.path, &line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::config::DEFAULT_TIME_FORMAT;
    use chrono::NaiveDateTime;
    use serde_json::json;
    use tempfile::TempDir;

    fn boom() -> ResultRecord {
        ResultRecord::try_from(json!({"msg": "boom"})).unwrap()
    }

    #[test]
    fn test_entry_format() {
        let writer = HostLogWriter::new(DEFAULT_TIME_FORMAT);
        let entry = writer.format_entry(ResultCategory::Failed, &boom()).unwrap();

        assert!(entry.ends_with(" - FAILED - {\"msg\":\"boom\"}\n\n"));
        let stamp = entry.split(" - ").next().unwrap();
        assert!(NaiveDateTime::parse_from_str(stamp, DEFAULT_TIME_FORMAT).is_ok());
    }

    #[test]
    fn test_log_path_sanitizes_host() {
        let path = HostLogWriter::log_path(Path::new("/var/log/oplog"), "rack/web1");
        assert_eq!(path, PathBuf::from("/var/log/oplog/rack_web1.log"));
    }

    #[test]
    fn test_append_creates_directory_once() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested").join("logs");
        let writer = HostLogWriter::new(DEFAULT_TIME_FORMAT);

        assert!(!dir.exists());
        let path = writer
            .append_result(&dir, "web1", ResultCategory::Failed, &boom())
            .unwrap();
        assert!(dir.is_dir());
        assert_eq!(writer.ensured_directories(), vec![dir.clone()]);

        // Already ensured: no second creation attempt.
        assert!(!writer.ensure_dir(&dir).unwrap());

        writer
            .append_result(&dir, "web1", ResultCategory::Ok, &ResultRecord::new())
            .unwrap();
        let content = fs::read_to_string(path).unwrap();
        let entries: Vec<_> = content.split("\n\n").filter(|e| !e.is_empty()).collect();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].contains("FAILED"));
        assert!(entries[1].contains(" - OK - {}"));
    }

    #[test]
    fn test_append_fails_on_unwritable_directory() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();

        let writer = HostLogWriter::new(DEFAULT_TIME_FORMAT);
        let err = writer
            .append_result(&blocker.join("logs"), "web1", ResultCategory::Failed, &boom())
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_debug_log_line() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("debug").join("oplog-debug.log");
        let log = DebugLog::new(&path, "kc_operation_log", DEFAULT_TIME_FORMAT);

        log.write("operationLogId ===> 42").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains(" DEBUG ==> kc_operation_log: operationLogId ===> 42\n\n"));
    }
}
