//! Core types for the operation-log callback.
//!
//! These are the shapes the runner hands over on every notification: the
//! outcome category, the free-form result record and the end-of-run stats.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Result Category
// ============================================================================

/// Outcome of one task on one host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultCategory {
    /// Task succeeded
    Ok,
    /// Task failed
    Failed,
    /// Host could not be reached
    Unreachable,
    /// Task was skipped
    Skipped,
    /// Async job failed while being polled
    AsyncFailed,
}

impl ResultCategory {
    /// Every category, in notification order used by the runner.
    pub const ALL: [ResultCategory; 5] = [
        ResultCategory::Ok,
        ResultCategory::Failed,
        ResultCategory::Unreachable,
        ResultCategory::Skipped,
        ResultCategory::AsyncFailed,
    ];

    /// Whether results in this category are reported to the collector.
    pub fn is_error(self) -> bool {
        matches!(
            self,
            ResultCategory::Failed | ResultCategory::Unreachable | ResultCategory::AsyncFailed
        )
    }

    /// The wire and log name of the category.
    pub fn as_str(self) -> &'static str {
        match self {
            ResultCategory::Ok => "OK",
            ResultCategory::Failed => "FAILED",
            ResultCategory::Unreachable => "UNREACHABLE",
            ResultCategory::Skipped => "SKIPPED",
            ResultCategory::AsyncFailed => "ASYNC_FAILED",
        }
    }
}

impl fmt::Display for ResultCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "OK" => Ok(ResultCategory::Ok),
            "FAILED" => Ok(ResultCategory::Failed),
            "UNREACHABLE" => Ok(ResultCategory::Unreachable),
            "SKIPPED" => Ok(ResultCategory::Skipped),
            "ASYNC_FAILED" => Ok(ResultCategory::AsyncFailed),
            other => Err(format!("unknown result category: {}", other)),
        }
    }
}

// ============================================================================
// Result Record
// ============================================================================

/// The per-host outcome payload: an ordered open map of field name to JSON
/// value (`msg`, `rc`, `stdout_lines`, `invocation`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultRecord(IndexMap<String, serde_json::Value>);

impl ResultRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of a field.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Sets a field, returning the previous value.
    pub fn insert(
        &mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Option<serde_json::Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Removes a field, keeping the order of the remaining ones.
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.0.shift_remove(key)
    }

    /// Whether the record has a field.
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Field names in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<IndexMap<String, serde_json::Value>> for ResultRecord {
    fn from(map: IndexMap<String, serde_json::Value>) -> Self {
        Self(map)
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for ResultRecord {
    fn from(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(map.into_iter().collect())
    }
}

impl TryFrom<serde_json::Value> for ResultRecord {
    type Error = serde_json::Error;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        serde_json::from_value(value)
    }
}

impl<K: Into<String>> FromIterator<(K, serde_json::Value)> for ResultRecord {
    fn from_iter<I: IntoIterator<Item = (K, serde_json::Value)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

// ============================================================================
// Playbook Stats
// ============================================================================

/// Per-host counters as reported by the runner at playbook end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostStats {
    pub ok: u32,
    pub changed: u32,
    pub failures: u32,
    pub unreachable: u32,
    pub skipped: u32,
    pub rescued: u32,
    pub ignored: u32,
}

/// End-of-run statistics.
///
/// `processed` keeps the order in which the runner first processed each
/// host; the first entry is the host consulted for run-wide variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybookStats {
    pub processed: IndexMap<String, HostStats>,
}

impl PlaybookStats {
    /// Creates empty stats.
    pub fn new() -> Self {
        Self::default()
    }

    /// The first host the runner processed, if any.
    pub fn first_processed(&self) -> Option<&str> {
        self.processed.keys().next().map(String::as_str)
    }

    /// Counts one outcome for `host`.
    pub fn record(&mut self, host: &str, category: ResultCategory) {
        let stats = self.processed.entry(host.to_string()).or_default();
        match category {
            ResultCategory::Ok => stats.ok += 1,
            ResultCategory::Failed | ResultCategory::AsyncFailed => stats.failures += 1,
            ResultCategory::Unreachable => stats.unreachable += 1,
            ResultCategory::Skipped => stats.skipped += 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_category_wire_names() {
        assert_eq!(
            serde_json::to_string(&ResultCategory::AsyncFailed).unwrap(),
            "\"ASYNC_FAILED\""
        );
        assert_eq!(ResultCategory::Unreachable.to_string(), "UNREACHABLE");
        assert_eq!(
            "async-failed".parse::<ResultCategory>().unwrap(),
            ResultCategory::AsyncFailed
        );
        assert!("changed".parse::<ResultCategory>().is_err());
    }

    #[test]
    fn test_error_categories() {
        let errors: Vec<_> = ResultCategory::ALL
            .into_iter()
            .filter(|c| c.is_error())
            .collect();
        assert_eq!(
            errors,
            vec![
                ResultCategory::Failed,
                ResultCategory::Unreachable,
                ResultCategory::AsyncFailed
            ]
        );
    }

    #[test]
    fn test_record_preserves_field_order() {
        let record: ResultRecord =
            serde_json::from_str(r#"{"rc": 1, "msg": "boom", "changed": false}"#).unwrap();
        let keys: Vec<_> = record.keys().cloned().collect();
        assert_eq!(keys, vec!["rc", "msg", "changed"]);

        let mut record = record;
        record.remove("msg");
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"rc":1,"changed":false}"#
        );
    }

    #[test]
    fn test_record_from_value() {
        let record = ResultRecord::try_from(json!({"msg": "ok"})).unwrap();
        assert_eq!(record.get("msg"), Some(&json!("ok")));
        assert!(ResultRecord::try_from(json!(["not", "a", "map"])).is_err());
    }

    #[test]
    fn test_stats_first_processed_and_counts() {
        let mut stats = PlaybookStats::new();
        assert_eq!(stats.first_processed(), None);

        stats.record("db1", ResultCategory::Ok);
        stats.record("web1", ResultCategory::Failed);
        stats.record("db1", ResultCategory::Skipped);

        assert_eq!(stats.first_processed(), Some("db1"));
        assert_eq!(stats.processed["db1"].ok, 1);
        assert_eq!(stats.processed["db1"].skipped, 1);
        assert_eq!(stats.processed["web1"].failures, 1);
    }
}
