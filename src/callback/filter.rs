//! Field filtering for result records.
//!
//! Bulky or sensitive fields are stripped before a record is logged or
//! relayed. Filtering is a pure function of the record and the excluded
//! field list, and applying it twice yields the same record as once.

use serde::{Deserialize, Serialize};

use crate::callback::types::ResultRecord;
use crate::error::{Error, Result};

/// Fields removed from every record by default.
pub const DEFAULT_FILTERED_FIELDS: &[&str] = &[
    "stdout_lines",
    "stderr_lines",
    "_ansible_no_log",
    "exception",
    "invocation",
];

/// How absent fields are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Absent fields are ignored.
    #[default]
    Lenient,
    /// Every excluded field must be present; an absent one is an error.
    Strict,
}

/// Returns `record` without the `excluded` fields.
///
/// # Errors
///
/// In [`FilterMode::Strict`], returns [`Error::FilteredFieldMissing`] for the
/// first excluded field that the record does not carry.
pub fn filter_record<S: AsRef<str>>(
    mut record: ResultRecord,
    excluded: &[S],
    mode: FilterMode,
) -> Result<ResultRecord> {
    for key in excluded {
        let key = key.as_ref();
        if record.remove(key).is_none() && mode == FilterMode::Strict {
            return Err(Error::FilteredFieldMissing(key.to_string()));
        }
    }
    Ok(record)
}

/// Returns true if `record` carries none of the `excluded` fields.
pub fn is_filtered<S: AsRef<str>>(record: &ResultRecord, excluded: &[S]) -> bool {
    excluded.iter().all(|key| !record.contains_key(key.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: serde_json::Value) -> ResultRecord {
        ResultRecord::try_from(value).unwrap()
    }

    #[test]
    fn test_filter_removes_default_fields() {
        let input = record(json!({
            "msg": "boom",
            "stdout_lines": ["a"],
            "stderr_lines": [],
            "invocation": {"module_args": {"cmd": "false"}},
            "rc": 1
        }));

        let filtered = filter_record(input, DEFAULT_FILTERED_FIELDS, FilterMode::Lenient).unwrap();

        assert_eq!(filtered, record(json!({"msg": "boom", "rc": 1})));
        assert!(is_filtered(&filtered, DEFAULT_FILTERED_FIELDS));
    }

    #[test]
    fn test_lenient_ignores_absent_fields() {
        let input = record(json!({"msg": "ok"}));
        let filtered =
            filter_record(input.clone(), DEFAULT_FILTERED_FIELDS, FilterMode::Lenient).unwrap();
        assert_eq!(filtered, input);
    }

    #[test]
    fn test_strict_rejects_absent_field() {
        let input = record(json!({"msg": "boom", "stdout_lines": []}));
        let err = filter_record(input, &["stdout_lines", "exception"], FilterMode::Strict)
            .unwrap_err();
        assert!(matches!(err, Error::FilteredFieldMissing(ref f) if f == "exception"));
    }

    #[test]
    fn test_strict_passes_when_all_present() {
        let input = record(json!({"msg": "boom", "exception": "trace"}));
        let filtered = filter_record(input, &["exception"], FilterMode::Strict).unwrap();
        assert_eq!(filtered, record(json!({"msg": "boom"})));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let input = record(json!({"msg": "boom", "_ansible_no_log": false}));
        let once = filter_record(input, DEFAULT_FILTERED_FIELDS, FilterMode::Lenient).unwrap();
        let twice =
            filter_record(once.clone(), DEFAULT_FILTERED_FIELDS, FilterMode::Lenient).unwrap();
        assert_eq!(once, twice);
    }
}
