//! Per-run accumulation of error results and host progress.

use indexmap::IndexMap;
use serde::Serialize;

use crate::callback::types::{ResultCategory, ResultRecord};

/// Filtered error records grouped by host, then by category.
///
/// Hosts and categories keep first-seen order. Entries are only ever
/// appended; the whole accumulator is drained once at playbook end.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ErrorAccumulator {
    hosts: IndexMap<String, IndexMap<ResultCategory, Vec<ResultRecord>>>,
}

impl ErrorAccumulator {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a record for `host` under `category`.
    pub fn push(&mut self, host: &str, category: ResultCategory, record: ResultRecord) {
        self.hosts
            .entry(host.to_string())
            .or_default()
            .entry(category)
            .or_default()
            .push(record);
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Number of hosts with at least one record.
    pub fn host_count(&self) -> usize {
        self.hosts.len()
    }

    /// Total number of records across all hosts.
    pub fn record_count(&self) -> usize {
        self.hosts
            .values()
            .flat_map(|categories| categories.values())
            .map(Vec::len)
            .sum()
    }

    /// The first host that recorded an error.
    pub fn first_host(&self) -> Option<&str> {
        self.hosts.keys().next().map(String::as_str)
    }

    /// Records for one host and category.
    pub fn records(&self, host: &str, category: ResultCategory) -> &[ResultRecord] {
        self.hosts
            .get(host)
            .and_then(|categories| categories.get(&category))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Iterates hosts and their categorised records.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&String, &IndexMap<ResultCategory, Vec<ResultRecord>>)> {
        self.hosts.iter()
    }

    /// Takes every record, leaving the accumulator empty.
    pub fn take(&mut self) -> ErrorAccumulator {
        std::mem::take(self)
    }
}

/// Hosts seen starting and finishing during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProgressTracker {
    pub start_host: Vec<String>,
    pub end_host: Vec<String>,
}

impl ProgressTracker {
    /// Marks `host` as started; repeated calls are ignored.
    pub fn mark_started(&mut self, host: &str) {
        if !self.start_host.iter().any(|h| h == host) {
            self.start_host.push(host.to_string());
        }
    }

    /// Marks `host` as finished; repeated calls are ignored.
    pub fn mark_finished(&mut self, host: &str) {
        if !self.end_host.iter().any(|h| h == host) {
            self.end_host.push(host.to_string());
        }
    }

    /// Hosts that started but never finished.
    pub fn in_flight(&self) -> Vec<&str> {
        self.start_host
            .iter()
            .filter(|h| !self.end_host.contains(h))
            .map(String::as_str)
            .collect()
    }
}
