//! Shared fixtures for the rustible-oplog integration tests.
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};

use rustible_oplog::callback::{
    OperationLogCallback, OperationLogConfig, PlaybookStats, ResultCategory, ResultRecord,
};
use rustible_oplog::traits::{PlayContext, ResultCallback};
use rustible_oplog::vars::HostVars;

/// Collector path mounted on the mock server.
pub const CALLBACK_PATH: &str = "/api/ansible_plugin/callback/kc_operation_log";

/// Builds a record from a JSON object literal.
pub fn record(value: Value) -> ResultRecord {
    ResultRecord::try_from(value).expect("record must be a JSON object")
}

/// Host variables giving every listed host a log directory and a run id.
pub fn host_vars(log_dir: &Path, hosts: &[(&str, &str)]) -> HostVars {
    let mut vars = HostVars::new();
    for (host, run_id) in hosts {
        vars.insert_host_var(host, "log_path", json!(log_dir));
        vars.insert_host_var(host, "operation_log_uuid", json!(run_id));
    }
    vars
}

/// A play over `vars`' hosts.
pub fn play(vars: HostVars) -> PlayContext {
    let hosts = vars.hosts().map(String::from).collect();
    PlayContext::new("site", hosts, Arc::new(vars))
}

/// Default configuration pointed at `base_url`.
pub fn config_for(base_url: &str) -> OperationLogConfig {
    OperationLogConfig::builder()
        .url(format!("{}{}", base_url, CALLBACK_PATH))
        .build()
}

/// Stats listing hosts in processing order.
pub fn stats(hosts: &[(&str, ResultCategory)]) -> PlaybookStats {
    let mut stats = PlaybookStats::new();
    for (host, category) in hosts {
        stats.record(host, *category);
    }
    stats
}

/// Sends one full run through `callback`.
pub async fn run(
    callback: &OperationLogCallback,
    vars: HostVars,
    results: Vec<(&str, ResultCategory, Value)>,
) -> rustible_oplog::Result<()> {
    callback.on_play_start(&play(vars)).await?;
    let mut processed = PlaybookStats::new();
    for (host, category, value) in results {
        processed.record(host, category);
        callback.on_host_result(host, record(value), category).await?;
    }
    callback.on_playbook_end(&processed).await
}
