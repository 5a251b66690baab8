//! Core traits at the seam between the runner and the operation-log callback.
//!
//! The runner owns inventory, scheduling and execution. It talks to a
//! callback only through [`ResultCallback`], handing over a [`PlayContext`]
//! whose [`VariableSource`] is the callback's only window into host
//! variables.

use async_trait::async_trait;
use indexmap::IndexMap;
use std::fmt::Debug;
use std::sync::Arc;

use crate::callback::types::{PlaybookStats, ResultCategory, ResultRecord};
use crate::error::Result;

// ============================================================================
// Variable Traits
// ============================================================================

/// Read access to resolved host variables.
///
/// Implemented by the runner's variable manager. Lookups are by host name;
/// an unknown host yields `None` rather than an error so callers can report
/// the specific variable they needed.
pub trait VariableSource: Send + Sync + Debug {
    /// Returns every variable visible to `host`, or `None` for unknown hosts.
    fn host_vars(&self, host: &str) -> Option<IndexMap<String, serde_json::Value>>;

    /// Returns a single variable for `host`.
    fn host_var(&self, host: &str, name: &str) -> Option<serde_json::Value> {
        self.host_vars(host).and_then(|vars| vars.get(name).cloned())
    }
}

/// What the runner hands a callback when a play starts.
#[derive(Debug, Clone)]
pub struct PlayContext {
    /// Play name
    pub name: String,
    /// Hosts targeted by the play
    pub hosts: Vec<String>,
    /// Variable resolution for the duration of the run
    pub variables: Arc<dyn VariableSource>,
}

impl PlayContext {
    /// Creates a play context.
    pub fn new(
        name: impl Into<String>,
        hosts: Vec<String>,
        variables: Arc<dyn VariableSource>,
    ) -> Self {
        Self {
            name: name.into(),
            hosts,
            variables,
        }
    }
}

// ============================================================================
// Callback Traits
// ============================================================================

/// Callback for receiving run lifecycle events.
///
/// The runner awaits each handler to completion before delivering the next
/// event, so implementations never observe concurrent calls from a single
/// run. Errors are returned to the runner, which decides whether the run
/// continues.
#[async_trait]
pub trait ResultCallback: Send + Sync {
    /// Called when a play starts.
    async fn on_play_start(&self, play: &PlayContext) -> Result<()> {
        let _ = play;
        Ok(())
    }

    /// Called once per host per task with the task's outcome.
    async fn on_host_result(
        &self,
        host: &str,
        result: ResultRecord,
        category: ResultCategory,
    ) -> Result<()> {
        let _ = (host, result, category);
        Ok(())
    }

    /// Called when the playbook finishes, with the run's per-host stats.
    async fn on_playbook_end(&self, stats: &PlaybookStats) -> Result<()> {
        let _ = stats;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FixedVars;

    impl VariableSource for FixedVars {
        fn host_vars(&self, host: &str) -> Option<IndexMap<String, serde_json::Value>> {
            (host == "web1").then(|| {
                let mut vars = IndexMap::new();
                vars.insert("log_path".to_string(), serde_json::json!("/tmp/web1"));
                vars
            })
        }
    }

    struct Silent;

    #[async_trait]
    impl ResultCallback for Silent {}

    #[test]
    fn test_host_var_default_lookup() {
        let vars = FixedVars;
        assert_eq!(
            vars.host_var("web1", "log_path"),
            Some(serde_json::json!("/tmp/web1"))
        );
        assert_eq!(vars.host_var("web1", "ssh_user"), None);
        assert_eq!(vars.host_var("db1", "log_path"), None);
    }

    #[tokio::test]
    async fn test_default_handlers_are_noops() {
        let callback = Silent;
        let play = PlayContext::new("site", vec!["web1".to_string()], Arc::new(FixedVars));

        callback.on_play_start(&play).await.unwrap();
        callback
            .on_host_result("web1", ResultRecord::new(), ResultCategory::Ok)
            .await
            .unwrap();
        callback
            .on_playbook_end(&PlaybookStats::default())
            .await
            .unwrap();
    }
}
