//! Drives a [`ResultCallback`] from a recorded event stream.
//!
//! One JSON object per line, tagged by `event`:
//!
//! ```text
//! {"event":"play_start","name":"site","hosts":["web1"],"vars":{"web1":{"log_path":"/tmp/oplog"}}}
//! {"event":"host_result","host":"web1","category":"FAILED","result":{"msg":"boom"}}
//! {"event":"playbook_end"}
//! ```
//!
//! Blank lines are skipped. When `playbook_end` carries no stats, the stats
//! are derived from the replayed host results.

use std::io::BufRead;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::callback::types::{PlaybookStats, ResultCategory, ResultRecord};
use crate::error::{Error, Result};
use crate::traits::{PlayContext, ResultCallback};
use crate::vars::HostVars;

/// One recorded runner event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunnerEvent {
    PlayStart {
        #[serde(default)]
        name: String,
        #[serde(default)]
        hosts: Vec<String>,
        /// Host variables layered over the inventory for this play
        #[serde(default)]
        vars: IndexMap<String, IndexMap<String, JsonValue>>,
    },
    HostResult {
        host: String,
        category: ResultCategory,
        #[serde(default)]
        result: ResultRecord,
    },
    PlaybookEnd {
        #[serde(default)]
        stats: PlaybookStats,
    },
}

impl RunnerEvent {
    /// Parses a single line of the event stream.
    pub fn parse_line(line: &str, number: usize) -> Result<Self> {
        serde_json::from_str(line).map_err(|e| Error::InvalidEvent {
            line: number,
            message: e.to_string(),
        })
    }
}

/// What a replay delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub plays: usize,
    pub host_results: usize,
    pub flushed: bool,
}

/// Replays `events` into `callback`, resolving variables from `inventory`.
///
/// Stops at the first error, whether from decoding or from the callback.
pub async fn replay<R: BufRead>(
    callback: &dyn ResultCallback,
    inventory: &HostVars,
    events: R,
) -> Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();
    let mut observed = PlaybookStats::new();

    for (index, line) in events.lines().enumerate() {
        let number = index + 1;
        let line = line.map_err(|e| Error::InvalidEvent {
            line: number,
            message: e.to_string(),
        })?;
        if line.trim().is_empty() {
            continue;
        }

        match RunnerEvent::parse_line(&line, number)? {
            RunnerEvent::PlayStart { name, hosts, vars } => {
                let mut variables = inventory.clone();
                for (host, host_vars) in vars {
                    for (key, value) in host_vars {
                        variables.insert_host_var(&host, key, value);
                    }
                }
                debug!(play = %name, "Replaying play start");
                let play = PlayContext::new(name, hosts, Arc::new(variables));
                callback.on_play_start(&play).await?;
                summary.plays += 1;
            }
            RunnerEvent::HostResult {
                host,
                category,
                result,
            } => {
                observed.record(&host, category);
                callback.on_host_result(&host, result, category).await?;
                summary.host_results += 1;
            }
            RunnerEvent::PlaybookEnd { stats } => {
                let stats = if stats.processed.is_empty() {
                    std::mem::take(&mut observed)
                } else {
                    stats
                };
                callback.on_playbook_end(&stats).await?;
                summary.flushed = true;
            }
        }
    }

    info!(
        plays = summary.plays,
        host_results = summary.host_results,
        flushed = summary.flushed,
        "Replay finished"
    );
    Ok(summary)
}
