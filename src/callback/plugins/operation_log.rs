//! Operation-Log Callback Plugin
//!
//! Records every host result in a local per-host log and, when the
//! playbook ends, relays the accumulated failures to a remote collector in
//! a single request.
//!
//! # Lifecycle
//!
//! ```text
//! Idle --on_play_start--> Accumulating --on_playbook_end--> Flushed
//! ```
//!
//! A callback instance serves exactly one run. Events after the flush are
//! rejected with [`Error::RunFinished`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use rustible_oplog::callback::{OperationLogCallback, OperationLogConfig};
//!
//! let callback = OperationLogCallback::new(OperationLogConfig::from_env()?)?;
//! callback.on_play_start(&play).await?;
//! callback.on_host_result("web1", result, ResultCategory::Failed).await?;
//! callback.on_playbook_end(&stats).await?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use minijinja::{Environment, ErrorKind, UndefinedBehavior};
use parking_lot::RwLock;
use serde_json::Value as JsonValue;
use tracing::{debug, info, warn};

use crate::callback::accumulator::{ErrorAccumulator, ProgressTracker};
use crate::callback::client::CallbackClient;
use crate::callback::config::OperationLogConfig;
use crate::callback::envelope::CallbackEnvelope;
use crate::callback::filter::{filter_record, FilterMode};
use crate::callback::plugins::host_log::{DebugLog, HostLogWriter};
use crate::callback::types::{PlaybookStats, ResultCategory, ResultRecord};
use crate::error::{Error, Result};
use crate::traits::{PlayContext, ResultCallback, VariableSource};

const LOG_DIRECTORY_TEMPLATE: &str = "log_directory";

/// Where a callback instance is in its single run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SinkPhase {
    /// No play has started yet
    #[default]
    Idle,
    /// Receiving host results
    Accumulating,
    /// The end-of-run flush happened
    Flushed,
}

#[derive(Debug, Default)]
struct OperationLogState {
    phase: SinkPhase,
    variables: Option<Arc<dyn VariableSource>>,
    failures: ErrorAccumulator,
    progress: ProgressTracker,
    notifications: usize,
}

/// Result sink relaying failures to an operation-log collector.
#[derive(Debug)]
pub struct OperationLogCallback {
    config: OperationLogConfig,
    client: CallbackClient,
    templates: Environment<'static>,
    host_log: HostLogWriter,
    debug_log: Option<DebugLog>,
    state: RwLock<OperationLogState>,
}

impl OperationLogCallback {
    /// Creates a callback for one run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration does not validate,
    /// carries invalid headers or an unparseable log directory template.
    pub fn new(config: OperationLogConfig) -> Result<Self> {
        config.validate()?;

        let client = CallbackClient::new(&config)?;
        let mut templates = Environment::new();
        templates.set_undefined_behavior(UndefinedBehavior::Strict);
        templates
            .add_template_owned(LOG_DIRECTORY_TEMPLATE, config.log_directory.clone())
            .map_err(|e| Error::Config(format!("invalid log_directory template: {}", e)))?;

        let debug_log = config
            .debug_log
            .as_ref()
            .map(|path| DebugLog::new(path, &config.debug_label, &config.time_format));

        Ok(Self {
            host_log: HostLogWriter::new(&config.time_format),
            debug_log,
            client,
            templates,
            config,
            state: RwLock::new(OperationLogState::default()),
        })
    }

    /// Creates a callback from `RUSTIBLE_OPLOG_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::new(OperationLogConfig::from_env()?)
    }

    /// The active configuration.
    pub fn config(&self) -> &OperationLogConfig {
        &self.config
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> SinkPhase {
        self.state.read().phase
    }

    /// Failures accumulated so far; empty once flushed.
    pub fn failures(&self) -> ErrorAccumulator {
        self.state.read().failures.clone()
    }

    /// Hosts seen starting and finishing.
    pub fn progress(&self) -> ProgressTracker {
        self.state.read().progress.clone()
    }

    /// Number of host results handled.
    pub fn notification_count(&self) -> usize {
        self.state.read().notifications
    }

    /// Renders the configured log directory for `host`.
    pub fn log_directory(&self, variables: &dyn VariableSource, host: &str) -> Result<PathBuf> {
        let source = self.config.log_directory.as_str();
        let mut context = variables.host_vars(host).unwrap_or_default();
        context
            .entry("inventory_hostname".to_string())
            .or_insert_with(|| JsonValue::String(host.to_string()));

        let template_error = |message: String| Error::Template {
            host: host.to_string(),
            template: source.to_string(),
            message,
        };

        let template = self
            .templates
            .get_template(LOG_DIRECTORY_TEMPLATE)
            .map_err(|e| template_error(e.to_string()))?;

        let rendered = template.render(&context).map_err(|e| {
            if e.kind() == ErrorKind::UndefinedError {
                // Undefined nested attributes of a defined variable stay template errors.
                template
                    .undeclared_variables(false)
                    .into_iter()
                    .find(|name| !context.contains_key(name))
                    .map(|missing| Error::missing_variable(host, missing))
                    .unwrap_or_else(|| template_error(e.to_string()))
            } else {
                template_error(e.to_string())
            }
        })?;

        let rendered = rendered.trim();
        if rendered.is_empty() {
            return Err(template_error("rendered to an empty path".to_string()));
        }
        Ok(PathBuf::from(rendered))
    }

    /// Looks up the run identifier on `host`.
    fn run_id(&self, variables: &dyn VariableSource, host: &str) -> Result<String> {
        let name = &self.config.run_id_var;
        match variables.host_var(host, name) {
            Some(JsonValue::String(id)) => Ok(id),
            Some(JsonValue::Null) | None => Err(Error::missing_variable(host, name)),
            Some(other) => Ok(other.to_string()),
        }
    }

    fn debug(&self, message: &str) -> Result<()> {
        debug!("{}", message);
        match self.debug_log {
            Some(ref log) => log.write(message),
            None => Ok(()),
        }
    }
}

// ============================================================================
// ResultCallback Implementation
// ============================================================================

#[async_trait]
impl ResultCallback for OperationLogCallback {
    async fn on_play_start(&self, play: &PlayContext) -> Result<()> {
        let mut state = self.state.write();
        if state.phase == SinkPhase::Flushed {
            return Err(Error::RunFinished);
        }
        if state.phase == SinkPhase::Accumulating {
            debug!("Play '{}' replaces the variable source", play.name);
        }

        state.variables = Some(Arc::clone(&play.variables));
        state.phase = SinkPhase::Accumulating;

        info!(
            play = %play.name,
            hosts = play.hosts.len(),
            "Operation log accumulating"
        );
        Ok(())
    }

    async fn on_host_result(
        &self,
        host: &str,
        result: ResultRecord,
        category: ResultCategory,
    ) -> Result<()> {
        let variables = {
            let state = self.state.read();
            if state.phase == SinkPhase::Flushed {
                return Err(Error::RunFinished);
            }
            state.variables.clone().ok_or(Error::PlayNotStarted)?
        };

        // Strict filtering only guards records that end up in the envelope.
        let mode = if category.is_error() {
            self.config.filter_mode
        } else {
            FilterMode::Lenient
        };
        let record = filter_record(result, &self.config.filtered_fields, mode)?;

        {
            let mut state = self.state.write();
            state.notifications += 1;
            state.progress.mark_started(host);
            if category.is_error() {
                state.failures.push(host, category, record.clone());
            }
        }

        let dir = self.log_directory(variables.as_ref(), host)?;
        let path = self.host_log.append_result(&dir, host, category, &record)?;

        debug!(
            host = %host,
            category = %category,
            log = %path.display(),
            "Recorded host result"
        );
        Ok(())
    }

    async fn on_playbook_end(&self, stats: &PlaybookStats) -> Result<()> {
        let (failures, variables) = {
            let mut state = self.state.write();
            if state.phase == SinkPhase::Flushed {
                return Err(Error::RunFinished);
            }
            state.phase = SinkPhase::Flushed;
            for host in stats.processed.keys() {
                state.progress.mark_finished(host);
            }
            let unfinished = state.progress.in_flight();
            if !unfinished.is_empty() {
                warn!(hosts = ?unfinished, "Hosts reported results but have no final stats");
            }
            (state.failures.take(), state.variables.take())
        };

        if failures.is_empty() {
            info!("No failures recorded; nothing to send");
            return Ok(());
        }

        let variables = variables.ok_or(Error::PlayNotStarted)?;
        let host = stats
            .first_processed()
            .or_else(|| failures.first_host())
            .ok_or(Error::PlayNotStarted)?;
        let run_id = self.run_id(variables.as_ref(), host)?;

        self.debug(&format!(
            "playbook_on_stats: {} ===> {}",
            self.config.contract.id_key(),
            run_id
        ))?;
        self.debug(&format!(
            "playbook_on_stats: failures ===> {}",
            serde_json::to_string(&failures)?
        ))?;

        let envelope = CallbackEnvelope::build(self.config.contract, run_id, &failures);
        let response = self.client.send(&envelope).await?;

        if response.is_success() {
            info!(
                status = response.status,
                hosts = failures.host_count(),
                records = failures.record_count(),
                "Operation log delivered"
            );
        } else {
            warn!(status = response.status, "Operation log rejected");
        }
        self.debug(&format!("send_callback_request: res ===> {}", response))?;

        response.ensure_success().map(|_| ())
    }
}
