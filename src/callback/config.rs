//! Operation-Log Callback Configuration
//!
//! Settings for where results are logged locally and how the end-of-run
//! envelope reaches the collector.
//!
//! # Configuration File Format (TOML)
//!
//! ```toml
//! [callback]
//! url = "http://localhost:8087/api/ansible_plugin/callback/kc_operation_log"
//! method = "post"
//! contract = "operation_log_id"
//! run_id_var = "operation_log_uuid"
//! log_directory = "{{ log_path }}"
//! filter_mode = "lenient"
//! debug_log = "/var/log/rustible/oplog-debug.log"
//!
//! [callback.headers]
//! "Content-Type" = "application/json;charset=utf-8"
//! ```
//!
//! # Environment Variables
//!
//! - `RUSTIBLE_OPLOG_URL` - Callback endpoint URL
//! - `RUSTIBLE_OPLOG_METHOD` - `post` or `put`
//! - `RUSTIBLE_OPLOG_AUTHORIZATION` - Value of the `Authorization` header
//! - `RUSTIBLE_OPLOG_DEBUG_LOG` - Path of the debug log file
//! - `RUSTIBLE_OPLOG_TIMEOUT` - Request timeout in seconds

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::callback::envelope::EnvelopeContract;
use crate::callback::filter::{FilterMode, DEFAULT_FILTERED_FIELDS};
use crate::error::{Error, Result};

/// Default collector endpoint.
pub const DEFAULT_CALLBACK_URL: &str =
    "http://localhost:8087/api/ansible_plugin/callback/kc_operation_log";

/// Timestamp format used in every local log line.
pub const DEFAULT_TIME_FORMAT: &str = "%b %d %Y %H:%M:%S";

/// Content type sent with every envelope.
pub const JSON_CONTENT_TYPE: &str = "application/json;charset=utf-8";

// ============================================================================
// HTTP Method
// ============================================================================

/// Method used to deliver the envelope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpMethod {
    #[default]
    Post,
    Put,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Post => write!(f, "POST"),
            HttpMethod::Put => write!(f, "PUT"),
        }
    }
}

impl FromStr for HttpMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "post" => Ok(HttpMethod::Post),
            "put" => Ok(HttpMethod::Put),
            other => Err(Error::Config(format!(
                "unsupported HTTP method '{}', expected post or put",
                other
            ))),
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for the operation-log callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperationLogConfig {
    /// Collector endpoint receiving the envelope.
    pub url: String,

    /// HTTP method for the envelope.
    pub method: HttpMethod,

    /// Headers sent with the envelope, in order.
    pub headers: IndexMap<String, String>,

    /// Envelope key names and record layout.
    pub contract: EnvelopeContract,

    /// Host variable holding the run identifier.
    pub run_id_var: String,

    /// Directory of the per-host log, rendered against the host's variables.
    /// Missing variables are an error.
    pub log_directory: String,

    /// chrono format of the timestamp prefixing each log line.
    pub time_format: String,

    /// Fields stripped from every record.
    pub filtered_fields: Vec<String>,

    /// Whether a missing filtered field is an error.
    pub filter_mode: FilterMode,

    /// Optional debug log receiving run id, failures and the raw response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_log: Option<PathBuf>,

    /// Label written into each debug log line.
    pub debug_label: String,

    /// Request timeout in seconds; `None` waits indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for OperationLogConfig {
    fn default() -> Self {
        let mut headers = IndexMap::new();
        headers.insert("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string());

        Self {
            url: DEFAULT_CALLBACK_URL.to_string(),
            method: HttpMethod::Post,
            headers,
            contract: EnvelopeContract::OperationLogId,
            run_id_var: "operation_log_uuid".to_string(),
            log_directory: "{{ log_path }}".to_string(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
            filtered_fields: DEFAULT_FILTERED_FIELDS
                .iter()
                .map(|f| f.to_string())
                .collect(),
            filter_mode: FilterMode::Lenient,
            debug_log: None,
            debug_label: "kc_operation_log".to_string(),
            timeout_secs: None,
        }
    }
}

impl OperationLogConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> OperationLogConfigBuilder {
        OperationLogConfigBuilder::default()
    }

    /// The Kylin v4 collector profile: versioned `Accept`, an
    /// `Authorization` header and the `operationLogUuid` contract.
    #[must_use]
    pub fn kylin_v4(authorization: impl Into<String>) -> Self {
        let mut headers = IndexMap::new();
        headers.insert(
            "Accept".to_string(),
            "application/vnd.apache.kylin-v4+json".to_string(),
        );
        headers.insert("Accept-Language".to_string(), "en".to_string());
        headers.insert("Content-Type".to_string(), JSON_CONTENT_TYPE.to_string());
        headers.insert("Authorization".to_string(), authorization.into());

        Self {
            headers,
            contract: EnvelopeContract::OperationLogUuid,
            ..Default::default()
        }
    }

    /// Default configuration with environment overrides applied.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Applies `RUSTIBLE_OPLOG_*` environment overrides.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(url) = env::var("RUSTIBLE_OPLOG_URL") {
            self.url = url;
        }

        if let Ok(method) = env::var("RUSTIBLE_OPLOG_METHOD") {
            self.method = method.parse()?;
        }

        if let Ok(token) = env::var("RUSTIBLE_OPLOG_AUTHORIZATION") {
            self.headers.insert("Authorization".to_string(), token);
        }

        if let Ok(path) = env::var("RUSTIBLE_OPLOG_DEBUG_LOG") {
            self.debug_log = Some(PathBuf::from(path));
        }

        if let Ok(timeout) = env::var("RUSTIBLE_OPLOG_TIMEOUT") {
            let secs = timeout.parse().map_err(|_| {
                Error::Config(format!("invalid RUSTIBLE_OPLOG_TIMEOUT '{}'", timeout))
            })?;
            self.timeout_secs = Some(secs);
        }

        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.url)
            .map_err(|e| Error::Config(format!("invalid url '{}': {}", self.url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config(
                "url must start with http:// or https://".to_string(),
            ));
        }
        if self.run_id_var.trim().is_empty() {
            return Err(Error::Config("run_id_var must not be empty".to_string()));
        }
        if self.log_directory.trim().is_empty() {
            return Err(Error::Config("log_directory must not be empty".to_string()));
        }
        if self.timeout_secs == Some(0) {
            return Err(Error::Config("timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}

/// Builder for `OperationLogConfig`.
#[derive(Debug, Default)]
pub struct OperationLogConfigBuilder {
    config: OperationLogConfig,
}

impl OperationLogConfigBuilder {
    /// Sets the collector URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.config.url = url.into();
        self
    }

    /// Sets the HTTP method.
    #[must_use]
    pub fn method(mut self, method: HttpMethod) -> Self {
        self.config.method = method;
        self
    }

    /// Adds or replaces a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the envelope contract.
    #[must_use]
    pub fn contract(mut self, contract: EnvelopeContract) -> Self {
        self.config.contract = contract;
        self
    }

    /// Sets the host variable holding the run identifier.
    #[must_use]
    pub fn run_id_var(mut self, name: impl Into<String>) -> Self {
        self.config.run_id_var = name.into();
        self
    }

    /// Sets the log directory template.
    #[must_use]
    pub fn log_directory(mut self, template: impl Into<String>) -> Self {
        self.config.log_directory = template.into();
        self
    }

    /// Sets the filtered fields.
    #[must_use]
    pub fn filtered_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.filtered_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the filter mode.
    #[must_use]
    pub fn filter_mode(mut self, mode: FilterMode) -> Self {
        self.config.filter_mode = mode;
        self
    }

    /// Sets the debug log path.
    #[must_use]
    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.debug_log = Some(path.into());
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = Some(secs);
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> OperationLogConfig {
        self.config
    }
}
