//! Operation-log callback for runner result events.
//!
//! # Architecture
//!
//! ```text
//! runner ──on_host_result──> filter ──> ErrorAccumulator (error categories)
//!                               └─────> HostLogWriter    (every category)
//! runner ──on_playbook_end─> CallbackEnvelope ──> CallbackClient ──> collector
//! ```
//!
//! 1. **[`ResultCallback`]** trait: the three events a result sink receives
//! 2. **[`filter`]**: strips noisy fields from each record
//! 3. **[`accumulator`]**: error records per host and category for one run
//! 4. **[`envelope`]** and **[`client`]**: the single end-of-run request
//! 5. **[`plugins`]**: the [`OperationLogCallback`] sink tying it together
//!
//! # Quick Start with Prelude
//!
//! ```rust,ignore
//! use rustible_oplog::callback::prelude::*;
//!
//! let callback = OperationLogCallback::new(
//!     OperationLogConfig::builder()
//!         .url("http://collector:8087/api/ansible_plugin/callback/kc_operation_log")
//!         .log_directory("/home/{{ ssh_user }}/oplog")
//!         .build(),
//! )?;
//! ```
//!
//! [`ResultCallback`]: crate::traits::ResultCallback

pub mod accumulator;
pub mod client;
pub mod config;
pub mod envelope;
pub mod filter;
pub mod plugins;
pub mod types;

pub use accumulator::{ErrorAccumulator, ProgressTracker};
pub use client::{CallbackClient, CallbackResponse};
pub use config::{HttpMethod, OperationLogConfig, OperationLogConfigBuilder};
pub use envelope::{CallbackEnvelope, CategoryPayload, EnvelopeContract};
pub use filter::{filter_record, FilterMode, DEFAULT_FILTERED_FIELDS};
pub use plugins::{DebugLog, HostLogWriter, OperationLogCallback, SinkPhase};
pub use types::{HostStats, PlaybookStats, ResultCategory, ResultRecord};

/// A shared callback wrapped in Arc for thread-safe shared ownership.
pub type SharedCallback = std::sync::Arc<dyn crate::traits::ResultCallback>;

/// Convenient re-exports for wiring the callback into a runner.
pub mod prelude {
    pub use super::{
        EnvelopeContract, FilterMode, HttpMethod, OperationLogCallback, OperationLogConfig,
        PlaybookStats, ResultCategory, ResultRecord, SharedCallback,
    };
    pub use crate::traits::{PlayContext, ResultCallback, VariableSource};
    pub use async_trait::async_trait;
}
