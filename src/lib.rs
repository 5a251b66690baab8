//! # rustible-oplog - Operation-Log Result Sink
//!
//! A callback for Rustible runs that keeps a local, append-only log of every
//! host result and, once the playbook ends, reports the failures of the run
//! to a remote collector in a single HTTP request.
//!
//! ## Architecture Overview
//!
//! ```text
//!            runner events
//!                 │
//!                 ▼
//! ┌─────────────────────────────────┐      ┌──────────────────────┐
//! │      OperationLogCallback       │─────▶│  <log_dir>/<host>.log │
//! │  filter → accumulate → log      │      └──────────────────────┘
//! └─────────────────────────────────┘
//!                 │ playbook end, failures only
//!                 ▼
//! ┌─────────────────────────────────┐
//! │  CallbackEnvelope → collector   │
//! └─────────────────────────────────┘
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use rustible_oplog::prelude::*;
//!
//! let callback = OperationLogCallback::new(OperationLogConfig::from_env()?)?;
//! callback.on_play_start(&PlayContext::new("site", hosts, Arc::new(vars))).await?;
//! callback.on_host_result("web1", record, ResultCategory::Failed).await?;
//! callback.on_playbook_end(&stats).await?;
//! ```

pub mod callback;
pub mod config;
pub mod error;
pub mod replay;
pub mod telemetry;
pub mod traits;
pub mod vars;

pub use error::{Error, Result};

/// Commonly used types.
pub mod prelude {
    pub use crate::callback::prelude::*;
    pub use crate::error::{Error, Result};
    pub use crate::replay::{replay, ReplaySummary, RunnerEvent};
    pub use crate::vars::HostVars;
}

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
