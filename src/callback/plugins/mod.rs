//! Callback plugins shipped with rustible-oplog.
//!
//! # Available Plugins
//!
//! - [`OperationLogCallback`] - Per-host result logs plus an end-of-run
//!   failure report to a remote collector
//!
//! # Example
//!
//! ```rust,ignore
//! use rustible_oplog::callback::plugins::OperationLogCallback;
//!
//! let callback = OperationLogCallback::from_env()?;
//! runner.with_callback(Arc::new(callback));
//! ```

pub mod host_log;
pub mod operation_log;

pub use host_log::{DebugLog, HostLogWriter};
pub use operation_log::{OperationLogCallback, SinkPhase};
