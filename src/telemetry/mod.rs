//! Diagnostics for rustible-oplog.
//!
//! All diagnostics go through the `tracing` macros; this module only
//! decides how they are rendered.
//!
//! ```rust,ignore
//! use rustible_oplog::telemetry::{LogFormat, LoggingBuilder};
//!
//! LoggingBuilder::new().with_format(LogFormat::Json).init()?;
//! tracing::info!(host = %host, "Recorded host result");
//! ```

pub mod config;
pub mod logging;

pub use config::{LogFormat, LogLevel, LoggingConfig};
pub use logging::LoggingBuilder;
