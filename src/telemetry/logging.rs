//! Structured logging built on tracing-subscriber.
//!
//! Diagnostics go to stderr, or to a file when one is configured, so that
//! command output on stdout stays clean.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::error::{Error, Result};
use crate::telemetry::config::{LogFormat, LogLevel, LoggingConfig};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Builder for the global logging subscriber.
#[derive(Debug, Clone, Default)]
pub struct LoggingBuilder {
    config: LoggingConfig,
}

impl LoggingBuilder {
    /// Create a new logging builder with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder from an existing configuration.
    pub fn from_config(config: LoggingConfig) -> Self {
        Self { config }
    }

    /// Set the log level.
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.config.level = level;
        self
    }

    /// Set the log format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.config.format = format;
        self
    }

    /// Set ANSI colors.
    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.config.ansi_colors = enabled;
        self
    }

    /// Include target in logs.
    pub fn with_target(mut self, enabled: bool) -> Self {
        self.config.with_target = enabled;
        self
    }

    /// Set filter directive.
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.config.filter = Some(filter.into());
        self
    }

    /// Set log file path.
    pub fn with_file_output(mut self, path: impl AsRef<Path>) -> Self {
        self.config.file = Some(path.as_ref().to_path_buf());
        self
    }

    /// Install the global subscriber.
    pub fn init(self) -> Result<()> {
        let layer = self.build_layer()?;
        tracing_subscriber::registry()
            .with(layer)
            .try_init()
            .map_err(|e| Error::Config(e.to_string()))
    }

    /// Build the formatting layer without installing it.
    pub fn build_layer(&self) -> Result<BoxedLayer> {
        let filter = self.build_filter();
        let writer = self.make_writer()?;
        // File output never carries escape codes.
        let ansi = self.config.ansi_colors && self.config.file.is_none();

        let base = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_target(self.config.with_target)
            .with_file(self.config.with_file)
            .with_line_number(self.config.with_file);

        let layer: BoxedLayer = match self.config.format {
            LogFormat::Pretty => Box::new(base.pretty().with_ansi(ansi).with_filter(filter)),
            LogFormat::Compact => Box::new(base.compact().with_ansi(ansi).with_filter(filter)),
            LogFormat::Json => Box::new(base.json().with_current_span(true).with_filter(filter)),
            LogFormat::Full => Box::new(
                base.with_ansi(ansi)
                    .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
                    .with_filter(filter),
            ),
        };
        Ok(layer)
    }

    fn build_filter(&self) -> EnvFilter {
        let default_filter = self.config.level.to_string();

        if let Some(ref filter) = self.config.filter {
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(filter))
                .unwrap_or_else(|_| EnvFilter::new(&default_filter))
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter))
        }
    }

    fn make_writer(&self) -> Result<BoxMakeWriter> {
        match self.config.file {
            Some(ref path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
                    }
                }
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .map_err(|e| Error::io(path, e))?;
                Ok(BoxMakeWriter::new(Mutex::new(file)))
            }
            None => Ok(BoxMakeWriter::new(io::stderr)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_logging_builder() {
        let builder = LoggingBuilder::new()
            .with_level(LogLevel::Debug)
            .with_format(LogFormat::Json)
            .with_ansi(false)
            .with_target(true)
            .with_filter("rustible_oplog=trace");

        assert_eq!(builder.config.level, LogLevel::Debug);
        assert_eq!(builder.config.format, LogFormat::Json);
        assert!(!builder.config.ansi_colors);
        assert!(builder.config.with_target);
        assert_eq!(builder.config.filter.as_deref(), Some("rustible_oplog=trace"));
    }

    #[test]
    fn test_build_layer_for_every_format() {
        for format in [
            LogFormat::Pretty,
            LogFormat::Compact,
            LogFormat::Json,
            LogFormat::Full,
        ] {
            assert!(LoggingBuilder::new().with_format(format).build_layer().is_ok());
        }
    }

    #[test]
    fn test_file_output_creates_parent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("logs").join("oplog.log");

        LoggingBuilder::new()
            .with_file_output(&path)
            .build_layer()
            .unwrap();
        assert!(path.exists());
    }
}
