//! Error types for the operation-log callback.
//!
//! Every failure a handler can hit is surfaced to the runner unchanged; none
//! of these are recovered locally.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for operation-log operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The main error type for the operation-log callback.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// A host variable the callback depends on is not defined.
    #[error("Variable '{name}' is not defined for host '{host}'")]
    MissingVariable {
        /// Host whose variables were consulted
        host: String,
        /// Name of the missing variable
        name: String,
    },

    /// A template referencing host variables could not be rendered.
    #[error("Failed to render '{template}' for host '{host}': {message}")]
    Template {
        /// Host whose variables were used
        host: String,
        /// The template source
        template: String,
        /// Error message
        message: String,
    },

    /// Invalid callback configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error loading host variables from an inventory file.
    #[error("Failed to load inventory from '{path}': {message}")]
    InventoryLoad {
        /// Path to inventory
        path: PathBuf,
        /// Error message
        message: String,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// A host result arrived before any play started.
    #[error("No play has started; host variables are unavailable")]
    PlayNotStarted,

    /// An event arrived after the run was already flushed.
    #[error("The run has already been flushed; no further events are accepted")]
    RunFinished,

    // ========================================================================
    // Filtering Errors
    // ========================================================================
    /// Strict filtering found a configured field absent from a record.
    #[error("Filtered field '{0}' is not present in the result")]
    FilteredFieldMissing(String),

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// Filesystem failure while writing a log.
    #[error("I/O error on '{path}': {source}")]
    Io {
        /// File or directory involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    // ========================================================================
    // Network Errors
    // ========================================================================
    /// Transport-level failure talking to the callback endpoint.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The callback endpoint answered with a non-success status.
    #[error("Callback endpoint returned {status}: {body}")]
    CallbackRejected {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    // ========================================================================
    // Serialization Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A replayed event stream line could not be decoded.
    #[error("Invalid event on line {line}: {message}")]
    InvalidEvent {
        /// 1-based line number
        line: usize,
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create an I/O error bound to a path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a missing variable error.
    pub fn missing_variable(host: impl Into<String>, name: impl Into<String>) -> Self {
        Error::MissingVariable {
            host: host.into(),
            name: name.into(),
        }
    }

    /// Returns true for errors raised by the network leg of a flush.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Http(_) | Error::CallbackRejected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::missing_variable("web1", "operation_log_uuid");
        assert_eq!(
            err.to_string(),
            "Variable 'operation_log_uuid' is not defined for host 'web1'"
        );

        let err = Error::CallbackRejected {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert!(err.to_string().contains("502"));
        assert!(err.is_network());
    }

    #[test]
    fn test_io_error_keeps_source() {
        use std::error::Error as _;

        let err = Error::io(
            "/nonexistent/web1.log",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/nonexistent/web1.log"));
        assert!(err.source().is_some());
        assert!(!err.is_network());
    }
}
