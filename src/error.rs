//! Unified error types for the guidance pipeline.
//!
//! Two kinds of failure exist and they never mix. Structural failures
//! (malformed input, an unreachable gate repository, a cancelled run) are
//! errors and abort the whole pipeline. Content-quality failures (ungrounded
//! claims, failed rules, blocking gates) are ordinary results encoded in the
//! decision and are never raised through this type.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for guidance pipeline operations.
#[derive(Error, Debug)]
pub enum GuidanceError {
    /// Malformed or missing required fields in caller-supplied input.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// The gate repository could not be read.
    #[error("gate repository unavailable: {message}")]
    RepositoryUnavailable { message: String },

    /// I/O errors from file operations.
    #[error("storage error at {path}: {source}")]
    Storage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// JSON or TOML parsing/serialization errors.
    #[error("serialization error: {message}")]
    Serde { message: String },

    /// Configuration loading errors.
    #[error("config error: {message}")]
    Config { message: String },

    /// The caller cancelled the run before a decision was reached.
    #[error("pipeline cancelled during {stage}")]
    Cancelled { stage: String },
}

/// A specialized Result type for guidance pipeline operations.
pub type Result<T> = std::result::Result<T, GuidanceError>;

impl GuidanceError {
    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a repository unavailable error.
    pub fn repository_unavailable(message: impl Into<String>) -> Self {
        Self::RepositoryUnavailable {
            message: message.into(),
        }
    }

    /// Create a storage error from an I/O error.
    pub fn storage(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    /// Create a serialization error.
    pub fn serde(message: impl Into<String>) -> Self {
        Self::Serde {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a cancellation error for the given stage.
    pub fn cancelled(stage: impl Into<String>) -> Self {
        Self::Cancelled {
            stage: stage.into(),
        }
    }

    /// Whether this error came from caller input rather than infrastructure.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::InvalidInput { .. })
    }
}

impl From<io::Error> for GuidanceError {
    fn from(err: io::Error) -> Self {
        Self::Storage {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for GuidanceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serde {
            message: err.to_string(),
        }
    }
}

/// Fail-open handling for configuration loading.
///
/// A config file that exists but cannot be read or parsed is logged and
/// replaced by defaults. Only configuration uses this. Repository reads must
/// propagate their errors so that "no gates" is never confused with "could
/// not check".
pub trait FailOpen<T> {
    /// Handle an error by logging a warning and returning the default value.
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default;
}

impl<T> FailOpen<T> for Result<T> {
    fn fail_open_default(self, context: &str) -> T
    where
        T: Default,
    {
        match self {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!("{}: {} (fail-open: using default)", context, err);
                T::default()
            }
        }
    }
}

/// Exit codes for the `guidance` CLI.
pub mod exit_codes {
    /// The decision passed and the answer may be shown as-is.
    pub const APPROVE: i32 = 0;

    /// A decision was reached but the answer must not be shown as-is.
    pub const BLOCK: i32 = 2;

    /// The pipeline aborted with an error.
    pub const CRASH: i32 = 3;
}
