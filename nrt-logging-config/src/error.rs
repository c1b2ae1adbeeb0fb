//! Typed error variants for the nrt-logging-config crate.
//!
//! Every variant describes a configuration that must be rejected before any
//! logger is constructed.

use std::path::PathBuf;
use thiserror::Error;

/// A single value could not be parsed into one of the configuration enums.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} [{value}]")]
pub struct ParseValueError {
    /// Human-readable name of the expected kind (`log level`, `style`, ...).
    pub kind: &'static str,
    /// The offending input.
    pub value: String,
}

impl ParseValueError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Errors produced while loading, validating or resolving a log configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither a configuration file nor an inline configuration was supplied.
    #[error("file_path or config parameters must be set")]
    MissingSource,

    /// Both a configuration file and an inline configuration were supplied.
    #[error("file_path or config parameters must be set, but not both of the parameters")]
    AmbiguousSource,

    /// The configuration file could not be read.
    #[error("failed to read log config '{}': {source}", path.display())]
    Io {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid YAML or does not match the schema
    /// (unknown keys, wrong value types).
    #[error("log config is invalid: {0}")]
    Parse(#[from] serde_yaml_ng::Error),

    /// A required field is absent.
    #[error("{context} in log config does not contain {field}")]
    MissingField {
        /// Which part of the configuration was being validated.
        context: String,
        /// Name of the missing key.
        field: &'static str,
    },

    /// A list that must contain at least one entry is empty.
    #[error("{field} in {context} must not be empty")]
    EmptyList {
        /// Which part of the configuration was being validated.
        context: String,
        /// Name of the empty key.
        field: &'static str,
    },

    /// A field holds a value outside its domain.
    #[error("{field} value [{value}] in log config is invalid: {reason}")]
    InvalidValue {
        /// Name of the key.
        field: &'static str,
        /// The offending value, rendered as text.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Two loggers share the same name.
    #[error("logger [{0}] is configured multiple times in log config")]
    DuplicateLogger(String),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, value: impl ToString, reason: impl ToString) -> Self {
        ConfigError::InvalidValue {
            field,
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }
}
