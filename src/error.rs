//! Typed error types for nrt-logging.
//!
//! Logging calls never retry and never drop output silently; every failure
//! reaches the caller of the logging operation as one of these variants.

use std::path::PathBuf;

use nrt_logging_config::ConfigError;
use thiserror::Error;

/// Top-level error type for loggers, handlers and the manager.
#[derive(Debug, Error)]
pub enum LogError {
    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------
    /// The configuration was rejected before any logger was built.
    #[error(transparent)]
    Config(#[from] ConfigError),

    // -----------------------------------------------------------------------
    // Usage
    // -----------------------------------------------------------------------
    /// A log call reached a logger with no stream handlers attached.
    #[error("logger [{logger}] has no stream handlers")]
    NoStreamHandlers {
        /// Name of the logger.
        logger: String,
    },

    // -----------------------------------------------------------------------
    // Programming defects
    // -----------------------------------------------------------------------
    /// Tracker or renderer reached a state that should be impossible.
    #[error("internal error: {0}")]
    Internal(String),

    // -----------------------------------------------------------------------
    // I/O
    // -----------------------------------------------------------------------
    /// Opening, writing or rotating a log file failed.
    #[error("log file I/O failed for '{}': {source}", path.display())]
    Io {
        /// File being written or rotated.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Background compression of a rolled file failed.
    #[error("failed to archive '{}': {source}", path.display())]
    Archive {
        /// The rolled file that was being compressed.
        path: PathBuf,
        /// Underlying zip error.
        #[source]
        source: zip::result::ZipError,
    },
}

impl LogError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LogError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LogError>;
