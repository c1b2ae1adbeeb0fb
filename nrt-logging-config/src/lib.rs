//! Configuration system for nrt-logging.
//!
//! This crate owns everything the hierarchical logger needs to know before a
//! single logger is built:
//!
//! - Value types shared with the core crate (levels, styles, YAML elements,
//!   handler types, rotation policy)
//! - The raw YAML schema (`Raw*Config`), which rejects unknown keys
//! - Validation and top-down inheritance (manager → logger → stream handler)
//! - Loading from a YAML file or from an inline raw configuration
//!
//! Every failure is reported as a [`ConfigError`] before any logger exists.

pub mod defaults;
pub mod error;
pub mod persistence;
pub mod raw;
pub mod resolve;
mod types;

pub use error::{ConfigError, ParseValueError};
pub use raw::{RawHandlerConfig, RawLoggerConfig, RawManagerConfig};
pub use resolve::{HandlerConfig, LoggerConfig, ManagerConfig, Overrides, Settings};
pub use types::{HandlerType, LogElement, LogLevel, LogStyle, RotationPolicy};
