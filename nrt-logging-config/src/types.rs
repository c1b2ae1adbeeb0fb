//! Value types shared between the configuration layer and the logger core.

use crate::error::{ConfigError, ParseValueError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Log level
// ============================================================================

/// Severity of a log event, ordered from most verbose to most severe.
///
/// Comparisons are plain ordinal comparisons: an event passes a gate when
/// `event_level >= gate_level`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "UPPERCASE")]
#[repr(u8)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    #[default]
    Info = 2,
    Warn = 3,
    Error = 4,
    Critical = 5,
}

impl LogLevel {
    /// Upper-case name as it appears in rendered output.
    pub fn name(self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
        }
    }

    /// All levels, most verbose first.
    pub fn all() -> &'static [LogLevel] {
        &[
            LogLevel::Trace,
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
            LogLevel::Critical,
        ]
    }

    /// Ordinal backing this level.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Inverse of [`as_u8`](Self::as_u8).
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::all().get(usize::from(value)).copied()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LogLevel {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level = match s.trim().to_ascii_uppercase().as_str() {
            "TRACE" => LogLevel::Trace,
            "DEBUG" => LogLevel::Debug,
            "INFO" => LogLevel::Info,
            "WARN" | "WARNING" => LogLevel::Warn,
            "ERROR" => LogLevel::Error,
            "CRITICAL" => LogLevel::Critical,
            _ => return Err(ParseValueError::new("log level", s)),
        };
        Ok(level)
    }
}

// ============================================================================
// Style
// ============================================================================

/// Rendering style of a stream handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogStyle {
    /// One `- log: <line>` entry per event, nested under `children:` keys.
    #[default]
    Line,
    /// One mapping per event with a key per configured element; each root
    /// event starts a new YAML document.
    Yaml,
}

impl FromStr for LogStyle {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "line" => Ok(LogStyle::Line),
            "yaml" => Ok(LogStyle::Yaml),
            _ => Err(ParseValueError::new("style", s)),
        }
    }
}

// ============================================================================
// Elements
// ============================================================================

/// A field of a rendered event.
///
/// In LINE style an element is referenced from the line template as
/// `$name$`; in YAML style it becomes a `name: value` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogElement {
    Date,
    LogLevel,
    Path,
    Method,
    LineNumber,
    Message,
}

impl LogElement {
    /// Default ordering of YAML-style elements.
    pub const DEFAULT_ORDER: [LogElement; 6] = [
        LogElement::Date,
        LogElement::LogLevel,
        LogElement::Path,
        LogElement::Method,
        LogElement::LineNumber,
        LogElement::Message,
    ];

    /// Key used in YAML style and inside `$...$` template placeholders.
    pub fn name(self) -> &'static str {
        match self {
            LogElement::Date => "date",
            LogElement::LogLevel => "log_level",
            LogElement::Path => "path",
            LogElement::Method => "method",
            LogElement::LineNumber => "line_number",
            LogElement::Message => "message",
        }
    }

    /// Placeholder text in a LINE-style template.
    pub fn placeholder(self) -> String {
        format!("${}$", self.name())
    }
}

impl FromStr for LogElement {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::DEFAULT_ORDER
            .iter()
            .copied()
            .find(|element| element.name() == s.trim())
            .ok_or_else(|| ParseValueError::new("YAML log element", s))
    }
}

// ============================================================================
// Stream handler type
// ============================================================================

/// Kind of stream handler named by the `type` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerType {
    Console,
    File,
}

impl FromStr for HandlerType {
    type Err = ParseValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" => Ok(HandlerType::Console),
            "file" => Ok(HandlerType::File),
            _ => Err(ParseValueError::new("stream handler type", s)),
        }
    }
}

// ============================================================================
// Rotation
// ============================================================================

/// Size-based rotation settings of a file stream handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationPolicy {
    /// Bytes the active file may hold before it is rolled.
    pub max_bytes: u64,
    /// Number of rolled archives kept on disk; `0` keeps none.
    pub max_archive_files: usize,
    /// Compress each rolled archive into a single-entry zip in the background.
    pub compress: bool,
}

impl RotationPolicy {
    /// Build a policy, rejecting a zero size and a negative archive count.
    pub fn new(max_bytes: u64, max_archive_files: i64, compress: bool) -> Result<Self, ConfigError> {
        if max_bytes == 0 {
            return Err(ConfigError::invalid(
                "max_bytes",
                max_bytes,
                "must be greater than zero",
            ));
        }
        let max_archive_files = usize::try_from(max_archive_files).map_err(|_| {
            ConfigError::invalid("max_archive_files", max_archive_files, "must not be negative")
        })?;
        Ok(Self {
            max_bytes,
            max_archive_files,
            compress,
        })
    }
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: crate::defaults::max_bytes(),
            max_archive_files: crate::defaults::max_archive_files(),
            compress: false,
        }
    }
}
