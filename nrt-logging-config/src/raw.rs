//! Raw configuration schema as it appears in YAML.
//!
//! These structs mirror the file layout one-to-one and carry every value as
//! it was written; validation and inheritance happen in [`crate::resolve`].
//! Unknown keys are rejected by serde (`deny_unknown_fields`), which is the
//! schema check of the loader.

use serde::{Deserialize, Serialize};

/// Top level of a log configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawManagerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_line_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_yaml_elements: Option<Vec<String>>,
    /// Loggers, in declaration order. Required and non-empty.
    #[serde(default)]
    pub loggers: Vec<RawLoggerConfig>,
}

/// One named logger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawLoggerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_line_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_yaml_elements: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_handlers: Option<Vec<RawHandlerConfig>>,
}

/// One stream handler attached to a logger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawHandlerConfig {
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub handler_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bytes: Option<u64>,
    /// Signed so that a negative count reaches validation instead of failing
    /// inside serde with a less helpful message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_archive_files: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compress: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_line_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_yaml_elements: Option<Vec<String>>,
}

impl RawHandlerConfig {
    /// Whether any rotation knob is present.
    pub fn has_rotation(&self) -> bool {
        self.max_bytes.is_some() || self.max_archive_files.is_some() || self.compress.is_some()
    }
}
