//! Validation and top-down resolution of a raw configuration.
//!
//! Each layer (manager → logger → stream handler) may override any of the
//! shared rendering fields; a field left unset inherits the parent layer's
//! resolved value. Resolution either succeeds for the whole tree or fails with
//! the first [`ConfigError`] found, so no logger is ever built from a
//! partially valid configuration.

use crate::defaults;
use crate::error::ConfigError;
use crate::raw::{RawHandlerConfig, RawLoggerConfig, RawManagerConfig};
use crate::types::{HandlerType, LogElement, LogLevel, LogStyle, RotationPolicy};
use chrono::format::{Item, StrftimeItems};
use std::collections::HashSet;
use std::path::PathBuf;

/// Fully resolved rendering settings of one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub debug: bool,
    pub log_level: LogLevel,
    pub style: LogStyle,
    pub date_format: String,
    pub log_line_template: String,
    pub log_yaml_elements: Vec<LogElement>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: defaults::bool_false(),
            log_level: defaults::log_level(),
            style: defaults::style(),
            date_format: defaults::date_format(),
            log_line_template: defaults::log_line_template(),
            log_yaml_elements: defaults::log_yaml_elements(),
        }
    }
}

/// The overridable fields of a single layer, borrowed from its raw form.
#[derive(Debug, Clone, Copy, Default)]
pub struct Overrides<'a> {
    pub debug: Option<bool>,
    pub log_level: Option<&'a str>,
    pub style: Option<&'a str>,
    pub date_format: Option<&'a str>,
    pub log_line_template: Option<&'a str>,
    pub log_yaml_elements: Option<&'a [String]>,
}

impl Settings {
    /// Resolve a child layer: parse every override it sets and inherit the rest.
    pub fn inherit(&self, overrides: Overrides<'_>) -> Result<Settings, ConfigError> {
        let mut settings = self.clone();

        if let Some(debug) = overrides.debug {
            settings.debug = debug;
        }
        if let Some(level) = overrides.log_level {
            settings.log_level = level
                .parse()
                .map_err(|e| ConfigError::invalid("log_level", level, e))?;
        }
        if let Some(style) = overrides.style {
            settings.style = style
                .parse()
                .map_err(|e| ConfigError::invalid("style", style, e))?;
        }
        if let Some(format) = overrides.date_format {
            validate_date_format(format)?;
            settings.date_format = format.to_string();
        }
        if let Some(template) = overrides.log_line_template {
            settings.log_line_template = template.to_string();
        }
        if let Some(names) = overrides.log_yaml_elements {
            settings.log_yaml_elements = parse_elements(names)?;
        }

        Ok(settings)
    }
}

/// Reject strftime patterns chrono cannot format.
pub fn validate_date_format(format: &str) -> Result<(), ConfigError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(ConfigError::invalid(
            "date_format",
            format,
            "not a valid strftime pattern",
        ));
    }
    Ok(())
}

fn parse_elements(names: &[String]) -> Result<Vec<LogElement>, ConfigError> {
    if names.is_empty() {
        return Err(ConfigError::EmptyList {
            context: "log config".to_string(),
            field: "log_yaml_elements",
        });
    }
    names
        .iter()
        .map(|name| {
            name.parse()
                .map_err(|e| ConfigError::invalid("log_yaml_elements", name, e))
        })
        .collect()
}

// ============================================================================
// Resolved tree
// ============================================================================

/// A validated stream handler specification.
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerConfig {
    pub handler_type: HandlerType,
    /// Target file; always `Some` for [`HandlerType::File`].
    pub file_path: Option<PathBuf>,
    /// Present when the file handler rotates.
    pub rotation: Option<RotationPolicy>,
    pub settings: Settings,
}

impl HandlerConfig {
    /// A console handler with the given settings.
    pub fn console(settings: Settings) -> Self {
        Self {
            handler_type: HandlerType::Console,
            file_path: None,
            rotation: None,
            settings,
        }
    }

    /// A plain or rotating file handler with the given settings.
    pub fn file(
        path: impl Into<PathBuf>,
        rotation: Option<RotationPolicy>,
        settings: Settings,
    ) -> Self {
        Self {
            handler_type: HandlerType::File,
            file_path: Some(path.into()),
            rotation,
            settings,
        }
    }

    fn from_raw(raw: &RawHandlerConfig, parent: &Settings, logger: &str) -> Result<Self, ConfigError> {
        let context = format!("stream handler of logger [{logger}]");
        let type_name = raw.handler_type.as_deref().ok_or(ConfigError::MissingField {
            context: context.clone(),
            field: "type",
        })?;
        let handler_type: HandlerType = type_name
            .parse()
            .map_err(|e| ConfigError::invalid("type", type_name, e))?;

        let file_path = match (handler_type, raw.file_path.as_deref()) {
            (HandlerType::File, None | Some("")) => {
                return Err(ConfigError::MissingField {
                    context,
                    field: "file_path",
                });
            }
            (_, path) => path.map(PathBuf::from),
        };

        let rotation = if handler_type == HandlerType::File && raw.has_rotation() {
            Some(RotationPolicy::new(
                raw.max_bytes.unwrap_or_else(defaults::max_bytes),
                raw.max_archive_files
                    .unwrap_or(defaults::max_archive_files() as i64),
                raw.compress.unwrap_or(false),
            )?)
        } else {
            None
        };

        let settings = parent.inherit(Overrides {
            debug: raw.debug,
            log_level: raw.log_level.as_deref(),
            style: raw.style.as_deref(),
            date_format: raw.date_format.as_deref(),
            log_line_template: raw.log_line_template.as_deref(),
            log_yaml_elements: raw.log_yaml_elements.as_deref(),
        })?;

        Ok(Self {
            handler_type,
            file_path,
            rotation,
            settings,
        })
    }
}

/// A validated logger specification.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggerConfig {
    pub name: String,
    pub settings: Settings,
    pub handlers: Vec<HandlerConfig>,
}

impl LoggerConfig {
    fn from_raw(raw: &RawLoggerConfig, parent: &Settings) -> Result<Self, ConfigError> {
        let name = match raw.name.as_deref() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                return Err(ConfigError::MissingField {
                    context: "logger".to_string(),
                    field: "name",
                });
            }
        };

        let settings = parent.inherit(Overrides {
            debug: raw.debug,
            log_level: raw.log_level.as_deref(),
            style: raw.style.as_deref(),
            date_format: raw.date_format.as_deref(),
            log_line_template: raw.log_line_template.as_deref(),
            log_yaml_elements: raw.log_yaml_elements.as_deref(),
        })?;

        let raw_handlers = raw
            .stream_handlers
            .as_deref()
            .ok_or_else(|| ConfigError::MissingField {
                context: format!("logger [{name}]"),
                field: "stream_handlers",
            })?;
        if raw_handlers.is_empty() {
            return Err(ConfigError::EmptyList {
                context: format!("logger [{name}]"),
                field: "stream_handlers",
            });
        }

        let handlers = raw_handlers
            .iter()
            .map(|handler| HandlerConfig::from_raw(handler, &settings, &name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            name,
            settings,
            handlers,
        })
    }
}

/// A validated configuration for a whole logger manager.
#[derive(Debug, Clone, PartialEq)]
pub struct ManagerConfig {
    pub settings: Settings,
    /// Loggers in declaration order; names are unique.
    pub loggers: Vec<LoggerConfig>,
}

impl ManagerConfig {
    /// Validate and resolve a raw configuration.
    pub fn from_raw(raw: &RawManagerConfig) -> Result<Self, ConfigError> {
        let settings = Settings::default().inherit(Overrides {
            debug: raw.debug,
            log_level: raw.log_level.as_deref(),
            style: raw.style.as_deref(),
            date_format: raw.date_format.as_deref(),
            log_line_template: raw.log_line_template.as_deref(),
            log_yaml_elements: raw.log_yaml_elements.as_deref(),
        })?;

        if raw.loggers.is_empty() {
            return Err(ConfigError::EmptyList {
                context: "log config".to_string(),
                field: "loggers",
            });
        }

        let mut seen = HashSet::new();
        let mut loggers = Vec::with_capacity(raw.loggers.len());
        for raw_logger in &raw.loggers {
            let logger = LoggerConfig::from_raw(raw_logger, &settings)?;
            if !seen.insert(logger.name.clone()) {
                return Err(ConfigError::DuplicateLogger(logger.name));
            }
            loggers.push(logger);
        }

        Ok(Self { settings, loggers })
    }

    /// Look up a logger by name.
    pub fn logger(&self, name: &str) -> Option<&LoggerConfig> {
        self.loggers.iter().find(|logger| logger.name == name)
    }
}
