//! Loading a [`ManagerConfig`] from YAML text, a YAML file or an inline raw
//! configuration.

use crate::error::ConfigError;
use crate::raw::RawManagerConfig;
use crate::resolve::ManagerConfig;
use std::fs;
use std::path::Path;

impl ManagerConfig {
    /// Load from exactly one source: a YAML file or an inline configuration.
    ///
    /// Supplying neither or both is a configuration error.
    pub fn load(
        file_path: Option<&Path>,
        inline: Option<RawManagerConfig>,
    ) -> Result<Self, ConfigError> {
        match (file_path, inline) {
            (None, None) => Err(ConfigError::MissingSource),
            (Some(_), Some(_)) => Err(ConfigError::AmbiguousSource),
            (Some(path), None) => Self::from_file(path),
            (None, Some(raw)) => Self::from_raw(&raw),
        }
    }

    /// Read, parse and validate a YAML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        log::info!("Loading log config from {:?}", path);
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Parse and validate YAML configuration text.
    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        let raw: RawManagerConfig = serde_yaml_ng::from_str(contents)?;
        let config = Self::from_raw(&raw)?;
        log::debug!(
            "Log config resolved with {} logger(s): {:?}",
            config.loggers.len(),
            config.loggers.iter().map(|l| &l.name).collect::<Vec<_>>()
        );
        Ok(config)
    }
}
