//! Registry of named loggers built from a [`ManagerConfig`].
//!
//! Loggers are created on first [`get_logger`](LoggerManager::get_logger)
//! and live until closed. Replacing the configuration leaves existing
//! loggers untouched; a closed logger is rebuilt from the configuration
//! active at its next fetch.
//!
//! Tests and applications normally own a `LoggerManager`. A process-wide
//! instance is available through [`LoggerManager::global`] for code that
//! cannot pass one around.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use nrt_logging_config::{ConfigError, ManagerConfig, RawManagerConfig};
use parking_lot::{Mutex, RwLock};

use crate::error::Result;
use crate::logger::Logger;

static GLOBAL: OnceLock<LoggerManager> = OnceLock::new();

#[derive(Default)]
pub struct LoggerManager {
    loggers: Mutex<HashMap<String, Arc<Logger>>>,
    config: RwLock<Option<Arc<ManagerConfig>>>,
    debug: AtomicBool,
}

impl fmt::Debug for LoggerManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoggerManager")
            .field("loggers", &self.logger_names())
            .field("configured", &self.config.read().is_some())
            .field("debug", &self.is_debug())
            .finish()
    }
}

impl LoggerManager {
    /// An empty registry with no configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ManagerConfig) -> Self {
        let manager = Self::new();
        manager.set_config(config);
        manager
    }

    /// Lazily created process-wide registry.
    pub fn global() -> &'static LoggerManager {
        GLOBAL.get_or_init(LoggerManager::new)
    }

    // ── Configuration ───────────────────────────────────────────────────

    /// Replace the configuration used for loggers built from now on.
    pub fn set_config(&self, config: ManagerConfig) {
        log::info!(
            "Log configuration set with {} logger(s)",
            config.loggers.len()
        );
        *self.config.write() = Some(Arc::new(config));
    }

    /// Load and validate a configuration from exactly one of a YAML file or
    /// an inline raw configuration, then install it.
    pub fn set_config_from(&self, file_path: Option<&Path>, inline: Option<RawManagerConfig>) -> Result<()> {
        let config = ManagerConfig::load(file_path, inline)?;
        self.set_config(config);
        Ok(())
    }

    pub fn config(&self) -> Option<Arc<ManagerConfig>> {
        self.config.read().clone()
    }

    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    /// Debug flag handed to loggers built from now on.
    pub fn set_debug(&self, debug: bool) {
        self.debug.store(debug, Ordering::Relaxed);
    }

    // ── Registry ────────────────────────────────────────────────────────

    /// Fetch `name`, building it from the active configuration on first
    /// use. A name the configuration does not mention yields a logger
    /// without handlers.
    pub fn get_logger(&self, name: &str) -> Result<Arc<Logger>> {
        if name.is_empty() {
            return Err(ConfigError::MissingField {
                context: "get_logger".to_string(),
                field: "name",
            }
            .into());
        }
        let mut loggers = self.loggers.lock();
        if let Some(logger) = loggers.get(name) {
            return Ok(Arc::clone(logger));
        }
        let debug = self.is_debug();
        let logger = match self.config().as_deref().and_then(|c| c.logger(name)) {
            Some(config) => Logger::from_config(config, debug)?,
            None => {
                log::debug!("Logger [{}] is not configured; created without handlers", name);
                let logger = Logger::new(name);
                logger.set_debug(debug);
                logger
            }
        };
        let logger = Arc::new(logger);
        loggers.insert(name.to_string(), Arc::clone(&logger));
        Ok(logger)
    }

    pub fn has_logger(&self, name: &str) -> bool {
        self.loggers.lock().contains_key(name)
    }

    /// Registered logger names, sorted.
    pub fn logger_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.loggers.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Close `name`'s handlers and forget it. Unknown names are ignored.
    pub fn close_logger(&self, name: &str) -> Result<()> {
        let removed = self.loggers.lock().remove(name);
        match removed {
            Some(logger) => logger.close_stream_handlers(),
            None => Ok(()),
        }
    }

    /// Close every registered logger; the first failure is returned after
    /// all loggers were closed.
    pub fn close_all_loggers(&self) -> Result<()> {
        let loggers: Vec<Arc<Logger>> = self.loggers.lock().drain().map(|(_, l)| l).collect();
        let mut first_error = None;
        for logger in loggers {
            if let Err(e) = logger.close_stream_handlers() {
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
