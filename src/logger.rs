//! Named fan-out over an ordered list of stream handlers.

use std::fmt;
use std::panic::Location;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use nrt_logging_config::{LogLevel, LoggerConfig, defaults};
use parking_lot::RwLock;

use crate::error::{LogError, Result};
use crate::event::{LogEvent, ManualDepth};
use crate::frame::CallChain;
use crate::handler::{SharedStreamHandler, StreamHandler};

/// A named logger.
///
/// The logger's own level is a first gate; every attached handler then
/// applies its own. Events pass through handlers in attachment order and
/// the first failing handler aborts the call.
pub struct Logger {
    name: String,
    level: AtomicU8,
    debug: AtomicBool,
    handlers: RwLock<Vec<SharedStreamHandler>>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level())
            .field("debug", &self.is_debug())
            .field("handlers", &self.handlers.read().len())
            .finish()
    }
}

impl Logger {
    /// A logger without handlers, gated at the default level.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: AtomicU8::new(defaults::log_level().as_u8()),
            debug: AtomicBool::new(false),
            handlers: RwLock::new(Vec::new()),
        }
    }

    /// Build a logger and all of its handlers from configuration. `debug`
    /// forces the debug trailer on regardless of the configured flag.
    pub fn from_config(config: &LoggerConfig, debug: bool) -> Result<Self> {
        let logger = Self::new(&config.name);
        logger.level.store(config.settings.log_level.as_u8(), Ordering::Relaxed);
        logger.debug.store(debug || config.settings.debug, Ordering::Relaxed);
        for handler_config in &config.handlers {
            let handler = StreamHandler::from_config(handler_config, &config.name)?;
            logger.add_stream_handler(Arc::new(handler), true);
        }
        Ok(logger)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.level.load(Ordering::Relaxed)).unwrap_or_default()
    }

    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level.as_u8() >= self.level.load(Ordering::Relaxed)
    }

    /// Set the logger's gate and, with `cascade`, every attached handler's.
    pub fn update_log_level(&self, level: LogLevel, cascade: bool) {
        self.level.store(level.as_u8(), Ordering::Relaxed);
        if cascade {
            for handler in self.handlers.read().iter() {
                handler.set_level(level);
            }
        }
    }

    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    /// Switch the debug trailer for this logger and its handlers.
    pub fn set_debug(&self, debug: bool) {
        self.debug.store(debug, Ordering::Relaxed);
        for handler in self.handlers.read().iter() {
            handler.set_debug(debug);
        }
    }

    // ── Handlers ────────────────────────────────────────────────────────

    /// Append `handler`. With `inherit_min_level` the logger's gate drops to
    /// the handler's level if that is lower.
    pub fn add_stream_handler(&self, handler: SharedStreamHandler, inherit_min_level: bool) {
        if inherit_min_level {
            self.level
                .fetch_min(handler.level().as_u8(), Ordering::Relaxed);
        }
        if self.is_debug() {
            handler.set_debug(true);
        }
        self.handlers.write().push(handler);
    }

    pub fn stream_handlers(&self) -> Vec<SharedStreamHandler> {
        self.handlers.read().clone()
    }

    /// Close and detach every handler. All handlers are closed even when one
    /// fails; the first failure is returned.
    pub fn close_stream_handlers(&self) -> Result<()> {
        let handlers = std::mem::take(&mut *self.handlers.write());
        let mut first_error = None;
        for handler in handlers {
            if let Err(e) = handler.close() {
                log::error!("Failed to close stream handler of logger [{}]: {}", self.name, e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // ── Logging ─────────────────────────────────────────────────────────

    #[track_caller]
    pub fn critical(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Critical, message, ManualDepth::NoChange)
    }

    #[track_caller]
    pub fn error(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Error, message, ManualDepth::NoChange)
    }

    #[track_caller]
    pub fn warn(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Warn, message, ManualDepth::NoChange)
    }

    #[track_caller]
    pub fn info(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Info, message, ManualDepth::NoChange)
    }

    #[track_caller]
    pub fn debug(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Debug, message, ManualDepth::NoChange)
    }

    #[track_caller]
    pub fn trace(&self, message: impl Into<String>) -> Result<()> {
        self.log(LogLevel::Trace, message, ManualDepth::NoChange)
    }

    /// Send one event through every handler.
    #[track_caller]
    pub fn log(&self, level: LogLevel, message: impl Into<String>, manual: ManualDepth) -> Result<()> {
        let handlers = self.handlers.read();
        if handlers.is_empty() {
            return Err(LogError::NoStreamHandlers {
                logger: self.name.clone(),
            });
        }
        if !self.is_enabled(level) {
            return Ok(());
        }
        let event = LogEvent::capture(level, message, manual, Location::caller());
        for handler in handlers.iter() {
            handler.handle(&event)?;
        }
        Ok(())
    }

    // ── Manual depth ────────────────────────────────────────────────────

    /// Nest the caller's next event one level deeper on every handler.
    #[track_caller]
    pub fn increase_depth(&self) {
        let identity = CallChain::current(Location::caller());
        for handler in self.handlers.read().iter() {
            handler.queue_increase(identity);
        }
    }

    /// Drop `levels` manual levels before the caller's next event.
    #[track_caller]
    pub fn decrease_depth(&self, levels: usize) {
        if levels == 0 {
            return;
        }
        let identity = CallChain::current(Location::caller());
        for handler in self.handlers.read().iter() {
            handler.queue_decrease(identity, levels);
        }
    }
}
