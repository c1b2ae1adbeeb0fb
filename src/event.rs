//! A single log event as it travels from a [`Logger`](crate::Logger) to its
//! handlers.

use std::panic::Location;

use chrono::{DateTime, Local};
use nrt_logging_config::LogLevel;

use crate::frame::CallChain;

/// Explicit depth adjustment requested for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManualDepth {
    #[default]
    NoChange,
    /// Nest this event one level below the previous event of the same frame.
    Increase,
    /// Pop this many manual levels of the same frame before rendering.
    Decrease(usize),
}

impl ManualDepth {
    pub fn is_no_change(&self) -> bool {
        matches!(self, Self::NoChange)
    }
}

#[derive(Debug, Clone)]
pub struct LogEvent {
    pub level: LogLevel,
    pub message: String,
    pub chain: CallChain,
    pub line: u32,
    pub timestamp: DateTime<Local>,
    pub manual: ManualDepth,
}

impl LogEvent {
    /// Build an event for `location`, capturing the current thread's chain.
    pub fn capture(
        level: LogLevel,
        message: impl Into<String>,
        manual: ManualDepth,
        location: &'static Location<'static>,
    ) -> Self {
        Self::with_chain(level, message, manual, CallChain::capture(location), location.line())
    }

    pub fn with_chain(
        level: LogLevel,
        message: impl Into<String>,
        manual: ManualDepth,
        chain: CallChain,
        line: u32,
    ) -> Self {
        Self {
            level,
            message: message.into(),
            chain,
            line,
            timestamp: Local::now(),
            manual,
        }
    }
}
