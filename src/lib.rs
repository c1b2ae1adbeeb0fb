// Library root for nrt-logging.
//
// # Locking
//
//   - Each `StreamHandler` serializes tracker, rendering and I/O under one
//     `parking_lot::Mutex`. Level gates are atomics read before locking.
//   - A `Logger` holds its handler list in a `parking_lot::RwLock`; log calls
//     take the read side, so loggers sharing a handler only contend on that
//     handler's mutex.
//   - `LoggerManager` guards its registry with a `parking_lot::Mutex` that is
//     never held while logging.
//
// Call chains are thread-local and need no locking.

//! Hierarchical, call-chain-aware logging.
//!
//! Log events raised inside nested calls are rendered as a tree: a callee's
//! events appear as `children` of the caller's most recent event. Functions
//! take part by entering a frame:
//!
//! ```no_run
//! use nrt_logging::{StreamHandler, Logger, enter_frame};
//! use std::sync::Arc;
//!
//! fn load(logger: &Logger) -> nrt_logging::Result<()> {
//!     enter_frame!();
//!     logger.info("loading")
//! }
//!
//! fn main() -> nrt_logging::Result<()> {
//!     let logger = Logger::new("app");
//!     logger.add_stream_handler(Arc::new(StreamHandler::console()), true);
//!     enter_frame!();
//!     logger.info("start")?;
//!     load(&logger)?;
//!     logger.info("done")
//! }
//! ```

pub mod error;
pub mod event;
pub mod frame;
pub mod handler;
pub mod logger;
pub mod manager;
pub mod render;
pub mod tracker;

pub use error::{LogError, Result};
pub use event::{LogEvent, ManualDepth};
pub use frame::{CallChain, FrameGuard, FrameIdentity};
pub use handler::{DEBUG_TRAILER_PREFIX, SharedStreamHandler, StreamHandler};
pub use logger::Logger;
pub use manager::LoggerManager;
pub use render::RenderSettings;
pub use tracker::{DepthTracker, Relation, Transition, Undo};

pub use nrt_logging_config as config;
pub use nrt_logging_config::{
    HandlerConfig, HandlerType, LogElement, LogLevel, LogStyle, LoggerConfig, ManagerConfig,
    RotationPolicy,
};
