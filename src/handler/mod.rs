//! Stream handlers: level gate, depth tracker, renderer and sink behind one
//! lock.
//!
//! A handler comes in three flavours sharing the same pipeline:
//!
//! - **console**: writes to standard output (or any injected writer)
//! - **plain file**: opens the file in append mode for every event
//! - **rotating file**: keeps the file open and rolls it by size, optionally
//!   compressing rolled files on a background thread
//!
//! The level gate is an atomic checked before the lock is taken, so
//! filtered events never touch the tracker or the sink. Everything else
//! (tracker transition, rendering, writing, rolling) happens under the
//! handler's mutex. The tracker is advanced on a copy that replaces the live
//! one only after the write succeeded.

mod archiver;
mod file;
mod retention;
mod rotating;

use std::fmt;
use std::io::{self, Write};
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use nrt_logging_config::resolve::validate_date_format;
use nrt_logging_config::{
    ConfigError, HandlerConfig, HandlerType, LogElement, LogLevel, LogStyle, RotationPolicy,
    Settings, defaults,
};
use parking_lot::Mutex;

use crate::error::{LogError, Result};
use crate::event::{LogEvent, ManualDepth};
use crate::frame::{CallChain, FrameIdentity};
use crate::render::RenderSettings;
use crate::tracker::DepthTracker;

use file::PlainFile;
use rotating::RotatingFile;

/// Marker that starts the debug trailer appended to rendered messages.
pub const DEBUG_TRAILER_PREFIX: &str = "NRT-Logging DEBUG:";

/// Shared handle to a handler. One handler may be attached to many loggers.
pub type SharedStreamHandler = Arc<StreamHandler>;

enum Sink {
    Console(Box<dyn Write + Send>),
    File(PlainFile),
    Rotating(RotatingFile),
}

impl Sink {
    fn check_background(&self) -> Result<()> {
        match self {
            Sink::Rotating(rotating) => rotating.check_background(),
            _ => Ok(()),
        }
    }

    fn write(&mut self, text: &str) -> Result<()> {
        match self {
            Sink::Console(out) => out
                .write_all(text.as_bytes())
                .and_then(|()| out.flush())
                .map_err(|e| LogError::io("<stdout>", e)),
            Sink::File(file) => file.write(text),
            Sink::Rotating(rotating) => rotating.write(text),
        }
    }

    fn should_roll(&self) -> bool {
        matches!(self, Sink::Rotating(rotating) if rotating.should_roll())
    }

    fn roll(&mut self) -> Result<()> {
        match self {
            Sink::Rotating(rotating) => rotating.roll(),
            _ => Ok(()),
        }
    }

    fn close(&mut self) -> Result<()> {
        match self {
            Sink::Console(out) => out.flush().map_err(|e| LogError::io("<stdout>", e)),
            Sink::File(_) => Ok(()),
            Sink::Rotating(rotating) => rotating.close(),
        }
    }

    fn path(&self) -> Option<&Path> {
        match self {
            Sink::Console(_) => None,
            Sink::File(file) => Some(file.path()),
            Sink::Rotating(rotating) => Some(rotating.path()),
        }
    }
}

struct HandlerState {
    tracker: DepthTracker,
    render: RenderSettings,
    sink: Sink,
}

pub struct StreamHandler {
    handler_type: HandlerType,
    level: AtomicU8,
    debug: AtomicBool,
    state: Mutex<HandlerState>,
}

impl fmt::Debug for StreamHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamHandler")
            .field("handler_type", &self.handler_type)
            .field("level", &self.level())
            .field("debug", &self.is_debug())
            .field("path", &self.path())
            .finish()
    }
}

impl StreamHandler {
    fn with_sink(handler_type: HandlerType, sink: Sink) -> Self {
        Self {
            handler_type,
            level: AtomicU8::new(defaults::log_level().as_u8()),
            debug: AtomicBool::new(false),
            state: Mutex::new(HandlerState {
                tracker: DepthTracker::new(),
                render: RenderSettings::default(),
                sink,
            }),
        }
    }

    // ── Construction ────────────────────────────────────────────────────

    /// Handler writing to standard output.
    pub fn console() -> Self {
        Self::console_with_writer(io::stdout())
    }

    /// Console-style handler writing to `writer`.
    pub fn console_with_writer(writer: impl Write + Send + 'static) -> Self {
        Self::with_sink(HandlerType::Console, Sink::Console(Box::new(writer)))
    }

    /// Handler appending to `path`, reopening the file for every event.
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::with_sink(HandlerType::File, Sink::File(PlainFile::new(path)))
    }

    /// Handler appending to `path` and rolling it per `policy`. Compressed
    /// archive entries are prefixed with the file's stem until
    /// [`set_archive_label`](Self::set_archive_label) says otherwise.
    pub fn rotating_file(path: impl Into<PathBuf>, policy: RotationPolicy) -> Self {
        let path = path.into();
        let label = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "log".to_string());
        Self::with_sink(
            HandlerType::File,
            Sink::Rotating(RotatingFile::new(path, policy, label)),
        )
    }

    /// Build a handler from a resolved configuration entry. `label` names
    /// the owning logger in compressed archives.
    pub fn from_config(config: &HandlerConfig, label: &str) -> Result<Self> {
        let handler = match config.handler_type {
            HandlerType::Console => Self::console(),
            HandlerType::File => {
                let path = config.file_path.clone().ok_or_else(|| ConfigError::MissingField {
                    context: "stream handler".to_string(),
                    field: "file_path",
                })?;
                match config.rotation {
                    Some(policy) => Self::with_sink(
                        HandlerType::File,
                        Sink::Rotating(RotatingFile::new(path, policy, label)),
                    ),
                    None => Self::file(path),
                }
            }
        };
        handler.apply_settings(&config.settings);
        Ok(handler)
    }

    /// Adopt level, debug flag and render settings from `settings`.
    pub fn apply_settings(&self, settings: &Settings) {
        self.set_level(settings.log_level);
        self.set_debug(settings.debug);
        self.state.lock().render = RenderSettings::from(settings);
    }

    // ── Settings ────────────────────────────────────────────────────────

    pub fn handler_type(&self) -> HandlerType {
        self.handler_type
    }

    /// Target file, `None` for console handlers.
    pub fn path(&self) -> Option<PathBuf> {
        self.state.lock().sink.path().map(Path::to_path_buf)
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.level.load(Ordering::Relaxed)).unwrap_or_default()
    }

    pub fn set_level(&self, level: LogLevel) {
        self.level.store(level.as_u8(), Ordering::Relaxed);
    }

    /// Whether an event at `level` passes this handler's gate.
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level.as_u8() >= self.level.load(Ordering::Relaxed)
    }

    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    /// Append tracker diagnostics to every rendered message.
    pub fn set_debug(&self, debug: bool) {
        self.debug.store(debug, Ordering::Relaxed);
    }

    pub fn render_settings(&self) -> RenderSettings {
        self.state.lock().render.clone()
    }

    pub fn set_style(&self, style: LogStyle) {
        self.state.lock().render.style = style;
    }

    pub fn set_date_format(&self, format: &str) -> Result<()> {
        validate_date_format(format)?;
        self.state.lock().render.date_format = format.to_string();
        Ok(())
    }

    pub fn set_line_template(&self, template: &str) {
        self.state.lock().render.line_template = template.to_string();
    }

    pub fn set_yaml_elements(&self, elements: Vec<LogElement>) -> Result<()> {
        if elements.is_empty() {
            return Err(ConfigError::EmptyList {
                context: "stream handler".to_string(),
                field: "log_yaml_elements",
            }
            .into());
        }
        self.state.lock().render.yaml_elements = elements;
        Ok(())
    }

    /// Name used as the entry prefix of compressed archives. No effect on
    /// console and plain file handlers.
    pub fn set_archive_label(&self, label: &str) {
        if let Sink::Rotating(rotating) = &mut self.state.lock().sink {
            rotating.set_label(label);
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

    /// Log `message` from the caller's frame.
    #[track_caller]
    pub fn log(&self, level: LogLevel, message: impl Into<String>, manual: ManualDepth) -> Result<()> {
        if !self.is_enabled(level) {
            return Ok(());
        }
        let event = LogEvent::capture(level, message, manual, Location::caller());
        self.emit(&event)
    }

    /// Gate, place, render and write one event.
    pub fn handle(&self, event: &LogEvent) -> Result<()> {
        if !self.is_enabled(event.level) {
            return Ok(());
        }
        self.emit(event)
    }

    fn emit(&self, event: &LogEvent) -> Result<()> {
        let debug = self.is_debug();
        let mut state = self.state.lock();
        let state = &mut *state;
        state.sink.check_background()?;

        let (transition, undo) = state.tracker.advance_undoable(&event.chain, event.manual)?;
        let rendered = if debug {
            let message = format!(
                "{}\n{} {}",
                event.message,
                DEBUG_TRAILER_PREFIX,
                state.tracker.describe(&transition)
            );
            state.render.render(event, &message, &transition)
        } else {
            state.render.render(event, &event.message, &transition)
        };
        if let Err(e) = rendered.and_then(|text| state.sink.write(&text)) {
            state.tracker.undo(undo);
            return Err(e);
        }

        if state.sink.should_roll() {
            state.sink.roll()?;
            state.tracker.restart();
        }
        Ok(())
    }

    // ── Manual depth ────────────────────────────────────────────────────

    /// Nest the caller's next event one level deeper.
    #[track_caller]
    pub fn increase_depth(&self) {
        self.queue_increase(CallChain::current(Location::caller()));
    }

    /// Drop `levels` manual levels before the caller's next event.
    #[track_caller]
    pub fn decrease_depth(&self, levels: usize) {
        self.queue_decrease(CallChain::current(Location::caller()), levels);
    }

    pub(crate) fn queue_increase(&self, identity: FrameIdentity) {
        self.state.lock().tracker.queue_increase(identity);
    }

    pub(crate) fn queue_decrease(&self, identity: FrameIdentity, levels: usize) {
        if levels > 0 {
            self.state.lock().tracker.queue_decrease(identity, levels);
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Release file resources after draining background compression. A
    /// closed handler reopens its file on the next event.
    pub fn close(&self) -> Result<()> {
        self.state.lock().sink.close()
    }
}
