//! Default values for configuration fields.
//!
//! Used both by [`Settings::default`](crate::Settings) and by the resolution
//! of rotation knobs that a file handler leaves unset.

use crate::types::{LogElement, LogLevel, LogStyle};

// ── Rendering ──────────────────────────────────────────────────────────────

pub fn log_level() -> LogLevel {
    LogLevel::Info
}

pub fn style() -> LogStyle {
    LogStyle::Line
}

pub fn date_format() -> String {
    "%Y-%m-%d %H:%M:%S%.6f".to_string()
}

pub fn log_line_template() -> String {
    "$date$ [$log_level$] [$path$.$method$:$line_number$] $message$".to_string()
}

pub fn log_yaml_elements() -> Vec<LogElement> {
    LogElement::DEFAULT_ORDER.to_vec()
}

// ── Rotation ───────────────────────────────────────────────────────────────

pub fn max_bytes() -> u64 {
    10 * 1024 * 1024
}

pub fn max_archive_files() -> usize {
    5
}

pub fn bool_false() -> bool {
    false
}
