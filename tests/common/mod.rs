//! Shared integration test helpers for nrt-logging.
//!
//! Include with `mod common;` at the top of a test file. Helpers cover
//! in-memory handlers, reading LINE/YAML output back with serde_yaml_ng, and
//! inspecting rotated files and zip archives.

#![allow(dead_code)]

use nrt_logging::{LogLevel, StreamHandler};
use parking_lot::Mutex;
use serde::Deserialize as _;
use serde_yaml_ng::Value;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zip::ZipArchive;

/// In-memory writer shared between a handler and the test.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Console-style handler at `level` writing `$message$` lines into a buffer.
pub fn buffered_handler(level: LogLevel) -> (Arc<StreamHandler>, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let handler = StreamHandler::console_with_writer(buffer.clone());
    handler.set_level(level);
    handler.set_line_template("$message$");
    (Arc::new(handler), buffer)
}

/// Parse LINE output into its top-level sequence.
pub fn parse_line_output(text: &str) -> Vec<Value> {
    let value: Value = serde_yaml_ng::from_str(text).expect("LINE output must be valid YAML");
    match value {
        Value::Sequence(entries) => entries,
        Value::Null => Vec::new(),
        other => panic!("LINE output must be a sequence, got {other:?}"),
    }
}

/// Parse YAML-style output into its documents.
pub fn parse_documents(text: &str) -> Vec<Value> {
    serde_yaml_ng::Deserializer::from_str(text)
        .map(|doc| Value::deserialize(doc).expect("YAML output must be valid YAML"))
        .collect()
}

/// Compact shape of a tree: `a(b c) d` means `b` and `c` are children of
/// `a`, and `d` is its sibling. `key` names the field holding each label.
pub fn tree(entries: &[Value], key: &str) -> String {
    entries
        .iter()
        .map(|entry| {
            let label = entry
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_else(|| panic!("entry without string {key}: {entry:?}"));
            match entry.get("children").and_then(Value::as_sequence) {
                Some(children) => format!("{label}({})", tree(children, key)),
                None => label.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Tree shape of LINE output rendered with the `$message$` template.
pub fn line_tree(text: &str) -> String {
    tree(&parse_line_output(text), "log")
}

/// Number of entries in a tree, nested ones included.
pub fn count_entries(entries: &[Value]) -> usize {
    entries
        .iter()
        .map(|entry| {
            1 + entry
                .get("children")
                .and_then(Value::as_sequence)
                .map_or(0, |children| count_entries(children))
        })
        .sum()
}

/// Files in `dir` whose names start with `prefix`, sorted by name.
pub fn files_with_prefix(dir: &Path, prefix: &str) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .expect("Failed to read dir")
        .map(|entry| entry.expect("Failed to read dir entry").path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix))
        })
        .collect();
    files.sort();
    files
}

/// Name and contents of every entry of the zip at `path`.
pub fn zip_entries(path: &Path) -> Vec<(String, String)> {
    let mut archive = ZipArchive::new(File::open(path).expect("Failed to open zip"))
        .expect("Failed to read zip");
    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).expect("Failed to read zip entry");
            let mut contents = String::new();
            entry
                .read_to_string(&mut contents)
                .expect("Failed to read zip entry contents");
            (entry.name().to_string(), contents)
        })
        .collect()
}
