//! YAML scalars for rendered values.
//!
//! Single-line values go through `serde_yaml_ng`, which decides between
//! plain and quoted styles. Multi-line values with printable content become
//! literal blocks indented under their key. Values the serializer would
//! split across lines are double-quoted with escapes.

use std::fmt::Write as _;

use crate::error::{LogError, Result};

/// Line breaks besides `\n`. The serializer copies these raw into quoted
/// scalars, which a reader then folds or misplaces.
const RAW_BREAKS: &[char] = &['\r', '\u{85}', '\u{2028}', '\u{2029}'];

/// Append `value` after a mapping key's colon, including the trailing
/// newline. Block lines are indented by `content_indent` spaces, two more
/// than the key itself.
pub(crate) fn write_value(out: &mut String, value: &str, content_indent: usize) -> Result<()> {
    if is_block(value) {
        write_block(out, value, content_indent);
    } else {
        out.push(' ');
        out.push_str(&scalar(value)?);
        out.push('\n');
    }
    Ok(())
}

fn is_block(value: &str) -> bool {
    value.contains('\n')
        && !value.starts_with('\n')
        && value.chars().any(|c| !c.is_whitespace())
        && !value
            .chars()
            .any(|c| (c.is_control() && c != '\n' && c != '\t') || RAW_BREAKS.contains(&c))
}

fn write_block(out: &mut String, value: &str, content_indent: usize) {
    let (body, chomp) = match value.strip_suffix('\n') {
        Some(body) if body.ends_with('\n') => (body, "+"),
        Some(body) => (body, ""),
        None => (value, "-"),
    };
    out.push_str(" |");
    if value.starts_with([' ', '\t']) {
        out.push('2');
    }
    out.push_str(chomp);
    out.push('\n');
    for line in body.split('\n') {
        if !line.is_empty() {
            out.extend(std::iter::repeat_n(' ', content_indent));
            out.push_str(line);
        }
        out.push('\n');
    }
}

/// Render `value` as a single-line YAML scalar that reads back as `value`.
pub(crate) fn scalar(value: &str) -> Result<String> {
    if value.contains('\n') || value.contains(RAW_BREAKS) {
        return Ok(escaped(value));
    }
    let text = serde_yaml_ng::to_string(value)
        .map_err(|e| LogError::Internal(format!("cannot serialize {value:?}: {e}")))?;
    let text = text.trim_end_matches('\n');
    if text.contains('\n') {
        return Ok(escaped(value));
    }
    Ok(text.to_string())
}

fn escaped(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() || RAW_BREAKS.contains(&c) || c == '\u{feff}' => {
                let _ = write!(out, "\\u{:04X}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
