//! YAML style: one mapping of the configured elements per event, one
//! document per root event.
//!
//! ```text
//! ---
//! log_level: INFO
//! message: first
//! children:
//!   - log_level: DEBUG
//!     message: nested
//! ```

use nrt_logging_config::LogElement;

use super::Fields;
use super::scalar::write_value;
use crate::error::{LogError, Result};
use crate::tracker::{Relation, Transition};

pub(super) fn render(elements: &[LogElement], fields: &Fields<'_>, transition: &Transition) -> Result<String> {
    if elements.is_empty() {
        return Err(LogError::Internal("YAML style rendered with no elements".into()));
    }
    let depth = transition.depth;
    if transition.relation == Relation::Child && depth == 0 {
        return Err(LogError::Internal("child entry at depth 0".into()));
    }
    let indent = 4 * depth;
    let mut out = String::new();
    if depth == 0 {
        out.push_str("---\n");
    } else if transition.relation == Relation::Child {
        push_spaces(&mut out, indent - 4);
        out.push_str("children:\n");
    }
    for (i, element) in elements.iter().enumerate() {
        if i == 0 && depth > 0 {
            push_spaces(&mut out, indent - 2);
            out.push_str("- ");
        } else {
            push_spaces(&mut out, indent);
        }
        out.push_str(element.name());
        out.push(':');
        let value = fields.value(*element)?;
        if *element == LogElement::LineNumber {
            out.push(' ');
            out.push_str(&value);
            out.push('\n');
        } else {
            write_value(&mut out, &value, indent + 2)?;
        }
    }
    Ok(out)
}

fn push_spaces(out: &mut String, count: usize) {
    out.extend(std::iter::repeat_n(' ', count));
}
