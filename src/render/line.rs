//! LINE style: one `- log: <line>` entry per event.
//!
//! ```text
//! - log: first
//!   children:
//!     - log: nested
//! - log: second
//! ```

use super::scalar::write_value;
use crate::error::{LogError, Result};
use crate::tracker::{Relation, Transition};

pub(super) fn render(text: &str, transition: &Transition) -> Result<String> {
    let depth = transition.depth;
    if transition.relation == Relation::Child && depth == 0 {
        return Err(LogError::Internal("child entry at depth 0".into()));
    }
    let indent = 4 * depth;
    let mut out = String::with_capacity(indent + text.len() + 16);
    if transition.relation == Relation::Child {
        push_spaces(&mut out, indent - 2);
        out.push_str("children:\n");
    }
    push_spaces(&mut out, indent);
    out.push_str("- log:");
    write_value(&mut out, text, indent + 4)?;
    Ok(out)
}

fn push_spaces(out: &mut String, count: usize) {
    out.extend(std::iter::repeat_n(' ', count));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(relation: Relation, depth: usize) -> Transition {
        Transition { relation, depth }
    }

    #[test]
    fn test_nested_entries() {
        let out = [
            render("A1", &at(Relation::Root, 0)).unwrap(),
            render("B1", &at(Relation::Child, 1)).unwrap(),
            render("C1", &at(Relation::Child, 2)).unwrap(),
            render("B2", &at(Relation::Sibling, 1)).unwrap(),
            render("A2", &at(Relation::Sibling, 0)).unwrap(),
        ]
        .concat();
        assert_eq!(
            out,
            "- log: A1\n  children:\n    - log: B1\n      children:\n        - log: C1\n    - log: B2\n- log: A2\n"
        );
    }

    #[test]
    fn test_multi_line_entry() {
        let out = render("one\ntwo\n", &at(Relation::Child, 1)).unwrap();
        assert_eq!(out, "  children:\n    - log: |\n        one\n        two\n");
    }
}
