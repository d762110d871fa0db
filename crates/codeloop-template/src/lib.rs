//! Template conformance validation
//!
//! A template is a scaffold in which some lines carry a sentinel token
//! (for Python scaffolds, `# TODO:`). A candidate conforms to the template
//! when every line it adds or removes lies inside the indentation scope of
//! such a sentinel line. Everything else must be reproduced verbatim.
//!
//! ```
//! use codeloop_template::{validate, DEFAULT_SENTINEL};
//!
//! let template = "def f():\n    # TODO: body\n    ...\n";
//! let candidate = "def f():\n    # TODO: body\n    return 1\n";
//! assert!(validate(Some(template), candidate, DEFAULT_SENTINEL).valid);
//! ```

mod diff;

pub use diff::{DiffLine, LineTag, diff_lines};

use serde::Serialize;
use tracing::debug;

/// Sentinel used by the bundled Python scaffolds.
pub const DEFAULT_SENTINEL: &str = "# TODO:";

/// Result of checking a candidate against a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conformance {
    pub valid: bool,
    /// Set only when `valid` is false.
    pub feedback: Option<String>,
}

impl Conformance {
    #[must_use]
    pub const fn conforming() -> Self {
        Self {
            valid: true,
            feedback: None,
        }
    }

    #[must_use]
    pub fn violated(sentinel: &str) -> Self {
        Self {
            valid: false,
            feedback: Some(violation_message(sentinel)),
        }
    }
}

/// The fixed feedback returned for any non-conforming candidate.
#[must_use]
pub fn violation_message(sentinel: &str) -> String {
    format!(
        "You must strictly follow the provided template and only modify the code where it is marked with {sentinel}!"
    )
}

/// Check that `candidate` only changes `template` inside sentinel-anchored
/// regions.
///
/// A changed line is in scope only when a sentinel line sits at exactly the
/// same indentation and can be reached without passing a shallower line.
/// Lines indented deeper than the sentinel are rejected, so a region whose
/// sentinel is at depth 4 accepts `x = 1` at depth 4 but not the body of a
/// `for` loop at depth 8. Fill such regions with statements at the
/// sentinel's own depth, or place another sentinel inside the nested block.
///
/// Without a template there is nothing to enforce and the candidate is
/// accepted as-is.
#[must_use]
pub fn validate(template: Option<&str>, candidate: &str, sentinel: &str) -> Conformance {
    let Some(template) = template else {
        return Conformance::conforming();
    };

    let lines = diff_lines(template, candidate, sentinel);
    let violations: Vec<usize> = (0..lines.len())
        .filter(|&i| !line_in_scope(&lines, i))
        .collect();

    if violations.is_empty() {
        Conformance::conforming()
    } else {
        for &index in &violations {
            debug!(
                index,
                tag = ?lines[index].tag,
                indent = lines[index].indent,
                "Line changed outside of a sentinel region"
            );
        }
        Conformance::violated(sentinel)
    }
}

/// Split `source` at the first line starting with `guard`.
///
/// Returns the part before the guard with trailing whitespace removed, and
/// the guard line plus everything after it. Without a guard line the whole
/// source is returned and there is no tail.
#[must_use]
pub fn split_at_guard<'a>(source: &'a str, guard: &str) -> (&'a str, Option<&'a str>) {
    let mut offset = 0;
    for line in source.split_inclusive('\n') {
        if line.starts_with(guard) {
            return (source[..offset].trim_end(), Some(&source[offset..]));
        }
        offset += line.len();
    }
    (source, None)
}

fn line_in_scope(lines: &[DiffLine], index: usize) -> bool {
    let line = &lines[index];
    if line.tag == LineTag::Equal || line.anchor {
        return true;
    }

    let depth = line.indent;
    let reachable = |candidate: &DiffLine| -> Option<bool> {
        if candidate.indent == depth && candidate.anchor {
            Some(true)
        } else if candidate.indent < depth {
            Some(false)
        } else {
            None
        }
    };

    let forward = lines[index + 1..].iter().find_map(reachable);
    let backward = lines[..index].iter().rev().find_map(reachable);

    forward == Some(true) || backward == Some(true)
}
