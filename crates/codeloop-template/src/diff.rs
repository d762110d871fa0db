use similar::{ChangeTag, TextDiff};

/// How a line appears in the template/candidate diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineTag {
    Equal,
    /// Present in the template only.
    Removed,
    /// Present in the candidate only.
    Added,
}

impl From<ChangeTag> for LineTag {
    fn from(tag: ChangeTag) -> Self {
        match tag {
            ChangeTag::Equal => Self::Equal,
            ChangeTag::Delete => Self::Removed,
            ChangeTag::Insert => Self::Added,
        }
    }
}

/// One line of the diff with its effective indentation and anchor flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub tag: LineTag,
    pub text: String,
    pub indent: usize,
    pub anchor: bool,
}

// Literal `\n` and `\t` escape sequences are doubled in both texts so they
// are compared as text.
fn normalize_escapes(text: &str) -> String {
    text.replace(r"\n", r"\\n").replace(r"\t", r"\\t")
}

/// Line diff of `template` against `candidate`, in diff order.
///
/// Trailing whitespace is ignored when comparing lines. A blank line takes
/// the indentation of the line before it (0 at the start).
#[must_use]
pub fn diff_lines(template: &str, candidate: &str, sentinel: &str) -> Vec<DiffLine> {
    let template = normalize_escapes(template);
    let candidate = normalize_escapes(candidate);
    let old: Vec<&str> = template.lines().map(str::trim_end).collect();
    let new: Vec<&str> = candidate.lines().map(str::trim_end).collect();

    let diff = TextDiff::from_slices(&old, &new);

    let mut previous_indent = 0;
    diff.iter_all_changes()
        .map(|change| {
            let text: &str = change.value();
            let trimmed = text.trim_start();
            let indent = if trimmed.is_empty() {
                previous_indent
            } else {
                text.chars().take_while(|c| c.is_whitespace()).count()
            };
            previous_indent = indent;

            DiffLine {
                tag: change.tag().into(),
                text: text.to_string(),
                indent,
                anchor: trimmed.starts_with(sentinel),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_lines_inherit_indentation() {
        let lines = diff_lines("def f():\n    x = 1\n\ny = 2", "def f():\n    x = 1\n\ny = 2", "#");
        let indents: Vec<usize> = lines.iter().map(|l| l.indent).collect();
        assert_eq!(indents, vec![0, 4, 4, 0]);
        assert!(lines.iter().all(|l| l.tag == LineTag::Equal));
    }

    #[test]
    fn test_leading_blank_line_is_zero() {
        let lines = diff_lines("\n  a", "\n  a", "#");
        assert_eq!(lines[0].indent, 0);
        assert_eq!(lines[1].indent, 2);
    }

    #[test]
    fn test_replacement_yields_removed_then_added() {
        let lines = diff_lines("a\nb\nc", "a\nx\nc", "#");
        let tags: Vec<LineTag> = lines.iter().map(|l| l.tag).collect();
        assert_eq!(
            tags,
            vec![LineTag::Equal, LineTag::Removed, LineTag::Added, LineTag::Equal]
        );
    }

    #[test]
    fn test_anchor_detection_ignores_leading_whitespace() {
        let lines = diff_lines("    # TODO: here\n#TODO", "    # TODO: here\n#TODO", "# TODO:");
        assert!(lines[0].anchor);
        assert!(!lines[1].anchor);
    }

    #[test]
    fn test_escape_sequences_are_normalized() {
        assert_eq!(normalize_escapes(r#"print("a\nb\tc")"#), r#"print("a\\nb\\tc")"#);
        let lines = diff_lines(r#"s = "\n""#, r#"s = "\n""#, "#");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].tag, LineTag::Equal);
    }
}
