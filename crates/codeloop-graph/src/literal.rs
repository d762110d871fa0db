//! Test-case literals.
//!
//! Renders a JSON array of `[inputs, outputs]` pairs as a module-level
//! assignment that generated tests and measurements can import.

use codeloop_utils::{GraphError, Language};
use serde_json::Value;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use tracing::debug;

use crate::graph::ArtifactGraph;

/// Render `cases` as `<variable> = <literal>` in `language`.
///
/// # Errors
///
/// Returns [`GraphError::LanguageNotImplemented`] for languages without a
/// literal syntax.
pub fn render_cases(
    language: &Language,
    variable: &str,
    cases: &Value,
) -> Result<String, GraphError> {
    match language {
        Language::Python => {
            let mut out = format!("{variable} = ");
            python_literal(&mut out, cases, true);
            out.push('\n');
            Ok(out)
        }
        Language::Other(name) => Err(GraphError::LanguageNotImplemented {
            language: name.clone(),
            operation: "Test case rendering".to_string(),
        }),
    }
}

/// Render `cases` into the location of artifact `name`, using the artifact's
/// name as the variable. Returns the written path.
///
/// # Errors
///
/// - [`GraphError::MissingArtifact`] if `name` is unknown
/// - [`GraphError::LanguageNotImplemented`] for unsupported languages
/// - [`GraphError::Io`] if the file cannot be written
pub fn write_cases(
    graph: &ArtifactGraph,
    name: &str,
    cases: &Value,
) -> Result<PathBuf, GraphError> {
    let artifact = graph.get(name)?;
    let rendered = render_cases(artifact.language(), artifact.name(), cases)?;
    let path = graph.path_on_disk(name)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| GraphError::Io {
            path: parent.display().to_string(),
            source,
        })?;
    }
    fs::write(&path, rendered).map_err(|source| GraphError::Io {
        path: path.display().to_string(),
        source,
    })?;

    debug!(artifact = name, path = %path.display(), "Wrote test cases");
    Ok(path)
}

// Top-level pairs become tuples; nested arrays stay lists.
fn python_literal(out: &mut String, value: &Value, top_level: bool) {
    match value {
        Value::Null => out.push_str("None"),
        Value::Bool(true) => out.push_str("True"),
        Value::Bool(false) => out.push_str("False"),
        Value::Number(number) => {
            let _ = write!(out, "{number}");
        }
        Value::String(text) => {
            // JSON string escapes are valid Python string escapes.
            out.push_str(&Value::String(text.clone()).to_string());
        }
        Value::Array(items) if top_level => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                match item {
                    Value::Array(pair) if pair.len() == 2 => {
                        out.push('(');
                        python_literal(out, &pair[0], false);
                        out.push_str(", ");
                        python_literal(out, &pair[1], false);
                        out.push(')');
                    }
                    other => python_literal(out, other, false),
                }
            }
            out.push(']');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                python_literal(out, item, false);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push('{');
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push_str(": ");
                python_literal(out, item, false);
            }
            out.push('}');
        }
    }
}
