//! Cross-artifact reference statements.
//!
//! A generated artifact that depends on another artifact is told how to
//! import from it. The statement carries a placeholder symbol, the model
//! fills in the actual function or variable name.

use codeloop_utils::{GraphError, Language};
use std::path::Path;

use crate::graph::ArtifactGraph;

/// Placeholder symbol used in generated reference statements.
pub const SYMBOL_PLACEHOLDER: &str = "<function-or-variable-name>";

/// Dotted module path of a location: its components joined by `.` with the
/// extension of the last component removed.
///
/// `output/measurements/runtime.py` becomes `output.measurements.runtime`.
#[must_use]
pub fn module_path(location: &Path) -> String {
    let mut parts: Vec<String> = location
        .components()
        .filter_map(|component| match component {
            std::path::Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();

    if let Some(stem) = location.file_stem()
        && let Some(last) = parts.last_mut()
    {
        *last = stem.to_string_lossy().into_owned();
    }

    parts.join(".")
}

/// Reference statement in `language` for importing from `location`.
///
/// # Errors
///
/// Returns [`GraphError::LanguageNotImplemented`] for languages without a
/// reference form.
pub fn use_statement(language: &Language, location: &Path) -> Result<String, GraphError> {
    match language {
        Language::Python => Ok(format!(
            "from {} import {SYMBOL_PLACEHOLDER}",
            module_path(location)
        )),
        Language::Other(name) => Err(GraphError::LanguageNotImplemented {
            language: name.clone(),
            operation: "Reference statement generation".to_string(),
        }),
    }
}

impl ArtifactGraph {
    /// Reference statements for every dependency of `name`, in declaration
    /// order. Empty when the artifact has no dependencies.
    ///
    /// # Errors
    ///
    /// - [`GraphError::MissingArtifact`] if `name` or a dependency is unknown
    /// - [`GraphError::CrossLanguageReference`] if a dependency is declared in
    ///   a different language than `name`
    /// - [`GraphError::LanguageNotImplemented`] if the language has no
    ///   reference form
    pub fn reference_hints(&self, name: &str) -> Result<Vec<String>, GraphError> {
        let artifact = self.get(name)?;

        artifact
            .depends_on()
            .iter()
            .map(|dep_name| {
                let dep = self.get(dep_name)?;
                if dep.language() != artifact.language() {
                    return Err(GraphError::CrossLanguageReference {
                        from: artifact.name().to_string(),
                        from_language: artifact.language().to_string(),
                        to: dep.name().to_string(),
                        to_language: dep.language().to_string(),
                    });
                }
                use_statement(artifact.language(), &self.qualified_location(dep))
            })
            .collect()
    }
}
