use codeloop_utils::{GraphError, Language};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};

/// A named unit of generated content.
///
/// The artifact's name is the file stem of its location; it is the symbol
/// other artifacts use to reference it. Locations are relative to the graph
/// root and carry no file suffix (the graph applies the language suffix).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    name: String,
    location: PathBuf,
    language: Language,
    depends_on: Vec<String>,
}

impl Artifact {
    /// Create an artifact at `location`.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::InvalidLocation`] if the location is absolute,
    /// escapes its root with `..`, or has no file stem.
    pub fn new(location: impl AsRef<Path>, language: Language) -> Result<Self, GraphError> {
        let location = normalize_location(location.as_ref())?;
        let name = location
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| GraphError::InvalidLocation {
                location: location.display().to_string(),
            })?
            .to_string();

        Ok(Self {
            name,
            location,
            language,
            depends_on: Vec::new(),
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Location relative to the graph root, without suffix.
    #[must_use]
    pub fn location(&self) -> &Path {
        &self.location
    }

    #[must_use]
    pub fn language(&self) -> &Language {
        &self.language
    }

    /// Names of the artifacts this one may reference, in insertion order.
    #[must_use]
    pub fn depends_on(&self) -> &[String] {
        &self.depends_on
    }

    pub(crate) fn push_dependency(&mut self, name: &str) -> bool {
        if self.depends_on.iter().any(|existing| existing == name) {
            return false;
        }
        self.depends_on.push(name.to_string());
        true
    }

    pub(crate) fn truncate_dependencies(&mut self, len: usize) {
        self.depends_on.truncate(len);
    }
}

/// Keep only normal components; reject anything that is not a plain relative path.
fn normalize_location(location: &Path) -> Result<PathBuf, GraphError> {
    let mut normalized = PathBuf::new();
    for component in location.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(GraphError::InvalidLocation {
                    location: location.display().to_string(),
                });
            }
        }
    }
    Ok(normalized)
}
