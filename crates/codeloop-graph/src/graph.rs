use codeloop_utils::{GraphError, Language};
use indexmap::IndexMap;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::artifact::Artifact;

/// The full set of artifacts for one run.
///
/// Artifacts are keyed by name and iterate in registration order. Edges are
/// attached with [`add_dependency`](Self::add_dependency) before generation
/// starts; every mutation re-checks that the edges still form a DAG.
#[derive(Debug, Clone)]
pub struct ArtifactGraph {
    root: PathBuf,
    language: Language,
    suffix: &'static str,
    artifacts: IndexMap<String, Artifact>,
}

impl ArtifactGraph {
    /// Create an empty graph rooted at `root`.
    ///
    /// `language` fixes the project's file-suffix convention.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::LanguageNotImplemented`] if the language has no
    /// known file suffix.
    pub fn new(root: impl Into<PathBuf>, language: Language) -> Result<Self, GraphError> {
        let suffix = language
            .suffix()
            .ok_or_else(|| GraphError::LanguageNotImplemented {
                language: language.to_string(),
                operation: "File suffix resolution".to_string(),
            })?;

        Ok(Self {
            root: root.into(),
            language,
            suffix,
            artifacts: IndexMap::new(),
        })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn language(&self) -> &Language {
        &self.language
    }

    #[must_use]
    pub fn suffix(&self) -> &'static str {
        self.suffix
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    /// Register an artifact in the project language.
    ///
    /// # Errors
    ///
    /// See [`add_artifact_with_language`](Self::add_artifact_with_language).
    pub fn add_artifact(&mut self, location: impl AsRef<Path>) -> Result<&Artifact, GraphError> {
        let language = self.language.clone();
        self.add_artifact_with_language(location, language)
    }

    /// Register an artifact with an explicit language.
    ///
    /// # Errors
    ///
    /// - [`GraphError::InvalidLocation`] for locations without a stem or outside the root
    /// - [`GraphError::DuplicateArtifact`] if the name is taken
    /// - [`GraphError::DuplicateLocation`] if another artifact owns the location
    pub fn add_artifact_with_language(
        &mut self,
        location: impl AsRef<Path>,
        language: Language,
    ) -> Result<&Artifact, GraphError> {
        let artifact = Artifact::new(location, language)?;

        if self.artifacts.contains_key(artifact.name()) {
            return Err(GraphError::DuplicateArtifact {
                name: artifact.name().to_string(),
            });
        }
        if self
            .artifacts
            .values()
            .any(|existing| existing.location() == artifact.location())
        {
            return Err(GraphError::DuplicateLocation {
                location: artifact.location().display().to_string(),
            });
        }

        debug!(
            artifact = artifact.name(),
            location = %artifact.location().display(),
            language = %artifact.language(),
            "Registered artifact"
        );

        let name = artifact.name().to_string();
        let entry = self.artifacts.entry(name).or_insert(artifact);
        Ok(&*entry)
    }

    /// Extend `name`'s dependencies with `deps`, keeping insertion order and
    /// skipping edges that already exist.
    ///
    /// # Errors
    ///
    /// - [`GraphError::MissingArtifact`] if `name` or any dependency is unknown
    /// - [`GraphError::DependencyCycle`] if the new edges would close a cycle;
    ///   the graph is left unchanged in that case
    pub fn add_dependency(&mut self, name: &str, deps: &[&str]) -> Result<(), GraphError> {
        for dep in deps {
            self.get(dep)?;
        }

        let artifact = self
            .artifacts
            .get_mut(name)
            .ok_or_else(|| GraphError::MissingArtifact {
                name: name.to_string(),
            })?;
        let previous_len = artifact.depends_on().len();
        for dep in deps {
            artifact.push_dependency(dep);
        }

        if let Err(err) = self.validate() {
            if let Some(artifact) = self.artifacts.get_mut(name) {
                artifact.truncate_dependencies(previous_len);
            }
            return Err(err);
        }

        Ok(())
    }

    /// Look up an artifact by name.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MissingArtifact`] for unknown names.
    pub fn get(&self, name: &str) -> Result<&Artifact, GraphError> {
        self.artifacts
            .get(name)
            .ok_or_else(|| GraphError::MissingArtifact {
                name: name.to_string(),
            })
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.artifacts.contains_key(name)
    }

    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.artifacts.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.artifacts.keys().map(String::as_str)
    }

    /// Location of `artifact` with the project suffix applied.
    #[must_use]
    pub fn qualified_location(&self, artifact: &Artifact) -> PathBuf {
        artifact
            .location()
            .with_extension(self.suffix.trim_start_matches('.'))
    }

    /// Suffix-qualified location of the named artifact.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MissingArtifact`] for unknown names.
    pub fn location(&self, name: &str) -> Result<PathBuf, GraphError> {
        Ok(self.qualified_location(self.get(name)?))
    }

    /// Path the named artifact is written to: root joined with its location.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MissingArtifact`] for unknown names.
    pub fn path_on_disk(&self, name: &str) -> Result<PathBuf, GraphError> {
        Ok(self.root.join(self.location(name)?))
    }

    /// Suffix-qualified locations of `name`'s dependencies, in declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::MissingArtifact`] if `name` or a dependency is unknown.
    pub fn dependencies(&self, name: &str) -> Result<Vec<PathBuf>, GraphError> {
        self.get(name)?
            .depends_on()
            .iter()
            .map(|dep| self.location(dep))
            .collect()
    }

    /// Name → ordered dependency locations, for every artifact.
    #[must_use]
    pub fn dependency_map(&self) -> IndexMap<String, Vec<PathBuf>> {
        self.artifacts
            .values()
            .map(|artifact| {
                let deps = artifact
                    .depends_on()
                    .iter()
                    .filter_map(|dep| self.artifacts.get(dep))
                    .map(|dep| self.qualified_location(dep))
                    .collect();
                (artifact.name().to_string(), deps)
            })
            .collect()
    }

    /// Name → suffix-qualified location, for every artifact.
    #[must_use]
    pub fn location_map(&self) -> IndexMap<String, PathBuf> {
        self.artifacts
            .values()
            .map(|artifact| {
                (
                    artifact.name().to_string(),
                    self.qualified_location(artifact),
                )
            })
            .collect()
    }

    fn edge_graph(&self) -> DiGraphMap<&str, ()> {
        let mut graph = DiGraphMap::new();
        for artifact in self.artifacts.values() {
            graph.add_node(artifact.name());
        }
        for artifact in self.artifacts.values() {
            for dep in artifact.depends_on() {
                graph.add_edge(dep.as_str(), artifact.name(), ());
            }
        }
        graph
    }

    /// Artifact names ordered so that every dependency precedes its dependents.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DependencyCycle`] if the edges contain a cycle.
    pub fn topological_order(&self) -> Result<Vec<String>, GraphError> {
        toposort(&self.edge_graph(), None)
            .map(|order| order.into_iter().map(str::to_string).collect())
            .map_err(|cycle| GraphError::DependencyCycle {
                artifact: cycle.node_id().to_string(),
            })
    }

    /// Check that the dependency edges form a DAG.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::DependencyCycle`] naming an artifact on the cycle.
    pub fn validate(&self) -> Result<(), GraphError> {
        self.topological_order().map(|_| ())
    }

    /// Create every artifact's parent directory and, when the language needs
    /// one, a package marker in each directory between the root and the
    /// artifact. Existing markers are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::Io`] if a directory or marker cannot be created.
    pub fn initialize_modules(&self) -> Result<(), GraphError> {
        for artifact in self.artifacts.values() {
            let Some(parent) = artifact.location().parent() else {
                continue;
            };

            let dir = self.root.join(parent);
            fs::create_dir_all(&dir).map_err(|source| GraphError::Io {
                path: dir.display().to_string(),
                source,
            })?;

            let Some(marker) = artifact.language().package_marker() else {
                continue;
            };

            let mut package_dir = self.root.clone();
            for component in parent.components() {
                package_dir.push(component);
                let marker_path = package_dir.join(marker);
                OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&marker_path)
                    .map_err(|source| GraphError::Io {
                        path: marker_path.display().to_string(),
                        source,
                    })?;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn diamond() -> ArtifactGraph {
        let mut graph = ArtifactGraph::new(".", Language::Python).unwrap();
        graph.add_artifact("proj/a").unwrap();
        graph.add_artifact("proj/b").unwrap();
        graph.add_artifact("proj/c").unwrap();
        graph.add_dependency("c", &["a", "b"]).unwrap();
        graph
    }

    #[test]
    fn test_dependency_map_lists_locations_in_order() {
        let graph = diamond();
        let deps = graph.dependency_map();
        assert_eq!(
            deps["c"],
            vec![PathBuf::from("proj/a.py"), PathBuf::from("proj/b.py")]
        );
        assert!(deps["a"].is_empty());
        assert!(deps["b"].is_empty());
    }

    #[test]
    fn test_location_map_applies_suffix() {
        let graph = diamond();
        let locations = graph.location_map();
        assert_eq!(locations["a"], PathBuf::from("proj/a.py"));
        assert_eq!(
            locations.keys().collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_views_reflect_later_mutation() {
        let mut graph = diamond();
        assert!(graph.dependency_map()["b"].is_empty());
        graph.add_dependency("b", &["a"]).unwrap();
        assert_eq!(graph.dependency_map()["b"], vec![PathBuf::from("proj/a.py")]);
    }

    #[test]
    fn test_unknown_names_are_missing_artifacts() {
        let mut graph = diamond();
        assert!(matches!(
            graph.location("nope"),
            Err(GraphError::MissingArtifact { name }) if name == "nope"
        ));
        assert!(matches!(
            graph.add_dependency("c", &["ghost"]),
            Err(GraphError::MissingArtifact { .. })
        ));
        assert!(matches!(
            graph.add_dependency("ghost", &["a"]),
            Err(GraphError::MissingArtifact { .. })
        ));
    }

    #[test]
    fn test_cycle_is_rejected_and_rolled_back() {
        let mut graph = diamond();
        let err = graph.add_dependency("a", &["c"]).unwrap_err();
        assert!(matches!(err, GraphError::DependencyCycle { .. }));
        assert!(graph.get("a").unwrap().depends_on().is_empty());
        graph.validate().unwrap();
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let mut graph = diamond();
        assert!(matches!(
            graph.add_dependency("a", &["a"]),
            Err(GraphError::DependencyCycle { artifact }) if artifact == "a"
        ));
    }

    #[test]
    fn test_topological_order_puts_dependencies_first() {
        let graph = diamond();
        let order = graph.topological_order().unwrap();
        let pos = |name: &str| order.iter().position(|n| n == name).unwrap();
        assert_eq!(order.len(), 3);
        assert!(pos("a") < pos("c"));
        assert!(pos("b") < pos("c"));
    }

    #[test]
    fn test_duplicate_name_and_location() {
        let mut graph = diamond();
        assert!(matches!(
            graph.add_artifact("other/a"),
            Err(GraphError::DuplicateArtifact { .. })
        ));

        let mut graph = ArtifactGraph::new(".", Language::Python).unwrap();
        graph.add_artifact("proj/a").unwrap();
        assert!(matches!(
            graph.add_artifact_with_language("./proj/a", Language::Python),
            Err(GraphError::DuplicateArtifact { .. })
        ));
    }

    #[test]
    fn test_unsupported_project_language() {
        let err = ArtifactGraph::new(".", Language::parse("fortran")).unwrap_err();
        assert!(matches!(err, GraphError::LanguageNotImplemented { .. }));
    }

    #[test]
    fn test_initialize_modules_writes_markers_in_every_ancestor() {
        let temp = TempDir::new().unwrap();
        let mut graph = ArtifactGraph::new(temp.path(), Language::Python).unwrap();
        graph.add_artifact("output/solution").unwrap();
        graph.add_artifact("output/measurements/runtime").unwrap();
        graph.initialize_modules().unwrap();

        assert!(temp.path().join("output/__init__.py").is_file());
        assert!(temp.path().join("output/measurements/__init__.py").is_file());
        assert!(!temp.path().join("__init__.py").exists());
    }

    #[test]
    fn test_initialize_modules_keeps_existing_marker_content() {
        let temp = TempDir::new().unwrap();
        let mut graph = ArtifactGraph::new(temp.path(), Language::Python).unwrap();
        graph.add_artifact("output/solution").unwrap();
        graph.initialize_modules().unwrap();

        let marker = temp.path().join("output/__init__.py");
        fs::write(&marker, "VERSION = 1\n").unwrap();
        graph.initialize_modules().unwrap();
        assert_eq!(fs::read_to_string(marker).unwrap(), "VERSION = 1\n");
    }
}
