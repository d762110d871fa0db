//! Artifact graph for generated code projects
//!
//! An [`ArtifactGraph`] owns every [`Artifact`] of one run together with the
//! dependency edges between them. Generated code uses the graph to learn
//! which other artifacts it may import ([`ArtifactGraph::reference_hints`])
//! and the executor uses it to resolve where an artifact lives on disk.
//!
//! Derived views (`dependency_map`, `location_map`) are recomputed on every
//! call, so they can never go stale when edges are added later.

mod artifact;
mod graph;
pub mod literal;
pub mod reference;

pub use artifact::Artifact;
pub use codeloop_utils::{GraphError, Language};
pub use graph::ArtifactGraph;
pub use literal::{render_cases, write_cases};
pub use reference::{module_path, use_statement};
