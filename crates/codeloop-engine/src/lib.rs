//! Refinement loop for codeloop
//!
//! [`Refiner`] repeatedly asks a [`Generator`](codeloop_llm::Generator) for
//! every output of a signature, writes the code outputs into an
//! [`ArtifactGraph`](codeloop_graph::ArtifactGraph), validates and executes
//! them, and feeds the outcomes back until all succeed or the step budget is
//! spent. [`project`] holds the problem-solving scaffold the CLI runs.

mod outcome;
mod persist;
pub mod project;
mod refine;
mod trajectory;

pub use outcome::{ArtifactOutcome, RefineOutput, StepReport, Terminal};
pub use persist::persist_artifact;
pub use refine::{RefineSettings, Refiner};
pub use trajectory::Trajectory;
