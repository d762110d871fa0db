//! codeloop - generate, execute and repair code projects with an LLM
//!
//! codeloop asks a language model for a solution to an algorithmic problem,
//! its tests and performance probes, writes them as a small package, runs
//! each artifact and feeds failures back until everything passes or the step
//! budget is spent.
//!
//! It can be used as a CLI (`codeloop solve`, `codeloop validate`,
//! `codeloop graph`) or as a library. The library surface re-exports the
//! workspace crates:
//!
//! - [`graph`]: the artifact dependency graph and reference hints
//! - [`template`]: template conformance validation
//! - [`runner`]: command execution with timeouts
//! - [`llm`]: the generator seam and the OpenRouter backend
//! - [`config`]: layered configuration
//! - [`engine`]: the refinement loop and the problem-solving scaffold
//!
//! # Example
//!
//! ```no_run
//! use codeloop::engine::project::{execution_plan, problem_solving_graph, problem_solving_request};
//! use codeloop::{CliArgs, Config, Executor, RefineSettings, Refiner};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::discover(&CliArgs::default())?;
//! let graph = problem_solving_graph(".", "output", config.project.language.clone())?;
//! graph.initialize_modules()?;
//! let request = problem_solving_request(&graph, "Add two numbers.", "cases = []\n")?;
//!
//! let refiner = Refiner::new(
//!     codeloop::llm::from_config(&config)?,
//!     Executor::native(execution_plan(&config)),
//!     graph,
//!     RefineSettings::from_config(&config),
//! );
//! let output = refiner.refine(&request).await?;
//! println!("{:?} after {} steps", output.status, output.steps_taken);
//! # Ok(())
//! # }
//! ```

pub mod cli;

pub use codeloop_config as config;
pub use codeloop_engine as engine;
pub use codeloop_graph as graph;
pub use codeloop_llm as llm;
pub use codeloop_runner as runner;
pub use codeloop_template as template;
pub use codeloop_utils::logging;

pub use codeloop_config::{CliArgs, Config};
pub use codeloop_engine::{
    ArtifactOutcome, RefineOutput, RefineSettings, Refiner, StepReport, Terminal, Trajectory,
};
pub use codeloop_graph::{Artifact, ArtifactGraph, render_cases, write_cases};
pub use codeloop_llm::{GenerationRequest, Generator, Signature};
pub use codeloop_runner::{Executor, NativeRunner, ProcessRunner};
pub use codeloop_template::{Conformance, validate};
pub use codeloop_utils::{
    CodeloopError, ConfigError, ExitCode, GraphError, Language, LlmError, RunnerError,
};
