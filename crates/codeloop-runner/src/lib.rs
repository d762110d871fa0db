//! Execution of generated artifacts
//!
//! All process execution goes through [`CommandSpec`], which keeps arguments
//! as discrete argv elements. [`Executor`] turns an artifact location into a
//! command for its language, runs it through a [`ProcessRunner`], and
//! classifies the result as an [`ExecutionOutcome`].

mod command_spec;
mod executor;
mod native;
mod process;

pub use codeloop_utils::RunnerError;
pub use command_spec::CommandSpec;
pub use executor::{ExecutionOutcome, ExecutionPlan, Executor};
pub use native::NativeRunner;
pub use process::{ProcessOutput, ProcessRunner};
