//! CLI command implementations.
//!
//! Each handler prints its own stdout output and returns the exit code for
//! a completed run; fatal problems are returned as errors for `run` to report.

mod common;
mod graph;
mod solve;
mod validate;

pub use graph::execute_graph_command;
pub use solve::execute_solve_command;
pub use validate::execute_validate_command;
