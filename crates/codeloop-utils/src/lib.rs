//! Foundation utilities shared by every codeloop crate
//!
//! - [`types`]: the [`Language`](types::Language) an artifact is written in
//! - [`error`]: the error taxonomy (configuration, graph, runner, LLM)
//! - [`exit_codes`]: CLI exit codes derived from errors and run outcomes
//! - [`logging`]: tracing subscriber initialisation

pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod types;

pub use error::{
    CodeloopError, ConfigError, ErrorCategory, GraphError, LlmError, RunnerError,
    UserFriendlyError,
};
pub use exit_codes::ExitCode;
pub use types::Language;
