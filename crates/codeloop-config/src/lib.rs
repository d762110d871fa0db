//! Configuration for codeloop
//!
//! Hierarchical configuration with discovery and precedence CLI > file >
//! defaults. The file is TOML with `[defaults]`, `[project]`, `[runner]` and
//! `[llm]` sections, found at `.codeloop/config.toml` in the working
//! directory or one of its ancestors.

mod discovery;
mod model;
mod sources;
mod validation;

pub use codeloop_utils::ConfigError;
pub use discovery::{CONFIG_DIR, CONFIG_FILE};
pub use model::{
    CliArgs, Config, ConfigSource, DEFAULT_EXECUTION_TIMEOUT_SECS, DEFAULT_OPENROUTER_MODEL,
    DEFAULT_SENTINEL, DEFAULT_STEPS, DEFAULT_SUCCESS_MESSAGE, Defaults, LlmConfig,
    OpenRouterConfig, ProjectConfig, RunnerConfig,
};
