use codeloop_graph::module_path;
use codeloop_utils::{Language, RunnerError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::{CommandSpec, NativeRunner, ProcessRunner};

/// How artifacts are turned into commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionPlan {
    /// Package runner program, e.g. `uv`.
    pub program: String,
    /// Arguments placed before the module path, e.g. `["run", "-m"]`.
    pub args: Vec<String>,
    /// Setup command run before every artifact command.
    pub pre_command: Option<Vec<String>>,
    /// Working directory for every command; artifact locations are relative to it.
    pub root: PathBuf,
    pub timeout: Duration,
}

impl Default for ExecutionPlan {
    fn default() -> Self {
        Self {
            program: "uv".to_string(),
            args: vec!["run".to_string(), "-m".to_string()],
            pre_command: None,
            root: PathBuf::from("."),
            timeout: Duration::from_secs(120),
        }
    }
}

/// What happened when an artifact was executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    Succeeded,
    /// Non-zero exit; carries stderr unmodified.
    Failed { stderr: String },
    PreCommandFailed { command: String, stderr: String },
    TimedOut { timeout_seconds: u64 },
}

impl ExecutionOutcome {
    /// Collapse into the outcome text fed back to the generator.
    ///
    /// Success maps to `success_message` verbatim and a failed run to its
    /// stderr verbatim, so callers detect failure by comparing against
    /// `success_message`.
    #[must_use]
    pub fn into_message(self, success_message: &str) -> String {
        match self {
            Self::Succeeded => success_message.to_string(),
            Self::Failed { stderr } => stderr,
            Self::PreCommandFailed { command, stderr } => {
                format!("Pre-command execution: {command} failed with error {stderr}!")
            }
            Self::TimedOut { timeout_seconds } => {
                format!("Execution timed out after {timeout_seconds} seconds!")
            }
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Executes persisted artifacts through a [`ProcessRunner`].
#[derive(Debug, Clone)]
pub struct Executor<R = NativeRunner> {
    runner: R,
    plan: ExecutionPlan,
}

impl Executor<NativeRunner> {
    #[must_use]
    pub fn native(plan: ExecutionPlan) -> Self {
        Self::new(NativeRunner::new(), plan)
    }
}

impl<R: ProcessRunner> Executor<R> {
    #[must_use]
    pub fn new(runner: R, plan: ExecutionPlan) -> Self {
        Self { runner, plan }
    }

    #[must_use]
    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    /// Command that runs the artifact at `location` (relative to the root).
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::LanguageNotImplemented`] for languages without
    /// an execution convention.
    pub fn command_for(
        &self,
        location: &Path,
        language: &Language,
    ) -> Result<CommandSpec, RunnerError> {
        match language {
            Language::Python => Ok(CommandSpec::new(&self.plan.program)
                .args(&self.plan.args)
                .arg(module_path(location))
                .cwd(&self.plan.root)),
            Language::Other(name) => Err(RunnerError::LanguageNotImplemented {
                language: name.clone(),
            }),
        }
    }

    /// Run the artifact at `location`, preceded by the pre-command if one is
    /// configured.
    ///
    /// Non-zero exits, pre-command failures and timeouts are reported as
    /// outcomes; only problems that no retry can fix are errors.
    ///
    /// # Errors
    ///
    /// - [`RunnerError::LanguageNotImplemented`] for unsupported languages
    /// - [`RunnerError::SpawnFailed`] if a configured program cannot be started
    /// - [`RunnerError::MonitorFailed`] if waiting on the child fails
    pub fn execute(
        &self,
        location: &Path,
        language: &Language,
    ) -> Result<ExecutionOutcome, RunnerError> {
        let command = self.command_for(location, language)?;

        if let Some(pre) = self.pre_command() {
            debug!(command = %pre, "Running pre-command");
            match self.run(&pre)? {
                Ok(output) if output.success() => {}
                Ok(output) => {
                    return Ok(ExecutionOutcome::PreCommandFailed {
                        command: pre.to_string(),
                        stderr: output.stderr_string(),
                    });
                }
                Err(outcome) => return Ok(outcome),
            }
        }

        debug!(command = %command, "Executing artifact");
        let outcome = match self.run(&command)? {
            Ok(output) if output.success() => ExecutionOutcome::Succeeded,
            Ok(output) => ExecutionOutcome::Failed {
                stderr: output.stderr_string(),
            },
            Err(outcome) => outcome,
        };
        debug!(location = %location.display(), success = outcome.is_success(), "Artifact executed");

        Ok(outcome)
    }

    /// [`execute`](Self::execute) collapsed to its outcome text.
    ///
    /// # Errors
    ///
    /// Same as [`execute`](Self::execute).
    pub fn execute_message(
        &self,
        location: &Path,
        language: &Language,
        success_message: &str,
    ) -> Result<String, RunnerError> {
        Ok(self
            .execute(location, language)?
            .into_message(success_message))
    }

    fn pre_command(&self) -> Option<CommandSpec> {
        self.plan
            .pre_command
            .as_ref()
            .and_then(CommandSpec::from_argv)
            .map(|cmd| cmd.cwd(&self.plan.root))
    }

    // Outer error is fatal; inner `Err` is a timeout outcome.
    fn run(
        &self,
        cmd: &CommandSpec,
    ) -> Result<Result<crate::ProcessOutput, ExecutionOutcome>, RunnerError> {
        match self.runner.run(cmd, self.plan.timeout) {
            Ok(output) => Ok(Ok(output)),
            Err(RunnerError::Timeout { timeout_seconds }) => {
                Ok(Err(ExecutionOutcome::TimedOut { timeout_seconds }))
            }
            Err(err) => Err(err),
        }
    }
}
