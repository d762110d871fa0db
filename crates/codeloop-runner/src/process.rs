use codeloop_utils::RunnerError;
use std::time::Duration;

use crate::CommandSpec;

/// Captured result of a finished process. Stdout is not kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stderr: Vec<u8>,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
}

impl ProcessOutput {
    #[must_use]
    pub fn new(stderr: Vec<u8>, exit_code: Option<i32>) -> Self {
        Self { stderr, exit_code }
    }

    #[must_use]
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Synchronous process execution.
///
/// Implementations must pass arguments as discrete argv elements and never
/// evaluate a shell string.
///
/// # Errors
///
/// `run` returns [`RunnerError::SpawnFailed`] if the program cannot be
/// started and [`RunnerError::Timeout`] if it does not finish within
/// `timeout`. A non-zero exit is an `Ok` output.
pub trait ProcessRunner: Send + Sync {
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError>;
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for &R {
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        (**self).run(cmd, timeout)
    }
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for std::sync::Arc<R> {
    fn run(&self, cmd: &CommandSpec, timeout: Duration) -> Result<ProcessOutput, RunnerError> {
        (**self).run(cmd, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_requires_zero_exit() {
        assert!(ProcessOutput::new(vec![], Some(0)).success());
        assert!(!ProcessOutput::new(vec![], Some(1)).success());
        assert!(!ProcessOutput::new(vec![], None).success());
    }

    #[test]
    fn test_lossy_strings() {
        let output = ProcessOutput::new(vec![b'e', 0xff], Some(1));
        assert_eq!(output.stderr_string(), "e\u{fffd}");
    }
}
