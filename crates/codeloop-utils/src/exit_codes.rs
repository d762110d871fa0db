//! Exit code constants for the codeloop CLI.
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Every artifact succeeded / document conforms |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments, configuration or project graph |
//! | 3 | `NOT_CONFORMING` | Candidate does not conform to its template |
//! | 4 | `BUDGET_EXHAUSTED` | Step budget exhausted with failing artifacts |
//! | 10 | `EXECUTION_TIMEOUT` | A command timed out outside the feedback loop |
//! | 70 | `LLM_FAILURE` | LLM backend invocation failed |

/// Exit codes matching the documented exit code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - operation completed successfully
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid arguments, configuration or graph
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// The candidate document edits lines outside every marked region
    pub const NOT_CONFORMING: ExitCode = ExitCode(3);

    /// The refinement loop ran out of steps before every artifact succeeded
    pub const BUDGET_EXHAUSTED: ExitCode = ExitCode(4);

    /// A command exceeded its timeout where no feedback loop could absorb it
    pub const EXECUTION_TIMEOUT: ExitCode = ExitCode(10);

    /// LLM failure - the generator could not produce a response
    pub const LLM_FAILURE: ExitCode = ExitCode(70);

    /// Get the numeric exit code value.
    ///
    /// Use this with `std::process::exit()`.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Create an ExitCode from a raw i32 value.
    ///
    /// Prefer using the named constants when possible.
    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
        assert_eq!(ExitCode::INTERNAL.as_i32(), 1);
        assert_eq!(ExitCode::CLI_ARGS.as_i32(), 2);
        assert_eq!(ExitCode::NOT_CONFORMING.as_i32(), 3);
        assert_eq!(ExitCode::BUDGET_EXHAUSTED.as_i32(), 4);
        assert_eq!(ExitCode::EXECUTION_TIMEOUT.as_i32(), 10);
        assert_eq!(ExitCode::LLM_FAILURE.as_i32(), 70);
    }

    #[test]
    fn test_round_trip_through_i32() {
        let code: i32 = ExitCode::BUDGET_EXHAUSTED.into();
        assert_eq!(ExitCode::from(code), ExitCode::BUDGET_EXHAUSTED);
        assert_eq!(ExitCode::from_i32(3), ExitCode::NOT_CONFORMING);
    }
}
