//! Error taxonomy for codeloop
//!
//! Every error in this module is *fatal*: it indicates a misconfigured
//! project, a missing graph entry, or an infrastructure failure. Problems
//! with generated content (template violations, failing executions, timed
//! out commands) are not errors; they become outcome text that is fed back
//! into the next generation step.

use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Library-level error type.
///
/// Use [`to_exit_code()`](Self::to_exit_code) to map to a CLI exit code and
/// [`display_for_user()`](Self::display_for_user) for a message with context
/// and suggestions.
#[derive(Error, Debug)]
pub enum CodeloopError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Artifact graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Runner error: {0}")]
    Runner(#[from] RunnerError),

    #[error("LLM backend error: {0}")]
    Llm(#[from] LlmError),

    #[error("Failed to persist artifact '{artifact}' to {path}: {source}")]
    Persist {
        artifact: String,
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    ArtifactGraph,
    Execution,
    LlmIntegration,
    FileSystem,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::ArtifactGraph => write!(f, "Artifact Graph"),
            Self::Execution => write!(f, "Execution"),
            Self::LlmIntegration => write!(f, "LLM Integration"),
            Self::FileSystem => write!(f, "File System"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Configuration discovery failed: {reason}")]
    DiscoveryFailed { reason: String },
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => {
                format!("Configuration file has invalid format: {reason}")
            }
            Self::InvalidValue { key, value } => {
                format!("Configuration '{key}' has invalid value: {value}")
            }
            Self::NotFound { path } => format!("Configuration file not found: {path}"),
            Self::DiscoveryFailed { reason } => {
                format!("Failed to discover configuration: {reason}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) => Some(
                "Configuration files are TOML with [defaults], [project], [runner] and [llm] sections."
                    .to_string(),
            ),
            Self::InvalidValue { key, .. } => Some(format!(
                "The '{key}' configuration option has specific format requirements."
            )),
            Self::NotFound { .. } | Self::DiscoveryFailed { .. } => Some(
                "codeloop searches for .codeloop/config.toml starting from the current directory upward."
                    .to_string(),
            ),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax using a TOML validator".to_string(),
                "Compare with the example configuration in the README".to_string(),
            ],
            Self::InvalidValue { key, .. } => match key.as_str() {
                "steps" | "execution_timeout" => vec!["Use a positive integer value".to_string()],
                "llm_provider" => vec!["Use 'openrouter' as the LLM provider".to_string()],
                _ => vec![
                    "Remove the option to use the default value".to_string(),
                    "Override it with the matching CLI flag".to_string(),
                ],
            },
            Self::NotFound { .. } => vec![
                "Create .codeloop/config.toml in your project root".to_string(),
                "Use CLI flags instead of a configuration file".to_string(),
            ],
            Self::DiscoveryFailed { .. } => vec![
                "Use --config <path> to specify the configuration file explicitly".to_string(),
            ],
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Configuration
    }
}

/// Errors raised while building or querying the artifact graph
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("Missing artifact '{name}' in the artifact graph")]
    MissingArtifact { name: String },

    #[error("Artifact '{name}' is already registered")]
    DuplicateArtifact { name: String },

    #[error("Location {location} is already owned by another artifact")]
    DuplicateLocation { location: String },

    #[error("Dependency cycle detected through artifact '{artifact}'")]
    DependencyCycle { artifact: String },

    #[error(
        "Cannot generate cross-language reference from '{from}' ({from_language}) to '{to}' ({to_language})"
    )]
    CrossLanguageReference {
        from: String,
        from_language: String,
        to: String,
        to_language: String,
    },

    #[error("{operation} is not implemented for language '{language}'")]
    LanguageNotImplemented { language: String, operation: String },

    #[error("Invalid artifact location '{location}'")]
    InvalidLocation { location: String },

    #[error("IO error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl UserFriendlyError for GraphError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::DependencyCycle { .. } => Some(
                "Artifacts may only reference artifacts that do not (transitively) reference them back."
                    .to_string(),
            ),
            Self::CrossLanguageReference { .. } => Some(
                "Reference statements are only generated between artifacts of the same language."
                    .to_string(),
            ),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::LanguageNotImplemented { .. } => {
                vec!["Set [project] language = \"python\"".to_string()]
            }
            Self::MissingArtifact { name } => {
                vec![format!("Register '{name}' before adding dependencies on it")]
            }
            _ => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Io { .. } => ErrorCategory::FileSystem,
            _ => ErrorCategory::ArtifactGraph,
        }
    }
}

/// Process execution errors
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to spawn '{program}': {reason}")]
    SpawnFailed { program: String, reason: String },

    #[error("Execution timed out after {timeout_seconds} seconds")]
    Timeout { timeout_seconds: u64 },

    #[error("Execution is not implemented for language '{language}'")]
    LanguageNotImplemented { language: String },

    #[error("Process monitoring failed: {reason}")]
    MonitorFailed { reason: String },
}

impl UserFriendlyError for RunnerError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::SpawnFailed { .. } => {
                Some("Artifacts are executed with the program configured in [runner].".to_string())
            }
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::SpawnFailed { program, .. } => vec![
                format!("Ensure '{program}' is installed and on PATH"),
                "Set [runner] program to the interpreter or package runner to use".to_string(),
            ],
            Self::Timeout { .. } => {
                vec!["Increase [defaults] execution_timeout".to_string()]
            }
            _ => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Execution
    }
}

/// LLM backend errors
#[derive(Error, Debug)]
pub enum LlmError {
    /// Transport-level failure (HTTP connectivity, malformed body)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status reported by the provider
    #[error("Provider returned {status}: {message}")]
    Provider { status: u16, message: String },

    /// Invocation timed out
    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// Configuration error
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),

    /// Unsupported feature or provider
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// The response did not contain a declared output field
    #[error("Response is missing output field '{field}'")]
    MissingField { field: String },
}

impl UserFriendlyError for LlmError {
    fn user_message(&self) -> String {
        self.to_string()
    }

    fn context(&self) -> Option<String> {
        None
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Misconfiguration(_) => vec![
                "Check the [llm.openrouter] section of .codeloop/config.toml".to_string(),
                "Ensure the API key environment variable is set".to_string(),
            ],
            Self::Provider { status: 429, .. } => {
                vec!["Wait and retry, or switch to a model with a higher rate limit".to_string()]
            }
            _ => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::LlmIntegration
    }
}

impl UserFriendlyError for CodeloopError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(err) => err.user_message(),
            Self::Graph(err) => err.user_message(),
            Self::Runner(err) => err.user_message(),
            Self::Llm(err) => err.user_message(),
            Self::Persist { .. } | Self::Io(_) => self.to_string(),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(err) => err.context(),
            Self::Graph(err) => err.context(),
            Self::Runner(err) => err.context(),
            Self::Llm(err) => err.context(),
            Self::Persist { .. } => Some(
                "Artifact directories are created when the project is initialised.".to_string(),
            ),
            Self::Io(_) => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(err) => err.suggestions(),
            Self::Graph(err) => err.suggestions(),
            Self::Runner(err) => err.suggestions(),
            Self::Llm(err) => err.suggestions(),
            Self::Persist { .. } | Self::Io(_) => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(err) => err.category(),
            Self::Graph(err) => err.category(),
            Self::Runner(err) => err.category(),
            Self::Llm(err) => err.category(),
            Self::Persist { .. } | Self::Io(_) => ErrorCategory::FileSystem,
        }
    }
}

impl CodeloopError {
    /// Format the error with context and suggestions for terminal output.
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut output = format!("Error: {}\n", self.user_message());

        if let Some(ctx) = self.context() {
            output.push_str(&format!("\nContext: {ctx}\n"));
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in suggestions {
                output.push_str(&format!("  • {suggestion}\n"));
            }
        }

        output
    }

    /// Map this error to the CLI exit code.
    #[must_use]
    pub fn to_exit_code(&self) -> crate::exit_codes::ExitCode {
        use crate::exit_codes::ExitCode;

        match self {
            Self::Config(_) => ExitCode::CLI_ARGS,
            Self::Graph(GraphError::Io { .. }) => ExitCode::INTERNAL,
            Self::Graph(_) => ExitCode::CLI_ARGS,
            Self::Runner(RunnerError::Timeout { .. }) => ExitCode::EXECUTION_TIMEOUT,
            Self::Runner(RunnerError::MonitorFailed { .. }) => ExitCode::INTERNAL,
            Self::Runner(_) => ExitCode::CLI_ARGS,
            Self::Llm(LlmError::Misconfiguration(_) | LlmError::Unsupported(_)) => {
                ExitCode::CLI_ARGS
            }
            Self::Llm(_) => ExitCode::LLM_FAILURE,
            Self::Persist { .. } | Self::Io(_) => ExitCode::INTERNAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes::ExitCode;

    #[test]
    fn test_exit_code_mapping() {
        let config = CodeloopError::Config(ConfigError::InvalidValue {
            key: "steps".to_string(),
            value: "0".to_string(),
        });
        assert_eq!(config.to_exit_code(), ExitCode::CLI_ARGS);

        let missing = CodeloopError::Graph(GraphError::MissingArtifact {
            name: "solution".to_string(),
        });
        assert_eq!(missing.to_exit_code(), ExitCode::CLI_ARGS);

        let timeout = CodeloopError::Runner(RunnerError::Timeout { timeout_seconds: 5 });
        assert_eq!(timeout.to_exit_code(), ExitCode::EXECUTION_TIMEOUT);

        let provider = CodeloopError::Llm(LlmError::Provider {
            status: 503,
            message: "down".to_string(),
        });
        assert_eq!(provider.to_exit_code(), ExitCode::LLM_FAILURE);
    }

    #[test]
    fn test_display_for_user_includes_suggestions() {
        let err = CodeloopError::Runner(RunnerError::SpawnFailed {
            program: "uv".to_string(),
            reason: "No such file or directory".to_string(),
        });
        let text = err.display_for_user();
        assert!(text.starts_with("Error: Failed to spawn 'uv'"));
        assert!(text.contains("Context:"));
        assert!(text.contains("Ensure 'uv' is installed and on PATH"));
    }

    #[test]
    fn test_cross_language_message() {
        let err = GraphError::CrossLanguageReference {
            from: "test".to_string(),
            from_language: "python".to_string(),
            to: "solution".to_string(),
            to_language: "rust".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot generate cross-language reference from 'test' (python) to 'solution' (rust)"
        );
        assert_eq!(err.category(), ErrorCategory::ArtifactGraph);
    }
}
