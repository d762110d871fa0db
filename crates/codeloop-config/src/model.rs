use codeloop_utils::Language;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_STEPS: u32 = 3;
pub const DEFAULT_SUCCESS_MESSAGE: &str = "Code executed successfully!";
pub const DEFAULT_SENTINEL: &str = "# TODO:";
pub const DEFAULT_EXECUTION_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_OPENROUTER_MODEL: &str = "nvidia/nemotron-3-nano-30b-a3b:free";

/// Where a resolved configuration value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Cli,
    ConfigFile(PathBuf),
    Default,
}

impl ConfigSource {
    /// Stable label used in `effective_config` output.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Cli => "cli",
            Self::ConfigFile(_) => "config",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigFile(path) => write!(f, "config ({})", path.display()),
            other => f.write_str(other.label()),
        }
    }
}

/// `[defaults]`: refinement loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    /// Maximum refinement steps.
    pub steps: u32,
    /// Attempts kept per artifact; 0 keeps all.
    pub trajectory_len: usize,
    pub success_message: String,
    pub sentinel: String,
    /// Seconds allowed per artifact command.
    pub execution_timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS,
            trajectory_len: 0,
            success_message: DEFAULT_SUCCESS_MESSAGE.to_string(),
            sentinel: DEFAULT_SENTINEL.to_string(),
            execution_timeout: DEFAULT_EXECUTION_TIMEOUT_SECS,
        }
    }
}

/// `[project]`: where artifacts are laid out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project directory, relative to `root`.
    pub name: String,
    /// Working directory commands run in.
    pub root: PathBuf,
    pub language: Language,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            name: "output".to_string(),
            root: PathBuf::from("."),
            language: Language::Python,
        }
    }
}

/// `[runner]`: how artifacts are executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerConfig {
    pub program: String,
    /// Arguments placed before the module path.
    pub args: Vec<String>,
    /// Optional setup command; empty means none.
    pub pre_command: Vec<String>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            program: "uv".to_string(),
            args: vec!["run".to_string(), "-m".to_string()],
            pre_command: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub model: String,
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Seconds per invocation.
    pub timeout: u64,
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            model: DEFAULT_OPENROUTER_MODEL.to_string(),
            base_url: None,
            max_tokens: 8192,
            temperature: 1.0,
            timeout: 300,
        }
    }
}

/// `[llm]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: String,
    pub openrouter: OpenRouterConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openrouter".to_string(),
            openrouter: OpenRouterConfig::default(),
        }
    }
}

/// Resolved configuration.
///
/// Built by [`Config::discover`] with precedence CLI > config file >
/// defaults. `source_attribution` records, per key, which layer supplied the
/// value.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub defaults: Defaults,
    pub project: ProjectConfig,
    pub runner: RunnerConfig,
    pub llm: LlmConfig,
    /// Config file that was loaded, if any.
    pub config_path: Option<PathBuf>,
    pub source_attribution: HashMap<String, ConfigSource>,
}

impl Default for Config {
    fn default() -> Self {
        let source_attribution = crate::sources::KEYS
            .iter()
            .map(|key| ((*key).to_string(), ConfigSource::Default))
            .collect();

        Self {
            defaults: Defaults::default(),
            project: ProjectConfig::default(),
            runner: RunnerConfig::default(),
            llm: LlmConfig::default(),
            config_path: None,
            source_attribution,
        }
    }
}

impl Config {
    /// Directory the project's artifacts live in: `root/name`.
    #[must_use]
    pub fn project_dir(&self) -> PathBuf {
        self.project.root.join(&self.project.name)
    }

    #[must_use]
    pub fn pre_command(&self) -> Option<Vec<String>> {
        if self.runner.pre_command.is_empty() {
            None
        } else {
            Some(self.runner.pre_command.clone())
        }
    }
}

/// Values supplied on the command line. `None` leaves lower layers in effect.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub config_path: Option<PathBuf>,
    pub steps: Option<u32>,
    pub trajectory_len: Option<usize>,
    pub success_message: Option<String>,
    pub sentinel: Option<String>,
    pub execution_timeout: Option<u64>,
    pub project_name: Option<String>,
    pub project_root: Option<PathBuf>,
    pub language: Option<String>,
    pub runner_program: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
}
