use codeloop_utils::{ConfigError, Language};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::model::{CliArgs, Config, ConfigSource};

/// Directory holding the config file.
pub const CONFIG_DIR: &str = ".codeloop";
pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    defaults: Option<FileDefaults>,
    project: Option<FileProject>,
    runner: Option<FileRunner>,
    llm: Option<FileLlm>,
}

#[derive(Debug, Default, Deserialize)]
struct FileDefaults {
    steps: Option<u32>,
    trajectory_len: Option<usize>,
    success_message: Option<String>,
    sentinel: Option<String>,
    execution_timeout: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct FileProject {
    name: Option<String>,
    root: Option<PathBuf>,
    language: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FileRunner {
    program: Option<String>,
    args: Option<Vec<String>>,
    pre_command: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct FileLlm {
    provider: Option<String>,
    openrouter: Option<FileOpenRouter>,
}

#[derive(Debug, Default, Deserialize)]
struct FileOpenRouter {
    api_key_env: Option<String>,
    model: Option<String>,
    base_url: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    timeout: Option<u64>,
}

/// Overwrites `target` and records `source` for `key` when `value` is set.
struct Layer<'a> {
    source: ConfigSource,
    attribution: &'a mut HashMap<String, ConfigSource>,
}

impl Layer<'_> {
    fn set<T>(&mut self, key: &str, target: &mut T, value: Option<T>) {
        if let Some(value) = value {
            *target = value;
            self.attribution.insert(key.to_string(), self.source.clone());
        }
    }
}

impl Config {
    /// Discover configuration from the current directory.
    ///
    /// # Errors
    ///
    /// See [`Config::discover_from`].
    pub fn discover(cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let start_dir = std::env::current_dir().map_err(|e| ConfigError::DiscoveryFailed {
            reason: format!("Failed to get current directory: {e}"),
        })?;
        Self::discover_from(&start_dir, cli_args)
    }

    /// Resolve configuration with precedence CLI > file > defaults.
    ///
    /// The file is `cli_args.config_path` when given, otherwise the nearest
    /// `.codeloop/config.toml` found walking up from `start_dir`. The result
    /// is validated before it is returned.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::NotFound`] if an explicit config path does not exist
    /// - [`ConfigError::InvalidFile`] if the file cannot be read or parsed
    /// - [`ConfigError::InvalidValue`] if a resolved value fails validation
    pub fn discover_from(start_dir: &Path, cli_args: &CliArgs) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let config_path = match &cli_args.config_path {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(ConfigError::NotFound {
                        path: explicit.display().to_string(),
                    });
                }
                Some(explicit.clone())
            }
            None => Self::discover_config_file_from(start_dir),
        };

        if let Some(path) = &config_path {
            debug!(path = %path.display(), "Loading config file");
            let file = Self::load_config_file(path)?;
            config.apply_file(file, path);
            config.config_path = Some(path.clone());
        }

        config.apply_cli(cli_args);
        config.validate()?;
        Ok(config)
    }

    /// Nearest `.codeloop/config.toml` at or above `start_dir`, stopping at
    /// a repository root.
    #[must_use]
    pub fn discover_config_file_from(start_dir: &Path) -> Option<PathBuf> {
        let mut current = Some(start_dir);

        while let Some(dir) = current {
            let candidate = dir.join(CONFIG_DIR).join(CONFIG_FILE);
            if candidate.is_file() {
                return Some(candidate);
            }
            if dir.join(".git").exists() {
                break;
            }
            current = dir.parent();
        }

        None
    }

    fn load_config_file(path: &Path) -> Result<FileConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::InvalidFile(format!("Failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&content).map_err(|e| {
            ConfigError::InvalidFile(format!("Failed to parse {}: {e}", path.display()))
        })
    }

    fn apply_file(&mut self, file: FileConfig, path: &Path) {
        let mut layer = Layer {
            source: ConfigSource::ConfigFile(path.to_path_buf()),
            attribution: &mut self.source_attribution,
        };

        if let Some(d) = file.defaults {
            layer.set("steps", &mut self.defaults.steps, d.steps);
            layer.set("trajectory_len", &mut self.defaults.trajectory_len, d.trajectory_len);
            layer.set("success_message", &mut self.defaults.success_message, d.success_message);
            layer.set("sentinel", &mut self.defaults.sentinel, d.sentinel);
            layer.set("execution_timeout", &mut self.defaults.execution_timeout, d.execution_timeout);
        }

        if let Some(p) = file.project {
            layer.set("project_name", &mut self.project.name, p.name);
            layer.set("project_root", &mut self.project.root, p.root);
            layer.set(
                "language",
                &mut self.project.language,
                p.language.as_deref().map(Language::parse),
            );
        }

        if let Some(r) = file.runner {
            layer.set("runner_program", &mut self.runner.program, r.program);
            layer.set("runner_args", &mut self.runner.args, r.args);
            layer.set("pre_command", &mut self.runner.pre_command, r.pre_command);
        }

        if let Some(l) = file.llm {
            layer.set("llm_provider", &mut self.llm.provider, l.provider);
            if let Some(o) = l.openrouter {
                let target = &mut self.llm.openrouter;
                layer.set("openrouter_api_key_env", &mut target.api_key_env, o.api_key_env);
                layer.set("openrouter_model", &mut target.model, o.model);
                layer.set("openrouter_base_url", &mut target.base_url, o.base_url.map(Some));
                layer.set("openrouter_max_tokens", &mut target.max_tokens, o.max_tokens);
                layer.set("openrouter_temperature", &mut target.temperature, o.temperature);
                layer.set("openrouter_timeout", &mut target.timeout, o.timeout);
            }
        }
    }

    fn apply_cli(&mut self, cli: &CliArgs) {
        let mut layer = Layer {
            source: ConfigSource::Cli,
            attribution: &mut self.source_attribution,
        };

        layer.set("steps", &mut self.defaults.steps, cli.steps);
        layer.set("trajectory_len", &mut self.defaults.trajectory_len, cli.trajectory_len);
        layer.set("success_message", &mut self.defaults.success_message, cli.success_message.clone());
        layer.set("sentinel", &mut self.defaults.sentinel, cli.sentinel.clone());
        layer.set("execution_timeout", &mut self.defaults.execution_timeout, cli.execution_timeout);
        layer.set("project_name", &mut self.project.name, cli.project_name.clone());
        layer.set("project_root", &mut self.project.root, cli.project_root.clone());
        layer.set(
            "language",
            &mut self.project.language,
            cli.language.as_deref().map(Language::parse),
        );
        layer.set("runner_program", &mut self.runner.program, cli.runner_program.clone());
        layer.set("llm_provider", &mut self.llm.provider, cli.provider.clone());
        layer.set("openrouter_model", &mut self.llm.openrouter.model, cli.model.clone());
    }
}
