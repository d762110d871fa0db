use codeloop_utils::ConfigError;

use crate::model::Config;

const SUPPORTED_PROVIDERS: &[&str] = &["openrouter"];

fn invalid(key: &str, value: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.into(),
    }
}

impl Config {
    /// Check resolved values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.defaults.steps == 0 {
            return Err(invalid("steps", "must be greater than 0"));
        }
        if self.defaults.success_message.is_empty() {
            return Err(invalid("success_message", "must not be empty"));
        }
        if self.defaults.sentinel.trim().is_empty() {
            return Err(invalid("sentinel", "must not be empty"));
        }
        if self.defaults.execution_timeout == 0 {
            return Err(invalid("execution_timeout", "must be greater than 0"));
        }
        if self.project.name.trim().is_empty() {
            return Err(invalid("project_name", "must not be empty"));
        }
        if self.runner.program.trim().is_empty() {
            return Err(invalid("runner_program", "must not be empty"));
        }
        if !SUPPORTED_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(invalid(
                "llm_provider",
                format!(
                    "'{}' is not supported (expected one of: {})",
                    self.llm.provider,
                    SUPPORTED_PROVIDERS.join(", ")
                ),
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.openrouter.temperature) {
            return Err(invalid("openrouter_temperature", "must be between 0.0 and 2.0"));
        }
        Ok(())
    }
}
