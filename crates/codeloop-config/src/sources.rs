use std::collections::BTreeMap;

use crate::model::{Config, ConfigSource};

/// Every attributed configuration key.
pub(crate) const KEYS: &[&str] = &[
    "steps",
    "trajectory_len",
    "success_message",
    "sentinel",
    "execution_timeout",
    "project_name",
    "project_root",
    "language",
    "runner_program",
    "runner_args",
    "pre_command",
    "llm_provider",
    "openrouter_api_key_env",
    "openrouter_model",
    "openrouter_base_url",
    "openrouter_max_tokens",
    "openrouter_temperature",
    "openrouter_timeout",
];

impl Config {
    fn source_label(&self, key: &str) -> String {
        self.source_attribution
            .get(key)
            .unwrap_or(&ConfigSource::Default)
            .label()
            .to_string()
    }

    /// Key → (value, source label) for every attributed key.
    #[must_use]
    pub fn effective_config(&self) -> BTreeMap<String, (String, String)> {
        let openrouter = &self.llm.openrouter;
        let values: [(&str, String); 18] = [
            ("steps", self.defaults.steps.to_string()),
            ("trajectory_len", self.defaults.trajectory_len.to_string()),
            ("success_message", self.defaults.success_message.clone()),
            ("sentinel", self.defaults.sentinel.clone()),
            ("execution_timeout", self.defaults.execution_timeout.to_string()),
            ("project_name", self.project.name.clone()),
            ("project_root", self.project.root.display().to_string()),
            ("language", self.project.language.to_string()),
            ("runner_program", self.runner.program.clone()),
            ("runner_args", self.runner.args.join(" ")),
            ("pre_command", self.runner.pre_command.join(" ")),
            ("llm_provider", self.llm.provider.clone()),
            ("openrouter_api_key_env", openrouter.api_key_env.clone()),
            ("openrouter_model", openrouter.model.clone()),
            (
                "openrouter_base_url",
                openrouter.base_url.clone().unwrap_or_default(),
            ),
            ("openrouter_max_tokens", openrouter.max_tokens.to_string()),
            ("openrouter_temperature", openrouter.temperature.to_string()),
            ("openrouter_timeout", openrouter.timeout.to_string()),
        ];

        values
            .into_iter()
            .map(|(key, value)| (key.to_string(), (value, self.source_label(key))))
            .collect()
    }
}
