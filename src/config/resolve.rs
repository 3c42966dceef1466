//! Environment substitution, overrides, and the settings handed to the core.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use super::types::Config;
use crate::agent::OrchestrationSettings;
use crate::constants::{
    DEFAULT_LM_BASE_URL, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT, DEFAULT_TOOL_COMMAND,
    DISPATCH_HISTORY_LIMIT_DEFAULT, DISPATCH_MAX_ATTEMPTS_DEFAULT,
    DISPATCH_QUEUE_CAPACITY_DEFAULT, HISTORY_LIMIT_DEFAULT, ORCHESTRATION_TIMEOUT_SECS_DEFAULT,
    STORE_FILENAME,
};
use crate::dispatch::DispatchSettings;
use crate::provider::ModelSettings;

/// Fallback identity when no assistant user id is configured.
const ASSISTANT_ID_DEFAULT: &str = "notifly";

/// Log filter when none is configured.
const LOG_LEVEL_DEFAULT: &str = "warn";

impl Config {
    /// Resolve {env:VAR_NAME} patterns in string fields.
    /// A field that resolves to an empty string is treated as unset.
    pub(super) fn resolve_substitutions(&mut self) {
        for field in self.string_fields_mut() {
            Self::resolve_opt(field);
        }
        if let Some(args) = self.tool_server.args.as_mut() {
            for arg in args.iter_mut() {
                *arg = Self::resolve_str(arg);
            }
        }
    }

    fn string_fields_mut(&mut self) -> [&mut Option<String>; 8] {
        [
            &mut self.assistant.user_id,
            &mut self.assistant.system_prompt,
            &mut self.model.base_url,
            &mut self.model.model,
            &mut self.tool_server.command,
            &mut self.tool_server.script_path,
            &mut self.store.path,
            &mut self.log.level,
        ]
    }

    fn resolve_opt(field: &mut Option<String>) {
        if let Some(value) = field.as_deref() {
            let resolved = Self::resolve_str(value);
            *field = if resolved.trim().is_empty() {
                None
            } else {
                Some(resolved)
            };
        }
    }

    /// Replace {env:VAR} with the environment variable value.
    fn resolve_str(s: &str) -> String {
        let mut result = s.to_string();
        while let Some(start) = result.find("{env:") {
            if let Some(end) = result[start..].find('}') {
                let var_name = &result[start + 5..start + end];
                let value = std::env::var(var_name).unwrap_or_default();
                result = format!(
                    "{}{}{}",
                    &result[..start],
                    value,
                    &result[start + end + 1..]
                );
            } else {
                break;
            }
        }
        result
    }

    /// Applies the well-known environment overrides. Empty values are ignored.
    pub(super) fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let overrides: [(&str, &mut Option<String>); 4] = [
            ("NOTIFLY_USER_ID", &mut self.assistant.user_id),
            ("LMSTUDIO_BASE_URL", &mut self.model.base_url),
            ("LMSTUDIO_MODEL", &mut self.model.model),
            ("MCP_SERVER_SCRIPT_PATH", &mut self.tool_server.script_path),
        ];
        for (var, field) in overrides {
            if let Some(value) = lookup(var).filter(|v| !v.trim().is_empty()) {
                *field = Some(value);
            }
        }
    }

    pub fn assistant_id(&self) -> &str {
        self.assistant.user_id.as_deref().unwrap_or(ASSISTANT_ID_DEFAULT)
    }

    pub fn system_prompt(&self) -> &str {
        self.assistant
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(LOG_LEVEL_DEFAULT)
    }

    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            base_url: self
                .model
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_LM_BASE_URL.to_string()),
            model: self
                .model
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        }
    }

    pub fn tool_command(&self) -> &str {
        self.tool_server
            .command
            .as_deref()
            .unwrap_or(DEFAULT_TOOL_COMMAND)
    }

    pub fn tool_args(&self) -> Vec<String> {
        self.tool_server.args.clone().unwrap_or_default()
    }

    pub fn script_path(&self) -> Option<PathBuf> {
        self.tool_server.script_path.as_ref().map(PathBuf::from)
    }

    /// Settings for the orchestration loop, fixed for the process lifetime.
    pub fn orchestration_settings(&self) -> OrchestrationSettings {
        OrchestrationSettings {
            script_path: self.script_path(),
            history_limit: self
                .orchestration
                .history_limit
                .unwrap_or(HISTORY_LIMIT_DEFAULT),
            timeout: Duration::from_secs(
                self.orchestration
                    .timeout_secs
                    .unwrap_or(ORCHESTRATION_TIMEOUT_SECS_DEFAULT),
            ),
        }
    }

    pub fn dispatch_settings(&self) -> DispatchSettings {
        DispatchSettings {
            assistant_id: self.assistant_id().to_string(),
            system_prompt: self.system_prompt().to_string(),
            max_attempts: self
                .dispatch
                .max_attempts
                .unwrap_or(DISPATCH_MAX_ATTEMPTS_DEFAULT),
            history_limit: self
                .dispatch
                .history_limit
                .unwrap_or(DISPATCH_HISTORY_LIMIT_DEFAULT),
            queue_capacity: self
                .dispatch
                .queue_capacity
                .unwrap_or(DISPATCH_QUEUE_CAPACITY_DEFAULT),
        }
    }

    /// Task file path: configured, else `tasks.json` in the data directory.
    pub fn store_path(&self) -> Result<PathBuf> {
        match self.store.path.as_deref() {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(Self::data_dir()?.join(STORE_FILENAME)),
        }
    }
}
