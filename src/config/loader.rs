//! File loading and merging for notifly configuration.

use anyhow::{Context, Result};
use std::fs;

use super::types::{
    AssistantConfig, Config, DispatchConfig, LogConfig, ModelConfig, OrchestrationConfig,
    StoreConfig, ToolServerConfig,
};
use crate::constants::{
    DEFAULT_LM_BASE_URL, DEFAULT_MODEL, DEFAULT_TOOL_COMMAND, PROJECT_CONFIG_FILENAME,
};

/// Written on first run.
fn default_toml() -> String {
    format!(
        r#"[assistant]
user_id = "{{env:NOTIFLY_USER_ID}}"

[model]
base_url = "{base_url}"
model = "{model}"

[tool_server]
command = "{command}"
script_path = "{{env:MCP_SERVER_SCRIPT_PATH}}"

[log]
level = "warn"
"#,
        base_url = DEFAULT_LM_BASE_URL,
        model = DEFAULT_MODEL,
        command = DEFAULT_TOOL_COMMAND,
    )
}

impl Config {
    /// Loads the global config from `~/.config/notifly/config.toml`.
    ///
    /// If no config file exists, creates one with defaults (including
    /// `{env:VAR}` placeholders) and returns it.
    pub(super) fn load_global() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            let default_toml = default_toml();
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, &default_toml)
                .with_context(|| format!("Failed to write default config to {:?}", path))?;
            tracing::info!(path = %path.display(), "wrote default config");
            return Self::parse(&default_toml).context("Failed to parse default config");
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config at {:?}", path))
    }

    /// Look for notifly.toml in current dir, then walk up to git root.
    pub(super) fn load_project() -> Result<Option<Config>> {
        let mut dir = std::env::current_dir()?;
        loop {
            let candidate = dir.join(PROJECT_CONFIG_FILENAME);
            if candidate.exists() {
                let contents = fs::read_to_string(&candidate)?;
                let config = Self::parse(&contents)
                    .with_context(|| format!("Failed to parse config at {:?}", candidate))?;
                return Ok(Some(config));
            }
            // Stop at git root or filesystem root
            if dir.join(".git").exists() || !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    pub(super) fn parse(contents: &str) -> Result<Config> {
        Ok(toml::from_str(contents)?)
    }

    /// Merge project config over global config.
    /// Project values win when present.
    pub(super) fn merge(global: Config, project: Config) -> Config {
        Config {
            assistant: AssistantConfig {
                user_id: project.assistant.user_id.or(global.assistant.user_id),
                system_prompt: project
                    .assistant
                    .system_prompt
                    .or(global.assistant.system_prompt),
            },
            model: ModelConfig {
                base_url: project.model.base_url.or(global.model.base_url),
                model: project.model.model.or(global.model.model),
            },
            tool_server: ToolServerConfig {
                command: project.tool_server.command.or(global.tool_server.command),
                args: project.tool_server.args.or(global.tool_server.args),
                script_path: project
                    .tool_server
                    .script_path
                    .or(global.tool_server.script_path),
            },
            orchestration: OrchestrationConfig {
                history_limit: project
                    .orchestration
                    .history_limit
                    .or(global.orchestration.history_limit),
                timeout_secs: project
                    .orchestration
                    .timeout_secs
                    .or(global.orchestration.timeout_secs),
            },
            dispatch: DispatchConfig {
                max_attempts: project.dispatch.max_attempts.or(global.dispatch.max_attempts),
                history_limit: project
                    .dispatch
                    .history_limit
                    .or(global.dispatch.history_limit),
                queue_capacity: project
                    .dispatch
                    .queue_capacity
                    .or(global.dispatch.queue_capacity),
            },
            store: StoreConfig {
                path: project.store.path.or(global.store.path),
            },
            log: LogConfig {
                level: project.log.level.or(global.log.level),
            },
        }
    }
}

#[cfg(test)]
pub(super) fn default_toml_for_tests() -> String {
    default_toml()
}
