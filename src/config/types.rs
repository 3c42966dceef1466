//! Struct definitions for notifly configuration.
//!
//! Every leaf is optional so a project file can override single values of
//! the global one. Defaults are applied by the accessors in `resolve.rs`.

use serde::{Deserialize, Serialize};

/// Root configuration, deserialized from `config.toml`.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub assistant: AssistantConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub tool_server: ToolServerConfig,
    #[serde(default)]
    pub orchestration: OrchestrationConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Identity and voice of the assistant.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct AssistantConfig {
    /// Chat user id the assistant posts as. Its own messages never trigger it.
    pub user_id: Option<String>,
    /// System prompt for every invocation.
    pub system_prompt: Option<String>,
}

/// OpenAI-compatible model server.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ModelConfig {
    pub base_url: Option<String>,
    /// Model identifier as the server names it.
    pub model: Option<String>,
}

/// How the tool process is launched: `command args... script_path`.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ToolServerConfig {
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
    pub script_path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct OrchestrationConfig {
    /// Most recent conversation turns sent to the model.
    pub history_limit: Option<usize>,
    /// Wall-clock budget per invocation, in seconds.
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct DispatchConfig {
    pub max_attempts: Option<u32>,
    /// Chat messages loaded per dispatch.
    pub history_limit: Option<usize>,
    pub queue_capacity: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct StoreConfig {
    /// Task file served by `notifly tool-server`.
    pub path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct LogConfig {
    /// `tracing` filter directive, e.g. `info` or `notifly=debug`.
    pub level: Option<String>,
}
