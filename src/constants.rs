//! Centralized constants for notifly.
//!
//! All magic numbers, default strings, and prompt fragments live here
//! so they can be changed in one place.

/// Application name used in CLI output and directory paths.
pub const APP_NAME: &str = "notifly";

/// Configuration filename.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Per-project configuration filename.
pub const PROJECT_CONFIG_FILENAME: &str = "notifly.toml";

/// Default task store filename under the data directory.
pub const STORE_FILENAME: &str = "tasks.json";

// --- Model endpoint ---

/// Default base URL for the local LM Studio server.
pub const DEFAULT_LM_BASE_URL: &str = "http://127.0.0.1:1234";

/// Default model identifier served by LM Studio.
pub const DEFAULT_MODEL: &str = "qwen/qwen3-4b-2507";

/// Sampling temperature for every pass. Zero keeps replies reproducible.
pub const TEMPERATURE: f32 = 0.0;

/// Maximum output tokens for every pass.
pub const MAX_TOKENS: u32 = 600;

// --- Orchestration ---

/// Maximum number of tool-calling model passes per invocation.
pub const MAX_TOOL_ITERATIONS: usize = 3;

/// Number of most recent conversation turns kept as working history.
pub const HISTORY_LIMIT_DEFAULT: usize = 12;

/// Wall-clock budget for one invocation, measured from loop entry.
pub const ORCHESTRATION_TIMEOUT_SECS_DEFAULT: u64 = 30;

/// The one tool the deterministic fallback may call.
pub const FALLBACK_TOOL: &str = "listDay";

/// Argument name that carries the caller identity on every tool call.
pub const OWNER_ID_FIELD: &str = "owner_id";

/// Maximum characters of a payload echoed into a log line.
pub const LOG_PAYLOAD_MAX: usize = 2000;

// --- Tool process ---

/// Default command used to launch the tool process.
pub const DEFAULT_TOOL_COMMAND: &str = "node";

/// MCP protocol revision announced during the handshake.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Name reported by the tool client during the handshake.
pub const MCP_CLIENT_NAME: &str = "notifly-mcp-host";

/// Name reported by the tool server during the handshake.
pub const MCP_SERVER_NAME: &str = "NotiFly MCP Server";

// --- Dispatch ---

/// Default number of delivery attempts per dispatch job.
pub const DISPATCH_MAX_ATTEMPTS_DEFAULT: u32 = 2;

/// Default number of chat messages fetched as history.
pub const DISPATCH_HISTORY_LIMIT_DEFAULT: usize = 50;

/// Default capacity of the dispatch queue.
pub const DISPATCH_QUEUE_CAPACITY_DEFAULT: usize = 64;

// --- Prompts ---

/// Default system prompt for the assistant.
pub const DEFAULT_SYSTEM_PROMPT: &str = "Você é o NotiFly, um assistente de tarefas e agenda. \
Responda em português do Brasil, de forma curta e objetiva. \
Use as ferramentas disponíveis para consultar, criar ou concluir tarefas do usuário.";

/// Question returned when the fallback cannot pin down a date.
pub const CLARIFICATION_QUESTION: &str =
    "Qual data exatamente? (ex: 11/12/2025, hoje, ontem, amanhã)";

/// Appended to the system prompt for the final pass after tool use.
pub const FINAL_PASS_INSTRUCTIONS: &str = "Agora responda APENAS com a resposta final ao usuário.\n\
Não mencione JSON, tool_calls, MCP, nem detalhes técnicos.\n\
Não chame ferramentas.";

/// Appended to the system prompt when no tool was needed.
pub const DIRECT_PASS_INSTRUCTIONS: &str = "Responda normalmente, sem chamar ferramentas.";

/// Opening of the fallback prompt, placed before the literal tool result.
pub const FALLBACK_PREAMBLE: &str = "A tool MCP já foi executada. Use APENAS o resultado abaixo para responder.\n\
Não invente tarefas. Se estiver vazio, diga que não há tarefas.";

/// Closing line of the fallback prompt.
pub const FALLBACK_CLOSING: &str = "Responda somente com a resposta final ao usuário (pt-BR).";
