//! Tool invocation gateway.
//!
//! The only path from the orchestration loop to a tool. It stamps the
//! caller's identity on every call, whatever the model supplied.

use serde::Serialize;
use serde_json::{Map, Value};

use super::protocol::{CallToolResult, ContentBlock};
use super::ToolProvider;
use crate::constants::OWNER_ID_FIELD;
use crate::deadline::Deadline;
use crate::error::OrchestrationError;
use crate::logging::clip;

/// What a tool call produced, as handed back to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolOutput {
    /// The `content` blocks of a `tools/call` result.
    Content(Vec<ContentBlock>),
    /// A result without a usable `content` field, passed through untouched.
    Raw(Value),
}

impl ToolOutput {
    /// Synthetic result recorded in place of a failed call.
    pub fn failure(tool: &str, cause: &str) -> Self {
        Self::Content(vec![ContentBlock::text(format!(
            "Erro ao executar {}: {}",
            tool, cause
        ))])
    }

    /// JSON text placed in the `tool` turn.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "[]".to_string())
    }

    fn from_result(result: Value) -> Self {
        match result.get("content") {
            Some(content) => match serde_json::from_value(content.clone()) {
                Ok(blocks) => Self::Content(blocks),
                Err(_) => Self::Raw(content.clone()),
            },
            None => Self::Raw(result),
        }
    }
}

/// Invokes `name` with `args`, forcing `args.owner_id = owner_id`.
///
/// Transport failures and tool-side errors become
/// [`OrchestrationError::ToolInvocation`]; an expired deadline becomes
/// [`OrchestrationError::Timeout`].
pub async fn call_tool(
    provider: &mut dyn ToolProvider,
    name: &str,
    mut args: Map<String, Value>,
    owner_id: &str,
    deadline: &Deadline,
) -> Result<ToolOutput, OrchestrationError> {
    args.insert(OWNER_ID_FIELD.to_string(), Value::String(owner_id.to_string()));
    let arguments = Value::Object(args);
    tracing::debug!(tool = name, arguments = %clip(&arguments.to_string()), "tools/call");

    let started = std::time::Instant::now();
    let result = deadline
        .run(provider.call_tool(name, arguments))
        .await?
        .map_err(|e| OrchestrationError::tool(name, format!("{:#}", e)))?;

    if result.get("isError").and_then(Value::as_bool) == Some(true) {
        let parsed: CallToolResult = serde_json::from_value(result.clone()).unwrap_or_default();
        let cause = parsed
            .content
            .iter()
            .filter_map(|b| b.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n");
        return Err(OrchestrationError::tool(name, cause));
    }

    tracing::debug!(
        tool = name,
        elapsed_ms = started.elapsed().as_millis() as u64,
        result = %clip(&result.to_string()),
        "tools/call ok"
    );
    Ok(ToolOutput::from_result(result))
}
