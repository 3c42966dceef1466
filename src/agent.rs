//! The orchestration loop.
//!
//! [`Orchestrator::run`] turns one conversation into one reply: it opens a
//! tool session, lets the model call tools for up to
//! [`MAX_TOOL_ITERATIONS`] passes, then produces the user-facing text on
//! exactly one of three paths (final pass, deterministic fallback, or
//! direct answer). The tool session is closed on every exit.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::{Map, Value};
use tracing::Instrument;

use crate::constants::{
    CLARIFICATION_QUESTION, DIRECT_PASS_INSTRUCTIONS, FALLBACK_CLOSING, FALLBACK_PREAMBLE,
    FALLBACK_TOOL, FINAL_PASS_INSTRUCTIONS, MAX_TOOL_ITERATIONS,
};
use crate::deadline::Deadline;
use crate::error::OrchestrationError;
use crate::logging::clip;
use crate::mcp::gateway::{self, ToolOutput};
use crate::mcp::{ToolConnector, ToolProvider};
use crate::message::{last_user_text, Message};
use crate::provider::{ChatModel, ChatRequest, ModelToolSpec};
use crate::router;
use crate::tools::model_adapter::to_model_tools;

/// Immutable settings shared by every invocation.
#[derive(Debug, Clone)]
pub struct OrchestrationSettings {
    /// Locator of the tool-process script.
    pub script_path: Option<PathBuf>,
    /// Most recent turns kept as working history.
    pub history_limit: usize,
    /// Wall-clock budget, counted from the first model pass.
    pub timeout: Duration,
}

/// Input of one invocation.
#[derive(Debug, Clone)]
pub struct OrchestrationRequest {
    pub owner_id: String,
    pub system_prompt: String,
    pub conversation: Vec<Message>,
    /// Reference day for "hoje", "amanhã" and "ontem".
    pub today: NaiveDate,
}

/// Which path produced the reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyPath {
    /// The model used tools; a final pass wrote the answer.
    ToolAnswer,
    /// The day listing was fetched directly and summarized.
    Fallback,
    /// A listing request without a resolvable day.
    Clarification,
    /// No tool was needed.
    Direct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub path: ReplyPath,
}

impl Reply {
    fn new(text: impl AsRef<str>, path: ReplyPath) -> Self {
        Self {
            text: text.as_ref().trim().to_string(),
            path,
        }
    }
}

pub struct Orchestrator {
    model: Arc<dyn ChatModel>,
    connector: Arc<dyn ToolConnector>,
    settings: OrchestrationSettings,
}

impl Orchestrator {
    pub fn new(
        model: Arc<dyn ChatModel>,
        connector: Arc<dyn ToolConnector>,
        settings: OrchestrationSettings,
    ) -> Self {
        Self {
            model,
            connector,
            settings,
        }
    }

    /// Runs one invocation end to end.
    pub async fn run(&self, request: OrchestrationRequest) -> Result<Reply, OrchestrationError> {
        let invocation = uuid::Uuid::new_v4().simple().to_string();
        let short_id = &invocation[..8];
        let span = tracing::info_span!("invocation", id = %short_id, owner = %request.owner_id);
        self.run_inner(request).instrument(span).await
    }

    async fn run_inner(&self, request: OrchestrationRequest) -> Result<Reply, OrchestrationError> {
        let started = std::time::Instant::now();
        if request.owner_id.trim().is_empty() {
            return Err(OrchestrationError::Configuration(
                "owner id is empty".to_string(),
            ));
        }
        let script_path = self.settings.script_path.as_deref().ok_or_else(|| {
            OrchestrationError::Configuration("tool server script path is not set".to_string())
        })?;

        tracing::info!(script = %script_path.display(), turns = request.conversation.len(), "connecting to tool process");
        let mut provider = self
            .connector
            .connect(script_path)
            .await
            .map_err(|e| OrchestrationError::ToolProcessUnavailable(format!("{:#}", e)))?;

        let mut tool_calls = 0;
        let outcome = self
            .drive(provider.as_mut(), &request, &mut tool_calls)
            .await
            .map_err(|e| e.after_tool_calls(tool_calls));

        if let Err(e) = provider.close().await {
            tracing::warn!(error = %format!("{:#}", e), "closing tool session failed");
        }

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(reply) => tracing::info!(path = ?reply.path, elapsed_ms, reply = %clip(&reply.text), "done"),
            Err(e) => tracing::error!(error = %e, elapsed_ms, "failed"),
        }
        outcome
    }

    async fn drive(
        &self,
        provider: &mut dyn ToolProvider,
        request: &OrchestrationRequest,
        tool_calls: &mut usize,
    ) -> Result<Reply, OrchestrationError> {
        let descriptors = provider
            .list_tools()
            .await
            .map_err(|e| OrchestrationError::ToolProcessUnavailable(format!("{:#}", e)))?;
        let tools = to_model_tools(&descriptors);
        tracing::info!(
            tools = ?descriptors.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(),
            "tools discovered"
        );

        let base = truncate_history(&request.conversation, self.settings.history_limit);
        let last_user = last_user_text(&request.conversation);
        tracing::debug!(last_user = %clip(last_user), "routing input");

        let deadline = Deadline::arm(self.settings.timeout);
        self.tool_loop(provider, request, &base, &tools, &deadline, tool_calls)
            .await?;
        let used_tool = *tool_calls > 0;

        if !used_tool && router::should_force_fallback(last_user) {
            return self
                .fallback(provider, request, last_user, &deadline)
                .await;
        }

        if used_tool {
            tracing::info!("final pass");
            let prompt = [request.system_prompt.as_str(), "", FINAL_PASS_INSTRUCTIONS].join("\n");
            let response = self
                .model
                .chat_once(ChatRequest::text_only(prompt, base), &deadline)
                .await?;
            return Ok(Reply::new(response.content, ReplyPath::ToolAnswer));
        }

        tracing::info!("no tool used, direct pass");
        let prompt = format!("{}\n\n{}", request.system_prompt, DIRECT_PASS_INSTRUCTIONS);
        let response = self
            .model
            .chat_once(ChatRequest::text_only(prompt, base), &deadline)
            .await?;
        Ok(Reply::new(response.content, ReplyPath::Direct))
    }

    /// Tool-enabled passes. Counts every call the model requested in
    /// `tool_calls`, including ones that failed.
    async fn tool_loop(
        &self,
        provider: &mut dyn ToolProvider,
        request: &OrchestrationRequest,
        base: &[Message],
        tools: &[ModelToolSpec],
        deadline: &Deadline,
        tool_calls: &mut usize,
    ) -> Result<(), OrchestrationError> {
        let mut conversation = base.to_vec();

        for pass in 1..=MAX_TOOL_ITERATIONS {
            if deadline.is_expired() {
                return Err(OrchestrationError::Timeout(deadline.budget()));
            }
            tracing::debug!(pass, turns = conversation.len(), "tool pass");
            let response = self
                .model
                .chat_once(
                    ChatRequest::with_tools(
                        request.system_prompt.clone(),
                        conversation.clone(),
                        tools.to_vec(),
                    ),
                    deadline,
                )
                .await?;

            if !response.has_tool_calls() {
                tracing::debug!(pass, content = %clip(&response.content), "no tool calls");
                break;
            }

            let calls = response.tool_calls.clone();
            conversation.push(Message::assistant_tool_calls(
                response.content,
                response.tool_calls,
            ));

            for call in &calls {
                let args = call.function.arguments.parse();
                *tool_calls += 1;
                let output = self
                    .invoke(provider, call.name(), args, &request.owner_id, deadline)
                    .await?;
                conversation.push(Message::tool_result(
                    call.id.clone(),
                    call.name(),
                    output.to_json(),
                ));
            }
        }
        Ok(())
    }

    /// Calls a tool, turning a failed call into a synthetic result.
    async fn invoke(
        &self,
        provider: &mut dyn ToolProvider,
        name: &str,
        args: Map<String, Value>,
        owner_id: &str,
        deadline: &Deadline,
    ) -> Result<ToolOutput, OrchestrationError> {
        match gateway::call_tool(provider, name, args, owner_id, deadline).await {
            Ok(output) => Ok(output),
            Err(OrchestrationError::ToolInvocation { tool, cause }) => {
                tracing::warn!(tool = %tool, cause = %clip(&cause), "tool call failed");
                Ok(ToolOutput::failure(&tool, &cause))
            }
            Err(e) => Err(e),
        }
    }

    async fn fallback(
        &self,
        provider: &mut dyn ToolProvider,
        request: &OrchestrationRequest,
        last_user: &str,
        deadline: &Deadline,
    ) -> Result<Reply, OrchestrationError> {
        let Some(date) = router::infer_date(last_user, request.today) else {
            tracing::warn!("fallback without a resolvable date, asking for clarification");
            return Ok(Reply::new(CLARIFICATION_QUESTION, ReplyPath::Clarification));
        };
        tracing::warn!(%date, "model skipped tools on a listing request, calling {} directly", FALLBACK_TOOL);

        let mut args = Map::new();
        args.insert("date".to_string(), Value::String(date.to_string()));
        let output = self
            .invoke(provider, FALLBACK_TOOL, args, &request.owner_id, deadline)
            .await?;

        let heading = format!("Resultado {} (date={}):", FALLBACK_TOOL, date);
        let result = output.to_json();
        let prompt = [
            request.system_prompt.as_str(),
            "",
            FALLBACK_PREAMBLE,
            "",
            heading.as_str(),
            result.as_str(),
            "",
            FALLBACK_CLOSING,
        ]
        .join("\n");

        let response = self
            .model
            .chat_once(ChatRequest::text_only(prompt, Vec::new()), deadline)
            .await?;
        Ok(Reply::new(response.content, ReplyPath::Fallback))
    }
}

/// Keeps the `limit` most recent turns.
pub fn truncate_history(conversation: &[Message], limit: usize) -> Vec<Message> {
    if conversation.len() <= limit {
        return conversation.to_vec();
    }
    tracing::warn!(from = conversation.len(), to = limit, "truncating history");
    conversation[conversation.len() - limit..].to_vec()
}

#[cfg(test)]
mod tests;
