//! Model session client.
//!
//! One [`ChatModel::chat_once`] call is one non-streaming completion against
//! an OpenAI-compatible server (LM Studio, Ollama). Sampling is fixed so the
//! tool loop stays deterministic.

use async_trait::async_trait;

use super::types::{ChatRequest, CompletionBody, CompletionResponse, ModelResponse};
use crate::constants::{MAX_TOKENS, TEMPERATURE};
use crate::deadline::Deadline;
use crate::error::OrchestrationError;
use crate::logging::clip;
use crate::message::Message;

/// A model that answers one request with one response. No retries.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat_once(
        &self,
        request: ChatRequest,
        deadline: &Deadline,
    ) -> Result<ModelResponse, OrchestrationError>;
}

/// Endpoint and model id, fixed for the life of the process.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub base_url: String,
    pub model: String,
}

impl ModelSettings {
    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

pub struct ModelClient {
    http: reqwest::Client,
    settings: ModelSettings,
}

impl ModelClient {
    pub fn new(settings: ModelSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            settings,
        }
    }

    async fn send(&self, request: &ChatRequest) -> Result<ModelResponse, OrchestrationError> {
        let mut messages = Vec::with_capacity(request.conversation.len() + 1);
        messages.push(Message::system(request.system_prompt.clone()));
        messages.extend(request.conversation.iter().cloned());

        let body = CompletionBody {
            model: &self.settings.model,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            messages,
            tools: request.tools.as_deref(),
            tool_choice: request.tool_choice,
        };

        let url = self.settings.url("/v1/chat/completions");
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| OrchestrationError::EndpointUnavailable(format!("{}: {}", url, e)))?;

        let status = response.status();
        let body_text = response
            .text()
            .await
            .map_err(|e| OrchestrationError::EndpointUnavailable(e.to_string()))?;

        if !status.is_success() {
            return Err(OrchestrationError::Protocol {
                status: status.as_u16(),
                body: body_text,
            });
        }

        parse_completion(&body_text)
    }
}

#[async_trait]
impl ChatModel for ModelClient {
    async fn chat_once(
        &self,
        request: ChatRequest,
        deadline: &Deadline,
    ) -> Result<ModelResponse, OrchestrationError> {
        tracing::debug!(
            model = %self.settings.model,
            turns = request.conversation.len(),
            tools = request.tools.as_ref().map_or(0, Vec::len),
            "chat completion"
        );
        deadline.run(self.send(&request)).await?
    }
}

/// Extracts the first choice's message from a completion body.
pub(crate) fn parse_completion(body: &str) -> Result<ModelResponse, OrchestrationError> {
    let parsed: CompletionResponse = serde_json::from_str(body).map_err(|e| {
        OrchestrationError::MalformedResponse(format!("{}: {}", e, clip(body)))
    })?;

    let message = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .ok_or_else(|| {
            OrchestrationError::MalformedResponse(format!(
                "missing choices[0].message: {}",
                clip(body)
            ))
        })?;

    Ok(ModelResponse {
        content: message.content.unwrap_or_default(),
        tool_calls: message.tool_calls.unwrap_or_default(),
    })
}
