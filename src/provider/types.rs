//! Request and response shapes for OpenAI-compatible chat completions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::{Message, ToolCall};

/// A function the model may call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelToolSpec {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionSpec,
}

impl ModelToolSpec {
    pub fn function(function: FunctionSpec) -> Self {
        Self {
            kind: "function".to_string(),
            function,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema of the arguments.
    pub parameters: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    Auto,
}

/// One model pass.
///
/// `tools: None` disables tool calling for the pass; nothing tool-related is
/// sent on the wire.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system_prompt: String,
    pub conversation: Vec<Message>,
    pub tools: Option<Vec<ModelToolSpec>>,
    pub tool_choice: Option<ToolChoice>,
}

impl ChatRequest {
    /// A pass that may call `tools` at the model's discretion.
    pub fn with_tools(
        system_prompt: impl Into<String>,
        conversation: Vec<Message>,
        tools: Vec<ModelToolSpec>,
    ) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            conversation,
            tools: Some(tools),
            tool_choice: Some(ToolChoice::Auto),
        }
    }

    /// A pass with tools disabled.
    pub fn text_only(system_prompt: impl Into<String>, conversation: Vec<Message>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            conversation,
            tools: None,
            tool_choice: None,
        }
    }
}

/// The first choice's message, reduced to what the loop reads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

impl ModelResponse {
    #[cfg(test)]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    #[cfg(test)]
    pub fn calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            content: String::new(),
            tool_calls,
        }
    }

    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CompletionBody<'a> {
    pub model: &'a str,
    pub temperature: f32,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<&'a [ModelToolSpec]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<ToolChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Choice {
    #[serde(default)]
    pub message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelList {
    #[serde(default)]
    pub data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ModelEntry {
    pub id: String,
}
