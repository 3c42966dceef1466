//! Conversation types for notifly.
//!
//! [`Message`] is one conversation turn in the OpenAI-compatible wire shape,
//! so a conversation can be replayed to the model verbatim on every pass.
//! [`ToolCall`] keeps the model's arguments exactly as they arrived and
//! offers a total [`ToolArguments::parse`] for the loop.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Arguments supplied by the model for a tool call.
///
/// Some servers send a JSON-encoded string, others an object. Both are kept
/// as received so the assistant turn can be echoed back unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolArguments {
    Structured(Map<String, Value>),
    Raw(String),
}

impl Default for ToolArguments {
    fn default() -> Self {
        Self::Raw(String::new())
    }
}

impl ToolArguments {
    /// Returns the arguments as a JSON object.
    ///
    /// Never fails: an empty, unparseable, or non-object payload yields an
    /// empty map.
    pub fn parse(&self) -> Map<String, Value> {
        match self {
            Self::Structured(map) => map.clone(),
            Self::Raw(raw) if raw.trim().is_empty() => Map::new(),
            Self::Raw(raw) => match serde_json::from_str::<Value>(raw) {
                Ok(Value::Object(map)) => map,
                _ => Map::new(),
            },
        }
    }
}

/// Function name and arguments of a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_arguments")]
    pub arguments: ToolArguments,
}

/// Accepts any JSON value for `arguments`; non-object, non-string values
/// are kept as their JSON text and later parse to an empty map.
fn lenient_arguments<'de, D>(deserializer: D) -> Result<ToolArguments, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => ToolArguments::Structured(map),
        Value::String(raw) => ToolArguments::Raw(raw),
        Value::Null => ToolArguments::default(),
        other => ToolArguments::Raw(other.to_string()),
    })
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Correlation id echoed back on the matching tool turn.
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,
    pub function: FunctionCall,
}

fn function_kind() -> String {
    "function".to_string()
}

impl ToolCall {
    #[cfg(test)]
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: ToolArguments) -> Self {
        Self {
            id: id.into(),
            kind: function_kind(),
            function: FunctionCall {
                name: name.into(),
                arguments,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.function.name
    }
}

/// The role of a message sender in the conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A single conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Message {
    fn plain(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: text.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            name: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::plain(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, text)
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::plain(Role::System, text)
    }

    /// An assistant turn recording the tool calls the model emitted.
    pub fn assistant_tool_calls(text: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::plain(Role::Assistant, text)
        }
    }

    /// Creates a tool result message to feed back to the model.
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            name: Some(name.into()),
            ..Self::plain(Role::Tool, content)
        }
    }

    pub fn text(&self) -> &str {
        &self.content
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "notifly"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// Returns the text of the last `user` turn, or an empty string.
pub fn last_user_text(messages: &[Message]) -> &str {
    messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(Message::text)
        .unwrap_or_default()
}
