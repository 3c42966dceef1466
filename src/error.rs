//! Error taxonomy for one orchestration invocation.
//!
//! Only [`OrchestrationError::ToolInvocation`] is recoverable inside the loop
//! (it becomes a synthetic tool result). Every other variant aborts the
//! invocation after the tool session has been closed.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestrationError {
    /// Missing owner identity or tool-process locator. Never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The tool process could not be spawned, handshaken, or listed.
    #[error("tool process unavailable: {0}")]
    ToolProcessUnavailable(String),

    /// The model endpoint could not be reached.
    #[error("model endpoint unavailable: {0}")]
    EndpointUnavailable(String),

    /// The model endpoint answered with a non-success status.
    #[error("model endpoint returned HTTP {status}: {body}")]
    Protocol { status: u16, body: String },

    /// The model endpoint answered without a usable first choice.
    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    /// A single tool call failed.
    #[error("tool '{tool}' failed: {cause}")]
    ToolInvocation { tool: String, cause: String },

    /// The invocation's wall-clock budget ran out.
    #[error("orchestration timed out after {0:?}")]
    Timeout(Duration),

    /// Any of the above, raised after the model's tool calls already ran.
    /// The calls may have changed data, so the job is not run again.
    #[error("{source} (after {tool_calls} tool call(s))")]
    AfterToolCalls {
        tool_calls: usize,
        source: Box<OrchestrationError>,
    },
}

impl OrchestrationError {
    pub fn tool(tool: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        Self::ToolInvocation {
            tool: tool.into(),
            cause: cause.to_string(),
        }
    }

    /// Marks `self` as raised after `tool_calls` model-requested calls.
    pub fn after_tool_calls(self, tool_calls: usize) -> Self {
        if tool_calls == 0 || matches!(self, Self::AfterToolCalls { .. }) {
            return self;
        }
        Self::AfterToolCalls {
            tool_calls,
            source: Box::new(self),
        }
    }

    /// The underlying failure, without the tool-call marker.
    pub fn root(&self) -> &Self {
        match self {
            Self::AfterToolCalls { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether a dispatcher may try the same job again.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::Configuration(_) | Self::AfterToolCalls { .. }
        )
    }
}
