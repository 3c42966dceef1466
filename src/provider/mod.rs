//! Chat model access for notifly.
//!
//! Talks to an OpenAI-compatible server directly so each pass controls its
//! own tool set and `tool_choice`. The orchestration loop only sees the
//! [`ChatModel`] trait.

mod client;
mod listing;
pub mod types;

pub use client::{ChatModel, ModelClient, ModelSettings};
pub use listing::list_models;
pub use types::{ChatRequest, ModelToolSpec};
#[cfg(test)]
pub use types::{ModelResponse, ToolChoice};
