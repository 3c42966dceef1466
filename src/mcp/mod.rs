//! Tool-process boundary.
//!
//! The orchestration loop only sees [`ToolProvider`] and [`ToolConnector`];
//! [`client`] implements them over a spawned stdio MCP process and
//! [`server`] is the process side notifly ships itself.

pub mod client;
pub mod gateway;
pub mod prompts;
pub mod protocol;
pub mod server;

use std::path::Path;

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

pub use protocol::ToolDescriptor;

/// A live session with a tool-providing process.
#[async_trait]
pub trait ToolProvider: Send {
    /// Tools the process offers, in its native schema.
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>>;

    /// Invokes a tool and returns the raw `tools/call` result.
    async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<Value>;

    /// Releases the session. Called exactly once per session.
    async fn close(&mut self) -> Result<()>;
}

/// Opens a fresh [`ToolProvider`] session for one invocation.
#[async_trait]
pub trait ToolConnector: Send + Sync {
    async fn connect(&self, script_path: &Path) -> Result<Box<dyn ToolProvider>>;
}
