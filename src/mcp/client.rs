//! Stdio MCP client.
//!
//! Spawns the tool process, performs the `initialize` handshake, and issues
//! line-delimited JSON-RPC requests. Lines that are not a response to the
//! pending request (server logs, notifications) are skipped.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};

use super::protocol::{
    JsonRpcRequest, JsonRpcResponse, ToolDescriptor, METHOD_INITIALIZE, METHOD_INITIALIZED,
    METHOD_TOOLS_CALL, METHOD_TOOLS_LIST,
};
use super::{ToolConnector, ToolProvider};
use crate::constants::{MCP_CLIENT_NAME, MCP_PROTOCOL_VERSION};

/// Upper bound for a single request/response exchange.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Grace period for the child to exit after its stdin closes.
const EXIT_GRACE: Duration = Duration::from_secs(2);

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
type BoxedReader = BufReader<Box<dyn AsyncRead + Send + Unpin>>;

/// An initialized MCP session.
pub struct McpSession {
    writer: Option<BoxedWriter>,
    reader: BoxedReader,
    child: Option<Child>,
    next_id: u64,
    server_name: String,
}

impl McpSession {
    /// Launches `command args... script_path` and completes the handshake.
    pub async fn spawn(command: &str, args: &[String], script_path: &Path) -> Result<Self> {
        let mut child = Command::new(command)
            .args(args)
            .arg(script_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| {
                format!(
                    "Failed to spawn tool process '{} {}'",
                    command,
                    script_path.display()
                )
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("Failed to capture tool process stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow!("Failed to capture tool process stdout"))?;

        let mut session = Self::from_parts(Box::new(stdout), Box::new(stdin), Some(child));
        session.handshake().await?;
        Ok(session)
    }

    /// Runs a session over arbitrary streams (used for in-process servers).
    #[cfg(test)]
    pub async fn connect<R, W>(reader: R, writer: W) -> Result<Self>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let mut session = Self::from_parts(Box::new(reader), Box::new(writer), None);
        session.handshake().await?;
        Ok(session)
    }

    fn from_parts(
        reader: Box<dyn AsyncRead + Send + Unpin>,
        writer: BoxedWriter,
        child: Option<Child>,
    ) -> Self {
        Self {
            writer: Some(writer),
            reader: BufReader::new(reader),
            child,
            next_id: 1,
            server_name: String::new(),
        }
    }

    /// Name the server reported during the handshake.
    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    async fn handshake(&mut self) -> Result<()> {
        let result = self
            .request(
                METHOD_INITIALIZE,
                Some(json!({
                    "protocolVersion": MCP_PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": MCP_CLIENT_NAME,
                        "version": env!("CARGO_PKG_VERSION"),
                    }
                })),
            )
            .await
            .context("MCP initialize failed")?;

        self.server_name = result
            .pointer("/serverInfo/name")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();

        self.send(&JsonRpcRequest::notification(METHOD_INITIALIZED, None))
            .await?;
        tracing::debug!(server = %self.server_name, "MCP handshake complete");
        Ok(())
    }

    async fn send(&mut self, message: &JsonRpcRequest) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| anyhow!("MCP session already closed"))?;
        let mut line = serde_json::to_string(message)?;
        line.push('\n');
        writer
            .write_all(line.as_bytes())
            .await
            .context("Failed to write to tool process")?;
        writer.flush().await.context("Failed to flush tool process stdin")?;
        Ok(())
    }

    async fn read_response(&mut self, id: u64) -> Result<JsonRpcResponse> {
        let expected = Value::from(id);
        let mut line = String::new();
        loop {
            line.clear();
            let read = self
                .reader
                .read_line(&mut line)
                .await
                .context("Failed to read from tool process")?;
            if read == 0 {
                bail!("Tool process closed its output (it may have crashed)");
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let value: Value = match serde_json::from_str(trimmed) {
                Ok(value) => value,
                Err(_) => {
                    tracing::debug!(line = %trimmed, "skipping non-JSON tool process output");
                    continue;
                }
            };
            if value.get("method").is_some() || value.get("id") != Some(&expected) {
                continue;
            }
            return serde_json::from_value(value).context("Malformed JSON-RPC response");
        }
    }

    /// Sends a request and waits for its result.
    ///
    /// A JSON-RPC error object is returned as `Err`.
    pub async fn request(&mut self, method: &str, params: Option<Value>) -> Result<Value> {
        let id = self.next_id;
        self.next_id += 1;

        self.send(&JsonRpcRequest::new(id, method, params)).await?;
        let response = tokio::time::timeout(REQUEST_TIMEOUT, self.read_response(id))
            .await
            .map_err(|_| anyhow!("Timed out waiting for '{}' response", method))??;

        if let Some(error) = response.error {
            bail!("{} failed: [{}] {}", method, error.code, error.message);
        }
        Ok(response.result.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl ToolProvider for McpSession {
    async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>> {
        let result = self.request(METHOD_TOOLS_LIST, None).await?;
        let tools = result.get("tools").cloned().unwrap_or(Value::Array(Vec::new()));
        serde_json::from_value(tools).context("Malformed tools/list result")
    }

    async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<Value> {
        self.request(
            METHOD_TOOLS_CALL,
            Some(json!({ "name": name, "arguments": arguments })),
        )
        .await
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.shutdown().await.ok();
        }
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        match tokio::time::timeout(EXIT_GRACE, child.wait()).await {
            Ok(status) => {
                let status = status.context("Failed to reap tool process")?;
                tracing::debug!(%status, "tool process exited");
            }
            Err(_) => {
                child.kill().await.context("Failed to kill tool process")?;
                tracing::debug!("tool process killed after grace period");
            }
        }
        Ok(())
    }
}

/// Opens one [`McpSession`] per invocation by spawning a child process.
pub struct StdioConnector {
    command: String,
    args: Vec<String>,
}

impl StdioConnector {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

#[async_trait]
impl ToolConnector for StdioConnector {
    async fn connect(&self, script_path: &Path) -> Result<Box<dyn ToolProvider>> {
        let session = McpSession::spawn(&self.command, &self.args, script_path).await?;
        tracing::debug!(server = %session.server_name(), "tool process connected");
        Ok(Box::new(session))
    }
}
