//! Stdio MCP server exposing the task tools.
//!
//! Reads one JSON-RPC message per line and writes one response per request.
//! Notifications get no response. Runs until the input closes.

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use super::prompts;
use super::protocol::{
    CallToolResult, JsonRpcRequest, JsonRpcResponse, INVALID_PARAMS, INVALID_REQUEST,
    JSONRPC_VERSION, METHOD_INITIALIZE, METHOD_NOT_FOUND, METHOD_PING,
    METHOD_PROMPTS_GET, METHOD_PROMPTS_LIST, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST, PARSE_ERROR,
};
use crate::constants::{MCP_PROTOCOL_VERSION, MCP_SERVER_NAME};
use crate::logging::clip;
use crate::tools::{ToolRegistry, ToolResult};

pub struct ToolServer {
    registry: ToolRegistry,
}

impl ToolServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// Handles one message. Returns `None` for notifications.
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id else {
            tracing::debug!(method = %request.method, "notification");
            return None;
        };
        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::failure(
                Some(id),
                INVALID_REQUEST,
                format!("Unsupported jsonrpc version '{}'", request.jsonrpc),
            ));
        }

        let params = request.params.unwrap_or(Value::Null);
        let response = match request.method.as_str() {
            METHOD_INITIALIZE => JsonRpcResponse::success(Some(id), self.initialize()),
            METHOD_PING => JsonRpcResponse::success(Some(id), json!({})),
            METHOD_TOOLS_LIST => JsonRpcResponse::success(
                Some(id),
                json!({ "tools": self.registry.definitions() }),
            ),
            METHOD_TOOLS_CALL => match self.call_tool(params).await {
                Ok(result) => JsonRpcResponse::success(Some(id), result),
                Err(message) => JsonRpcResponse::failure(Some(id), INVALID_PARAMS, message),
            },
            METHOD_PROMPTS_LIST => JsonRpcResponse::success(
                Some(id),
                json!({ "prompts": prompts::descriptors() }),
            ),
            METHOD_PROMPTS_GET => {
                let name = params.get("name").and_then(Value::as_str).unwrap_or_default();
                let arguments = params.get("arguments").cloned().unwrap_or(json!({}));
                match prompts::render(name, arguments) {
                    Ok(result) => JsonRpcResponse::success(Some(id), result),
                    Err(e) => JsonRpcResponse::failure(Some(id), INVALID_PARAMS, e.to_string()),
                }
            }
            other => JsonRpcResponse::failure(
                Some(id),
                METHOD_NOT_FOUND,
                format!("Method not found: {}", other),
            ),
        };
        Some(response)
    }

    fn initialize(&self) -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false },
                "prompts": { "listChanged": false }
            },
            "serverInfo": {
                "name": MCP_SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    /// Runs a tool. Execution failures come back as `isError` content so the
    /// caller sees the cause; only a missing tool name is a protocol error.
    async fn call_tool(&self, params: Value) -> Result<Value, String> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| "tools/call requires a 'name'".to_string())?;
        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));
        tracing::info!(tool = name, arguments = %clip(&arguments.to_string()), "tools/call");

        let result = match self.registry.execute(name, arguments).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "tool failed");
                ToolResult::error(format!("{:#}", e))
            }
        };
        serde_json::to_value(CallToolResult::from(result)).map_err(|e| e.to_string())
    }

    /// Serves line-delimited JSON-RPC until `reader` reaches EOF.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await.context("Failed to read request")? {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
                Ok(request) => self.handle(request).await,
                Err(e) => {
                    tracing::warn!(error = %e, line = %clip(trimmed), "unparseable request");
                    Some(JsonRpcResponse::failure(None, PARSE_ERROR, e.to_string()))
                }
            };

            if let Some(response) = response {
                let mut out = serde_json::to_string(&response)?;
                out.push('\n');
                writer.write_all(out.as_bytes()).await?;
                writer.flush().await?;
            }
        }
        tracing::debug!("input closed, tool server stopping");
        Ok(())
    }
}
