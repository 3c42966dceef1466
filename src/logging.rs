//! Tracing setup.
//!
//! Logs always go to stderr: in `tool-server` mode stdout carries the MCP
//! protocol stream.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

use crate::constants::LOG_PAYLOAD_MAX;

/// Installs the global subscriber. `RUST_LOG` wins over `default_level`.
pub fn init(default_level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("Invalid log level '{}': {}", default_level, e))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}

/// Shortens a payload for a log line, keeping char boundaries intact.
pub fn clip(s: &str) -> String {
    if s.chars().count() <= LOG_PAYLOAD_MAX {
        return s.to_string();
    }
    let head: String = s.chars().take(LOG_PAYLOAD_MAX).collect();
    format!("{}... (truncated, len={})", head, s.len())
}
