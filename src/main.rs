//! Entry point for notifly, a chat task assistant backed by a local LLM.
//!
//! This binary loads environment variables, parses CLI arguments via [`cli`],
//! and dispatches to the appropriate subcommand handler.

mod agent;
mod cli;
mod config;
mod constants;
mod deadline;
mod dispatch;
mod error;
mod logging;
mod mcp;
mod message;
mod output;
mod provider;
mod router;
mod store;
mod tools;

use anyhow::Result;

/// Runs the notifly CLI.
///
/// Loads `.env` files (silently ignored if absent), parses command-line
/// arguments into a [`cli::Cli`] struct, and dispatches the chosen
/// subcommand via [`cli::run`].
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = cli::parse();
    cli::run(cli).await
}
