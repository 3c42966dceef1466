//! Command-line interface definition and dispatch for notifly.
//!
//! Uses [`clap`] for argument parsing with derive macros. Each subcommand is
//! routed to its handler. Task management lives in the [`task`] submodule.

mod task;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::agent::Orchestrator;
use crate::config::Config;
use crate::dispatch::{ChatMessage, Dispatcher, MemoryChatStore};
use crate::mcp::client::McpSession;
use crate::mcp::client::StdioConnector;
use crate::mcp::server::ToolServer;
use crate::mcp::ToolProvider;
use crate::provider::{self, ModelClient};
use crate::store::TaskStore;
use crate::tools::model_adapter::to_model_tools;
use crate::tools::ToolRegistry;
use crate::{logging, output};

/// Top-level CLI structure for notifly.
#[derive(Parser)]
#[command(
    name = "notifly",
    version,
    about = "Task assistant that drives a local LLM through MCP tools"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the notifly CLI.
///
/// The `///` doc comments on variants double as `--help` text.
#[derive(Subcommand)]
pub enum Commands {
    /// Send one chat message to the assistant and print its reply
    Ask {
        /// The message to send
        prompt: Vec<String>,
        /// Chat user sending the message (owner of the tasks)
        #[arg(short, long, env = "NOTIFLY_OWNER_ID", default_value = "local-user")]
        user: String,
        /// Chat the message belongs to
        #[arg(long, default_value = "cli")]
        chat: String,
    },
    /// Connect to the tool server and list the tools offered to the model
    Tools,
    /// List models served by the model endpoint
    Models,
    /// Serve the task tools over MCP on stdin/stdout
    ToolServer {
        /// Task file (defaults to the configured store)
        store: Option<std::path::PathBuf>,
    },
    /// Manage tasks directly, without the assistant
    Task {
        /// Owner of the tasks
        #[arg(short, long, env = "NOTIFLY_OWNER_ID", default_value = "local-user", global = true)]
        user: String,
        #[command(subcommand)]
        action: task::TaskAction,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Subcommands for the `config` command.
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective config
    Show,
}

/// Parses command-line arguments into a [`Cli`] struct.
pub fn parse() -> Cli {
    Cli::parse()
}

/// Dispatches the parsed CLI command to its handler.
pub async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    logging::init(config.log_level())?;

    match cli.command {
        Commands::Ask { prompt, user, chat } => {
            let prompt = prompt.join(" ");
            if prompt.trim().is_empty() {
                anyhow::bail!("No prompt provided. Usage: notifly ask \"quais minhas tarefas de hoje?\"");
            }
            ask(&config, &user, &chat, &prompt).await
        }
        Commands::Tools => list_tools(&config).await,
        Commands::Models => {
            let settings = config.model_settings();
            let models = provider::list_models(&settings).await?;
            output::render_models(&settings.base_url, &settings.model, &models);
            Ok(())
        }
        Commands::ToolServer { store } => {
            let path = match store {
                Some(path) => path,
                None => config.store_path()?,
            };
            serve_tools(path).await
        }
        Commands::Task { user, action } => {
            let store = TaskStore::open(config.store_path()?)?;
            task::handle_task(&store, &user, action)
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let path = Config::config_path()?;
                println!("{} {}", "Config path:".bold(), path.display());
                println!();
                println!("{}", config.to_toml()?);
                Ok(())
            }
        },
    }
}

/// Runs one message through the same queue a chat backend would use.
async fn ask(config: &Config, user: &str, chat: &str, prompt: &str) -> Result<()> {
    let model = Arc::new(ModelClient::new(config.model_settings()));
    let connector = Arc::new(StdioConnector::new(config.tool_command(), config.tool_args()));
    let orchestrator = Arc::new(Orchestrator::new(
        model,
        connector,
        config.orchestration_settings(),
    ));

    let settings = config.dispatch_settings();
    let assistant_id = settings.assistant_id.clone();
    let store = Arc::new(MemoryChatStore::new());
    let inbound = ChatMessage::text(chat, user, prompt);
    store.push(inbound.clone())?;

    let (dispatcher, worker) = Dispatcher::spawn(orchestrator, store.clone(), settings);
    let participants = vec![user.to_string(), assistant_id.clone()];
    let queued = dispatcher.notify(inbound, &participants).await?;
    drop(dispatcher);
    let stats = worker.await.context("Dispatch worker panicked")?;

    if !queued {
        anyhow::bail!("Message was not dispatched (is '{}' the assistant's own id?)", user);
    }
    if stats.delivered == 0 {
        anyhow::bail!("The assistant could not answer. Run with RUST_LOG=notifly=debug for details.");
    }

    let reply = store
        .messages(chat)
        .into_iter()
        .rev()
        .find(|m| m.sender_id == assistant_id)
        .map(|m| m.text)
        .unwrap_or_default();
    output::render_exchange(user, prompt, &reply);
    Ok(())
}

async fn list_tools(config: &Config) -> Result<()> {
    let script_path = config
        .script_path()
        .context("tool_server.script_path is not set (or set MCP_SERVER_SCRIPT_PATH)")?;
    let mut session =
        McpSession::spawn(config.tool_command(), &config.tool_args(), &script_path).await?;
    let listed = session.list_tools().await;
    let server = session.server_name().to_string();
    if let Err(e) = session.close().await {
        tracing::warn!(error = %e, "closing tool session failed");
    }
    output::render_tools(&server, &to_model_tools(&listed?));
    Ok(())
}

async fn serve_tools(path: std::path::PathBuf) -> Result<()> {
    let store = Arc::new(TaskStore::open(&path)?);
    tracing::info!(store = %store.path().display(), "tool server starting");
    let server = ToolServer::new(ToolRegistry::with_task_tools(store));
    server.serve(tokio::io::stdin(), tokio::io::stdout()).await
}
