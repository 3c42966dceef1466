//! Inbound message dispatch.
//!
//! A new human message in a chat the assistant takes part in is handed to a
//! bounded queue. One worker drains it: it loads recent history, runs the
//! orchestrator on behalf of the sender, and posts the reply back into the
//! chat as the assistant. Failures are logged, retried, and counted.

use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::agent::{OrchestrationRequest, Orchestrator};
use crate::error::OrchestrationError;
use crate::message::Message;

/// Message type that may trigger the assistant.
pub const MESSAGE_TYPE_TEXT: &str = "text";

/// A stored chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub chat_id: String,
    pub sender_id: String,
    pub kind: String,
    pub text: String,
}

impl ChatMessage {
    pub fn text(
        chat_id: impl Into<String>,
        sender_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            chat_id: chat_id.into(),
            sender_id: sender_id.into(),
            kind: MESSAGE_TYPE_TEXT.to_string(),
            text: text.into(),
        }
    }
}

/// Where chat history comes from and replies go to.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// The `limit` most recent messages of a chat, oldest first.
    async fn recent_messages(&self, chat_id: &str, limit: usize) -> Result<Vec<ChatMessage>>;

    async fn post_message(&self, message: ChatMessage) -> Result<()>;
}

/// Process-local chat history.
#[derive(Default)]
pub struct MemoryChatStore {
    messages: Mutex<Vec<ChatMessage>>,
}

impl MemoryChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages of `chat_id`, oldest first.
    pub fn messages(&self, chat_id: &str) -> Vec<ChatMessage> {
        self.messages
            .lock()
            .map(|all| all.iter().filter(|m| m.chat_id == chat_id).cloned().collect())
            .unwrap_or_default()
    }

    pub fn push(&self, message: ChatMessage) -> Result<()> {
        self.messages
            .lock()
            .map_err(|_| anyhow!("Chat store lock poisoned"))?
            .push(message);
        Ok(())
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    async fn recent_messages(&self, chat_id: &str, limit: usize) -> Result<Vec<ChatMessage>> {
        let all = self.messages(chat_id);
        let skip = all.len().saturating_sub(limit);
        Ok(all.into_iter().skip(skip).collect())
    }

    async fn post_message(&self, message: ChatMessage) -> Result<()> {
        self.push(message)
    }
}

/// True when `message` must wake the assistant.
///
/// Only text messages with content, from someone other than the assistant,
/// in a chat the assistant participates in. The sender check keeps the
/// assistant from answering itself.
pub fn should_dispatch(message: &ChatMessage, participants: &[String], assistant_id: &str) -> bool {
    message.kind == MESSAGE_TYPE_TEXT
        && !message.text.trim().is_empty()
        && message.sender_id != assistant_id
        && participants.iter().any(|p| p == assistant_id)
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub assistant_id: String,
    pub system_prompt: String,
    /// Attempts per job, including the first.
    pub max_attempts: u32,
    /// Chat messages loaded as history.
    pub history_limit: usize,
    pub queue_capacity: usize,
}

/// Outcome counts, returned when the queue closes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub received: u64,
    pub delivered: u64,
    pub failed: u64,
    pub retries: u64,
}

/// Producer side of the dispatch queue.
///
/// The worker stops once every clone has been dropped.
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::Sender<ChatMessage>,
    assistant_id: String,
}

impl Dispatcher {
    /// Starts the worker.
    pub fn spawn(
        orchestrator: Arc<Orchestrator>,
        store: Arc<dyn ChatStore>,
        settings: DispatchSettings,
    ) -> (Self, JoinHandle<DispatchStats>) {
        let (tx, rx) = mpsc::channel(settings.queue_capacity.max(1));
        let dispatcher = Self {
            tx,
            assistant_id: settings.assistant_id.clone(),
        };
        let worker = Worker {
            orchestrator,
            store,
            settings,
        };
        let handle = tokio::spawn(worker.run(rx));
        (dispatcher, handle)
    }

    /// Enqueues `message` if it should trigger the assistant.
    ///
    /// Returns whether a job was queued. Waits while the queue is full.
    pub async fn notify(&self, message: ChatMessage, participants: &[String]) -> Result<bool> {
        if !should_dispatch(&message, participants, &self.assistant_id) {
            tracing::debug!(chat = %message.chat_id, sender = %message.sender_id, "not dispatched");
            return Ok(false);
        }
        self.tx
            .send(message)
            .await
            .map_err(|_| anyhow!("Dispatch worker has stopped"))?;
        Ok(true)
    }
}

struct Worker {
    orchestrator: Arc<Orchestrator>,
    store: Arc<dyn ChatStore>,
    settings: DispatchSettings,
}

impl Worker {
    async fn run(self, mut rx: mpsc::Receiver<ChatMessage>) -> DispatchStats {
        let mut stats = DispatchStats::default();
        while let Some(message) = rx.recv().await {
            stats.received += 1;
            self.handle(message, &mut stats).await;
        }
        tracing::info!(
            received = stats.received,
            delivered = stats.delivered,
            failed = stats.failed,
            retries = stats.retries,
            "dispatch queue closed"
        );
        stats
    }

    async fn handle(&self, message: ChatMessage, stats: &mut DispatchStats) {
        let max_attempts = self.settings.max_attempts.max(1);

        let mut attempt = 1;
        let reply = loop {
            match self.answer(&message, Local::now().date_naive()).await {
                Ok(reply) => break reply,
                Err(e) => {
                    let retryable = e
                        .downcast_ref::<OrchestrationError>()
                        .map_or(true, OrchestrationError::is_retryable);
                    tracing::error!(
                        chat = %message.chat_id,
                        attempt,
                        max_attempts,
                        retryable,
                        error = %format!("{:#}", e),
                        "dispatch failed"
                    );
                    if !retryable || attempt == max_attempts {
                        stats.failed += 1;
                        return;
                    }
                    stats.retries += 1;
                    attempt += 1;
                }
            }
        };

        if reply.is_empty() {
            tracing::warn!(chat = %message.chat_id, "empty reply, nothing posted");
            stats.delivered += 1;
            return;
        }

        // Only the post is repeated here; the answer is never recomputed.
        for attempt in 1..=max_attempts {
            match self.post(&message.chat_id, &reply).await {
                Ok(()) => {
                    stats.delivered += 1;
                    return;
                }
                Err(e) => {
                    tracing::error!(
                        chat = %message.chat_id,
                        attempt,
                        max_attempts,
                        error = %format!("{:#}", e),
                        "posting reply failed"
                    );
                    if attempt < max_attempts {
                        stats.retries += 1;
                    }
                }
            }
        }
        stats.failed += 1;
    }

    /// Loads history and runs the orchestrator for `message`.
    async fn answer(&self, message: &ChatMessage, today: NaiveDate) -> Result<String> {
        let history = self
            .store
            .recent_messages(&message.chat_id, self.settings.history_limit)
            .await
            .context("Failed to load chat history")?;

        let conversation = history
            .iter()
            .filter(|m| m.kind == MESSAGE_TYPE_TEXT && !m.text.trim().is_empty())
            .map(|m| {
                if m.sender_id == self.settings.assistant_id {
                    Message::assistant(m.text.clone())
                } else {
                    Message::user(m.text.clone())
                }
            })
            .collect();

        let reply = self
            .orchestrator
            .run(OrchestrationRequest {
                owner_id: message.sender_id.clone(),
                system_prompt: self.settings.system_prompt.clone(),
                conversation,
                today,
            })
            .await?;
        Ok(reply.text)
    }

    async fn post(&self, chat_id: &str, text: &str) -> Result<()> {
        self.store
            .post_message(ChatMessage::text(
                chat_id,
                self.settings.assistant_id.clone(),
                text,
            ))
            .await
            .context("Failed to post reply")
    }
}
