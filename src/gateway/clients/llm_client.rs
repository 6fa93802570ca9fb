//! Provider-agnostic LLM chat client abstraction.
//!
//! `send_message` / `send_message_stream` return a pinned chunk stream;
//! there is no native tool-calling surface here, since agents never hand
//! tool schemas to the model.

use async_trait::async_trait;
use futures_util::stream::Stream;
use std::error::Error;
use std::pin::Pin;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct MessageChunk {
    pub content: String,
    pub finish_reason: Option<String>,
}

pub type MessageChunkStream =
    Pin<Box<dyn Stream<Item = Result<MessageChunk, Box<dyn Error + Send + Sync>>> + Send>>;

/// A chat completion provider. Implementations must be safe to share across
/// concurrent requests (§5 "The LLM and HTTP clients are safe for
/// concurrent use"). `token` is the caller's own bearer credential,
/// extracted per-request from the inbound transport (§3) — it is the
/// credential presented upstream, not a secondary authorization check.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Full request/response call, bounded by the caller's own deadline
    /// (§5: "LLM non-streaming ≤30s").
    async fn send_message(&self, turns: &[ChatTurn], token: &str) -> Result<String, Box<dyn Error + Send + Sync>>;

    /// Streaming call. Returns `None` when the provider (or this
    /// implementation) has no streaming support, in which case the caller
    /// falls back to `send_message`.
    async fn send_message_stream(
        &self,
        turns: &[ChatTurn],
        token: &str,
    ) -> Result<Option<MessageChunkStream>, Box<dyn Error + Send + Sync>>;
}
