//! LLM provider contract (§4.5): `chat` streams `ChatChunk`s over the
//! conversation's `ChatContext`, optionally constrained by a `ToolContext`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use va_domain::capability::LlmCapabilities;
use va_domain::stream::BoxStream;
use va_domain::{ChatContext, ToolContext};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    Auto,
    None,
    Required,
}

/// Per-call connection options (§5): the provider call's own timeout,
/// independent of any retry policy the fallback adapter layers on top.
#[derive(Debug, Clone, Copy)]
pub struct ConnectOptions {
    pub timeout_ms: u64,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

/// Owns (cheaply, via `Arc`) everything a provider needs for one call —
/// not borrowed, so a fallback adapter can re-issue the same request
/// against a different provider from inside a `'static` forwarding stream.
#[derive(Clone)]
pub struct ChatRequest {
    pub chat_ctx: Arc<ChatContext>,
    pub tool_ctx: Option<Arc<ToolContext>>,
    pub tool_choice: ToolChoice,
    pub conn_options: ConnectOptions,
    /// Provider-specific extras (model name, temperature, ...), opaque here.
    pub extra: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolCallDelta {
    pub call_id: String,
    pub name: String,
    /// JSON-encoded arguments, possibly a partial fragment mid-stream.
    pub args: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<va_domain::chat::Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallDelta>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatChunk {
    pub id: String,
    pub delta: ChatDelta,
}

pub type LlmStream = BoxStream<'static, Result<ChatChunk>>;

#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, req: ChatRequest) -> Result<LlmStream>;
    fn capabilities(&self) -> &LlmCapabilities;
    fn provider_id(&self) -> &str;
}
