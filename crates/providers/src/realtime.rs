//! Realtime model contract (§4.5): a bidirectional session combining
//! STT+LLM+TTS into a single provider. Capability flags gate which of the
//! optional verbs (`truncate`, `start_user_activity`, ...) are meaningful —
//! callers check `capabilities()` rather than matching on a provider id.

use async_trait::async_trait;

use va_domain::capability::RealtimeCapabilities;
use va_domain::ChatContext;
use va_streams::AudioFrame;

use crate::error::Result;
use crate::llm::LlmStream;

/// Emitted when the realtime model begins producing a new generation —
/// either in response to committed audio or an explicit `generate_reply`.
pub struct GenerationCreatedEvent {
    pub message_stream: LlmStream,
    /// `true` if the generation was triggered by the model itself (e.g. an
    /// automatic tool-reply) rather than by an explicit caller request.
    pub user_initiated: bool,
}

#[async_trait]
pub trait RealtimeSession: Send {
    async fn push_audio(&mut self, frame: AudioFrame) -> Result<()>;
    /// Commits buffered audio as a completed user turn, triggering a reply
    /// if the model doesn't have server-side turn detection enabled.
    async fn commit_audio(&mut self) -> Result<()>;
    /// Discards buffered, uncommitted audio (e.g. on interruption).
    async fn clear_audio(&mut self) -> Result<()>;
    async fn generate_reply(&mut self) -> Result<()>;
    /// Stops the in-flight generation, optionally truncating the assistant
    /// message already played back up to `played_ms`.
    async fn interrupt(&mut self) -> Result<()>;
    async fn truncate(&mut self, message_id: &str, played_ms: u64) -> Result<()>;
    async fn update_chat_ctx(&mut self, chat_ctx: &ChatContext) -> Result<()>;
    async fn update_tools(&mut self, tool_names: &[String]) -> Result<()>;
    async fn update_instructions(&mut self, instructions: &str) -> Result<()>;
    /// Signals the model that the user has started an out-of-band activity
    /// (e.g. a UI action) it should be aware of without new audio.
    async fn start_user_activity(&mut self) -> Result<()>;
    /// Next generation event, or `None` once the session has closed.
    async fn recv(&mut self) -> Option<GenerationCreatedEvent>;
    async fn close(&mut self);
}

#[async_trait]
pub trait RealtimeModel: Send + Sync {
    async fn session(&self) -> Result<Box<dyn RealtimeSession>>;
    fn capabilities(&self) -> &RealtimeCapabilities;
    fn provider_id(&self) -> &str;
}
