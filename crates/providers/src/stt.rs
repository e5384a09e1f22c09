//! STT provider contract (§4.5): a non-streaming `recognize` and a
//! streaming push-frames/pull-events interface.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use va_domain::capability::SttCapabilities;
use va_streams::AudioFrame;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechEventType {
    StartOfSpeech,
    InterimTranscript,
    FinalTranscript,
    RecognitionUsage,
    EndOfSpeech,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alternative {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechEvent {
    pub event_type: SpeechEventType,
    pub alternatives: Vec<Alternative>,
    /// Present on `RECOGNITION_USAGE` events.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_duration_ms: Option<u64>,
}

impl SpeechEvent {
    /// The first alternative's text, or empty if none were returned.
    pub fn text(&self) -> &str {
        self.alternatives.first().map(|a| a.text.as_str()).unwrap_or("")
    }
}

/// A live streaming recognition session: audio frames go in, speech events
/// come out, in provider order (§5 ordering guarantees).
#[async_trait]
pub trait SpeechStream: Send {
    async fn push_frame(&mut self, frame: AudioFrame) -> Result<()>;
    /// `None` once the stream has ended cleanly.
    async fn recv(&mut self) -> Option<Result<SpeechEvent>>;
    async fn close(&mut self);
}

#[async_trait]
pub trait SttProvider: Send + Sync {
    /// One-shot recognition over a complete audio buffer.
    async fn recognize(&self, audio: &[u8], sample_rate: u32, num_channels: u16) -> Result<SpeechEvent>;

    /// Open a streaming recognition session.
    async fn stream(&self) -> Result<Box<dyn SpeechStream>>;

    fn capabilities(&self) -> &SttCapabilities;
    fn provider_id(&self) -> &str;
}
