//! TTS provider contract (§4.5): one-shot `synthesize` and incremental
//! `stream` modes. `aligned_transcript` capability gates whether chunks
//! carry word-level `TimedString` timestamps (§4.9 consumes these).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use va_domain::capability::TtsCapabilities;
use va_streams::AudioFrame;

use crate::error::Result;

/// A word (or short phrase) with its playback time range, as emitted by a
/// TTS provider that supports `aligned_transcript`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimedString {
    pub text: String,
    pub start_time_ms: u64,
    pub end_time_ms: u64,
}

#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub frame: AudioFrame,
    /// Present only when the provider advertises `aligned_transcript`.
    pub timed_strings: Vec<TimedString>,
}

/// A one-shot synthesis result: the caller pulls frames until `None`.
#[async_trait]
pub trait ChunkedStream: Send {
    async fn next(&mut self) -> Option<Result<SynthesizedAudio>>;
}

/// An incremental session: text segments go in, audio frames come out in
/// synthesis order, preserving alignment (§5 ordering guarantees).
#[async_trait]
pub trait SynthesizeStream: Send {
    async fn push_text(&mut self, text: &str) -> Result<()>;
    /// Signals no more text is coming for the current utterance; the
    /// stream should flush and eventually yield `None` from `next`.
    async fn flush(&mut self) -> Result<()>;
    async fn next(&mut self) -> Option<Result<SynthesizedAudio>>;
    async fn close(&mut self);
}

#[async_trait]
pub trait TtsProvider: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Box<dyn ChunkedStream>>;
    async fn stream(&self) -> Result<Box<dyn SynthesizeStream>>;
    fn capabilities(&self) -> &TtsCapabilities;
    fn provider_id(&self) -> &str;
}
