//! VAD integration contract (§4.6 overview, §4.7.2): a low-latency
//! speech-start/speech-stop signal, independent of STT, used to gate
//! interruptions during agent playout. The concrete classifier (energy-based
//! or ONNX) is an external collaborator; this crate only defines the stream
//! shape a scheduler consumes.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use va_streams::AudioFrame;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VadEventType {
    StartOfSpeech,
    EndOfSpeech,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VadEvent {
    pub event_type: VadEventType,
    /// Probability the classifier assigned at the frame that triggered this
    /// event, when the implementation exposes one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<f32>,
    pub timestamp_ms: i64,
}

/// A live VAD session: audio frames go in, start/end-of-speech events come
/// out. Mirrors [`crate::stt`]-style streaming contracts so a scheduler can
/// drive STT and VAD symmetrically.
#[async_trait]
pub trait VadStream: Send {
    async fn push_frame(&mut self, frame: AudioFrame);
    /// `None` once the stream has ended cleanly.
    async fn recv(&mut self) -> Option<VadEvent>;
    async fn close(&mut self);
}

#[async_trait]
pub trait VadModel: Send + Sync {
    async fn stream(&self) -> VadStreamHandle;
    fn provider_id(&self) -> &str;
}

pub type VadStreamHandle = Box<dyn VadStream>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serializes_with_snake_case_type() {
        let event = VadEvent {
            event_type: VadEventType::StartOfSpeech,
            probability: Some(0.92),
            timestamp_ms: 1000,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"start_of_speech\""));
    }
}
