//! Abstract STT/LLM/TTS/Realtime provider contracts (§4.5), the
//! multi-provider fallback adapters, and the provider error taxonomy (§7).
//! No concrete provider implementations live here — those are external
//! collaborators per the spec's non-goals.

pub mod error;
pub mod fallback;
pub mod llm;
pub mod realtime;
pub mod stt;
pub mod tts;

pub use error::{ApiError, Result};
pub use fallback::{AvailabilityChanged, FallbackLlm, FallbackStt, FallbackTts};
pub use llm::{ChatChunk, ChatDelta, ChatRequest, ConnectOptions, LlmProvider, LlmStream, ToolCallDelta, ToolChoice};
pub use realtime::{GenerationCreatedEvent, RealtimeModel, RealtimeSession};
pub use stt::{Alternative, SpeechEvent, SpeechEventType, SpeechStream, SttProvider};
pub use tts::{ChunkedStream, SynthesizeStream, SynthesizedAudio, TimedString, TtsProvider};
