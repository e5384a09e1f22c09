//! Capability flags advertised by STT/LLM/TTS/Realtime providers. The
//! fallback adapter and the session layer use these to decide what a
//! provider can be asked to do, never by sniffing a provider id.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolSupport {
    None,
    Basic,
    StrictJson,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmCapabilities {
    pub supports_tools: ToolSupport,
    pub supports_streaming: bool,
    pub supports_json_mode: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_window_tokens: Option<u32>,
}

impl Default for LlmCapabilities {
    fn default() -> Self {
        Self {
            supports_tools: ToolSupport::None,
            supports_streaming: false,
            supports_json_mode: false,
            context_window_tokens: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SttCapabilities {
    pub streaming: bool,
    pub interim_results: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TtsCapabilities {
    pub streaming: bool,
    /// Word-level timestamps (`TimedString`) available alongside audio.
    pub aligned_transcript: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RealtimeCapabilities {
    pub message_truncation: bool,
    pub turn_detection: bool,
    pub user_transcription: bool,
    pub auto_tool_reply_generation: bool,
    pub audio_output: bool,
}
