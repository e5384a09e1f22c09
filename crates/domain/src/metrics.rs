//! Metric record shapes (§3, §4.10). Each provider's metrics channel emits
//! one of these variants; the session republishes them on its own channel
//! so a caller's usage collector can fold them without depending on the
//! provider crate directly.

use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum MetricRecord {
    #[serde(rename = "stt_metrics")]
    Stt {
        label: String,
        timestamp_ms: i64,
        request_id: String,
        duration_ms: Option<u64>,
        audio_duration_ms: Option<u64>,
    },
    #[serde(rename = "llm_metrics")]
    Llm {
        label: String,
        timestamp_ms: i64,
        request_id: String,
        duration_ms: Option<u64>,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    },
    #[serde(rename = "tts_metrics")]
    Tts {
        label: String,
        timestamp_ms: i64,
        request_id: String,
        duration_ms: Option<u64>,
        characters: Option<u32>,
        ttfb_ms: Option<u64>,
    },
    #[serde(rename = "vad_metrics")]
    Vad {
        label: String,
        timestamp_ms: i64,
        request_id: String,
        duration_ms: Option<u64>,
    },
    #[serde(rename = "eou_metrics")]
    Eou {
        label: String,
        timestamp_ms: i64,
        request_id: String,
        duration_ms: Option<u64>,
        probability: Option<f32>,
    },
    #[serde(rename = "realtime_model_metrics")]
    RealtimeModel {
        label: String,
        timestamp_ms: i64,
        request_id: String,
        duration_ms: Option<u64>,
        input_tokens: Option<u32>,
        output_tokens: Option<u32>,
    },
}

impl MetricRecord {
    pub fn request_id(&self) -> &str {
        match self {
            MetricRecord::Stt { request_id, .. }
            | MetricRecord::Llm { request_id, .. }
            | MetricRecord::Tts { request_id, .. }
            | MetricRecord::Vad { request_id, .. }
            | MetricRecord::Eou { request_id, .. }
            | MetricRecord::RealtimeModel { request_id, .. } => request_id,
        }
    }

    /// Emit as a structured tracing event, JSON-encoded (mirrors the
    /// teacher's `TraceEvent::emit()` so every metric is visible in logs
    /// even with no collector attached).
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(metric = %json, "metrics_collected");
    }
}
