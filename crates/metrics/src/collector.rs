//! `UsageCollector` (§4.10): folds published `MetricRecord`s into per-model
//! token totals and a running TTS character count. Grounded on the
//! teacher's `SessionEntry` accumulate-on-entry counters
//! (`input_tokens`/`output_tokens`/`total_tokens`), generalized from one
//! session's running total to one entry per model label.

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use va_domain::metrics::MetricRecord;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ModelUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl ModelUsage {
    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens + self.input_tokens + self.output_tokens
    }
}

#[derive(Default)]
struct Totals {
    per_model: HashMap<String, ModelUsage>,
    tts_characters: u64,
}

/// Thread-safe usage accumulator. Intended to be shared (`Arc<UsageCollector>`)
/// between the task draining the bus and the code reading totals for
/// reporting; no persistence is specified.
#[derive(Default)]
pub struct UsageCollector {
    totals: RwLock<Totals>,
}

impl UsageCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one record into the running totals. LLM and realtime-model
    /// records accumulate under `label`'s token counters; TTS records
    /// accumulate character counts. STT/VAD/EOU carry no tokens/characters
    /// to fold and are ignored here (still visible via the bus for logging).
    pub fn fold(&self, record: &MetricRecord) {
        let mut totals = self.totals.write();
        match record {
            MetricRecord::Llm {
                label,
                prompt_tokens,
                completion_tokens,
                ..
            } => {
                let entry = totals.per_model.entry(label.clone()).or_default();
                entry.prompt_tokens += prompt_tokens.unwrap_or(0) as u64;
                entry.completion_tokens += completion_tokens.unwrap_or(0) as u64;
            }
            MetricRecord::RealtimeModel {
                label,
                input_tokens,
                output_tokens,
                ..
            } => {
                let entry = totals.per_model.entry(label.clone()).or_default();
                entry.input_tokens += input_tokens.unwrap_or(0) as u64;
                entry.output_tokens += output_tokens.unwrap_or(0) as u64;
            }
            MetricRecord::Tts { characters, .. } => {
                totals.tts_characters += characters.unwrap_or(0) as u64;
            }
            MetricRecord::Stt { .. } | MetricRecord::Vad { .. } | MetricRecord::Eou { .. } => {}
        }
    }

    pub fn model_usage(&self, label: &str) -> ModelUsage {
        self.totals.read().per_model.get(label).copied().unwrap_or_default()
    }

    pub fn models(&self) -> Vec<String> {
        self.totals.read().per_model.keys().cloned().collect()
    }

    pub fn tts_characters(&self) -> u64 {
        self.totals.read().tts_characters
    }

    /// Drains `rx` until the bus sender is dropped, folding every record as
    /// it arrives. A lagged receiver (subscriber fell behind the bounded
    /// channel) logs a warning and keeps draining from where the channel
    /// resumes rather than treating it as fatal.
    pub async fn run(&self, mut rx: broadcast::Receiver<MetricRecord>) {
        loop {
            match rx.recv().await {
                Ok(record) => self.fold(&record),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "usage collector lagged behind metrics bus");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::MetricsBus;

    #[test]
    fn folds_llm_tokens_per_model() {
        let collector = UsageCollector::new();
        collector.fold(&MetricRecord::Llm {
            label: "gpt-4o".into(),
            timestamp_ms: 0,
            request_id: "r1".into(),
            duration_ms: None,
            prompt_tokens: Some(10),
            completion_tokens: Some(5),
        });
        collector.fold(&MetricRecord::Llm {
            label: "gpt-4o".into(),
            timestamp_ms: 1,
            request_id: "r2".into(),
            duration_ms: None,
            prompt_tokens: Some(3),
            completion_tokens: Some(2),
        });
        let usage = collector.model_usage("gpt-4o");
        assert_eq!(usage.prompt_tokens, 13);
        assert_eq!(usage.completion_tokens, 7);
    }

    #[test]
    fn folds_tts_characters() {
        let collector = UsageCollector::new();
        collector.fold(&MetricRecord::Tts {
            label: "elevenlabs".into(),
            timestamp_ms: 0,
            request_id: "r1".into(),
            duration_ms: None,
            characters: Some(40),
            ttfb_ms: None,
        });
        assert_eq!(collector.tts_characters(), 40);
    }

    #[test]
    fn unfoldable_records_are_ignored_without_error() {
        let collector = UsageCollector::new();
        collector.fold(&MetricRecord::Vad {
            label: "silero".into(),
            timestamp_ms: 0,
            request_id: "r1".into(),
            duration_ms: Some(5),
        });
        assert!(collector.models().is_empty());
    }

    #[tokio::test]
    async fn run_drains_bus_until_closed() {
        let bus = MetricsBus::default();
        let collector = UsageCollector::new();
        let rx = bus.subscribe();

        bus.publish(MetricRecord::Tts {
            label: "elevenlabs".into(),
            timestamp_ms: 0,
            request_id: "r1".into(),
            duration_ms: None,
            characters: Some(10),
            ttfb_ms: None,
        });
        drop(bus);
        collector.run(rx).await;
        assert_eq!(collector.tts_characters(), 10);
    }
}
