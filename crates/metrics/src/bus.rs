//! Metric pub/sub bus (§4.10). Each provider's metrics channel publishes
//! here; the session republishes on its own `MetricsBus` so a caller's
//! `UsageCollector` can fold across every provider without depending on
//! provider crates directly.

use tokio::sync::broadcast;

use va_domain::metrics::MetricRecord;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct MetricsBus {
    tx: broadcast::Sender<MetricRecord>,
}

impl Default for MetricsBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl MetricsBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Emits the record to the tracing log (always visible, even with no
    /// subscriber attached) and republishes it to any subscriber.
    pub fn publish(&self, record: MetricRecord) {
        record.emit();
        // No subscribers is a normal, not an error, state.
        let _ = self.tx.send(record);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MetricRecord> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MetricRecord {
        MetricRecord::Llm {
            label: "gpt-4o".into(),
            timestamp_ms: 0,
            request_id: "r1".into(),
            duration_ms: Some(120),
            prompt_tokens: Some(10),
            completion_tokens: Some(5),
        }
    }

    #[tokio::test]
    async fn subscriber_receives_published_record() {
        let bus = MetricsBus::default();
        let mut rx = bus.subscribe();
        bus.publish(sample());
        let received = rx.recv().await.unwrap();
        assert_eq!(received.request_id(), "r1");
    }

    #[test]
    fn publish_without_subscribers_does_not_panic() {
        let bus = MetricsBus::default();
        bus.publish(sample());
    }
}
