//! Shared engine behind the LLM/STT/TTS fallback adapters (§4.5): provider
//! ordering, availability tracking, and the at-most-one-in-flight recovery
//! probe per provider. The per-kind adapters in `fallback::{llm,stt,tts}`
//! layer their own call/forward logic on top of this.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use va_domain::config::FallbackPolicy;

use crate::error::ApiError;

/// Emitted whenever a provider flips available ⟷ unavailable.
#[derive(Debug, Clone)]
pub struct AvailabilityChanged {
    pub provider_id: String,
    pub available: bool,
}

struct Slot<P: ?Sized> {
    provider: Arc<P>,
    available: AtomicBool,
    recovering: AtomicBool,
}

/// Generic availability-tracking core shared by every fallback adapter
/// kind. `P` is the concrete provider trait object type (`dyn LlmProvider`,
/// `dyn SttProvider`, `dyn TtsProvider`).
pub struct FallbackCore<P: ?Sized> {
    slots: Vec<Arc<Slot<P>>>,
    pub policy: FallbackPolicy,
    events_tx: broadcast::Sender<AvailabilityChanged>,
}

impl<P: ?Sized + Send + Sync + 'static> FallbackCore<P> {
    pub fn new(providers: Vec<Arc<P>>, policy: FallbackPolicy) -> Self {
        let (events_tx, _) = broadcast::channel(32);
        Self {
            slots: providers
                .into_iter()
                .map(|provider| {
                    Arc::new(Slot {
                        provider,
                        available: AtomicBool::new(true),
                        recovering: AtomicBool::new(false),
                    })
                })
                .collect(),
            policy,
            events_tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AvailabilityChanged> {
        self.events_tx.subscribe()
    }

    /// Candidate providers in call order: available ones first, then (only
    /// if none are available — so the adapter isn't permanently stuck once
    /// every provider has tripped) the full list regardless of state.
    pub fn candidates(&self) -> Vec<Arc<P>> {
        let available: Vec<Arc<P>> = self
            .slots
            .iter()
            .filter(|s| s.available.load(Ordering::SeqCst))
            .map(|s| s.provider.clone())
            .collect();
        if available.is_empty() {
            self.slots.iter().map(|s| s.provider.clone()).collect()
        } else {
            available
        }
    }

    /// Marks a provider unavailable, emits `availability_changed`, and
    /// spawns a recovery probe if one isn't already running for it.
    /// `probe` re-runs (once) on a background task; on success the
    /// provider flips back to available and a second event is emitted.
    pub fn mark_unavailable_and_probe<F, Fut>(&self, provider_id: &str, id_of: impl Fn(&P) -> &str, probe: F)
    where
        F: FnOnce(Arc<P>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = bool> + Send + 'static,
    {
        let Some(slot) = self
            .slots
            .iter()
            .find(|s| id_of(&s.provider) == provider_id)
            .cloned()
        else {
            return;
        };

        let was_available = slot.available.swap(false, Ordering::SeqCst);
        if was_available {
            let _ = self.events_tx.send(AvailabilityChanged {
                provider_id: provider_id.to_string(),
                available: false,
            });
        }

        if slot.recovering.swap(true, Ordering::SeqCst) {
            return; // a probe is already in flight for this provider
        }

        let provider_id = provider_id.to_string();
        let timeout_ms = self.policy.recovery_probe_timeout_ms;
        let events_tx = self.events_tx.clone();
        let probe_slot = slot.clone();

        tokio::spawn(async move {
            let ok = tokio::time::timeout(
                std::time::Duration::from_millis(timeout_ms),
                probe(probe_slot.provider.clone()),
            )
            .await
            .unwrap_or(false);
            if ok {
                probe_slot.available.store(true, Ordering::SeqCst);
                let _ = events_tx.send(AvailabilityChanged {
                    provider_id: provider_id.clone(),
                    available: true,
                });
            }
            probe_slot.recovering.store(false, Ordering::SeqCst);
        });
    }
}

pub fn is_retryable(err: &ApiError) -> bool {
    err.retryable()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Dummy(&'static str);

    fn id_of(d: &Dummy) -> &str {
        d.0
    }

    #[tokio::test]
    async fn candidates_prefer_available_then_fall_back_to_all() {
        let core = FallbackCore::new(
            vec![Arc::new(Dummy("a")), Arc::new(Dummy("b"))],
            FallbackPolicy::default(),
        );
        assert_eq!(core.candidates().len(), 2);

        let mut rx = core.subscribe();
        core.mark_unavailable_and_probe("a", id_of, |_| async { false });
        assert_eq!(core.candidates().iter().map(|d| d.0).collect::<Vec<_>>(), vec!["b"]);

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.provider_id, "a");
        assert!(!ev.available);
    }

    #[tokio::test]
    async fn recovery_probe_flips_availability_back() {
        let core = Arc::new(FallbackCore::new(
            vec![Arc::new(Dummy("a"))],
            FallbackPolicy {
                recovery_probe_timeout_ms: 500,
                ..FallbackPolicy::default()
            },
        ));
        let mut rx = core.subscribe();
        core.mark_unavailable_and_probe("a", id_of, |_| async { true });
        let unavailable = rx.recv().await.unwrap();
        assert!(!unavailable.available);
        let recovered = rx.recv().await.unwrap();
        assert!(recovered.available);
        assert_eq!(core.candidates().len(), 1);
    }

    #[tokio::test]
    async fn only_one_probe_in_flight_per_provider() {
        let core = FallbackCore::new(vec![Arc::new(Dummy("a"))], FallbackPolicy::default());
        let calls = Arc::new(std::sync::atomic::AtomicU32::new(0));
        for _ in 0..5 {
            let calls = calls.clone();
            core.mark_unavailable_and_probe("a", id_of, move |_| {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
                    true
                }
            });
        }
        tokio::time::sleep(std::time::Duration::from_millis(150)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
