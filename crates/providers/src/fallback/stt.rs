//! Fallback adapter over `SttProvider` (§4.5). `recognize` is a single
//! request/response call, so it gets the full retry-with-availability-
//! tracking treatment. `stream()` opens a session on the first candidate
//! that accepts the connection — once audio has been pushed into a live
//! session there's no well-defined way to splice in a second provider's
//! partial state, so mid-stream switching is out of scope here (unlike the
//! LLM/TTS adapters, which operate on stateless text/token output).

use std::sync::Arc;

use async_trait::async_trait;

use va_domain::capability::SttCapabilities;
use va_domain::config::FallbackPolicy;

use crate::error::ApiError;
use crate::fallback::core::FallbackCore;
use crate::stt::{SpeechEvent, SpeechStream, SttProvider};

fn id_of(p: &dyn SttProvider) -> &str {
    p.provider_id()
}

pub struct FallbackStt {
    core: FallbackCore<dyn SttProvider>,
    capabilities: SttCapabilities,
}

impl FallbackStt {
    pub fn new(providers: Vec<Arc<dyn SttProvider>>, policy: FallbackPolicy) -> Self {
        let capabilities = providers.first().map(|p| p.capabilities().clone()).unwrap_or_default();
        Self {
            core: FallbackCore::new(providers, policy),
            capabilities,
        }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<crate::fallback::core::AvailabilityChanged> {
        self.core.subscribe()
    }

    fn schedule_recovery(&self, provider: Arc<dyn SttProvider>) {
        let provider_id = provider.provider_id().to_string();
        self.core.mark_unavailable_and_probe(&provider_id, id_of, move |provider| async move {
            provider.recognize(&[0u8; 0], 16_000, 1).await.is_ok()
        });
    }
}

#[async_trait]
impl SttProvider for FallbackStt {
    async fn recognize(&self, audio: &[u8], sample_rate: u32, num_channels: u16) -> Result<SpeechEvent, ApiError> {
        let attempt_timeout_ms = self.core.policy.attempt_timeout_ms;
        let mut last_err: Option<ApiError> = None;

        for provider in self.core.candidates() {
            let fut = provider.recognize(audio, sample_rate, num_channels);
            match tokio::time::timeout(std::time::Duration::from_millis(attempt_timeout_ms), fut).await {
                Ok(Ok(event)) => return Ok(event),
                Ok(Err(e)) => {
                    tracing::warn!(provider = provider.provider_id(), error = %e, "stt provider failed, trying next");
                    self.schedule_recovery(provider);
                    last_err = Some(e);
                }
                Err(_) => {
                    let e = ApiError::Timeout { elapsed_ms: attempt_timeout_ms, timeout_ms: attempt_timeout_ms };
                    tracing::warn!(provider = provider.provider_id(), "stt provider timed out, trying next");
                    self.schedule_recovery(provider);
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| ApiError::Connection("no stt providers configured".into())))
    }

    async fn stream(&self) -> Result<Box<dyn SpeechStream>, ApiError> {
        let mut last_err: Option<ApiError> = None;
        for provider in self.core.candidates() {
            match provider.stream().await {
                Ok(s) => return Ok(s),
                Err(e) => {
                    tracing::warn!(provider = provider.provider_id(), error = %e, "stt provider failed to open stream, trying next");
                    self.schedule_recovery(provider);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| ApiError::Connection("no stt providers configured".into())))
    }

    fn capabilities(&self) -> &SttCapabilities {
        &self.capabilities
    }

    fn provider_id(&self) -> &str {
        "fallback"
    }
}
