//! Fallback adapter over `TtsProvider` (§4.5). `synthesize` gets full
//! retry-with-forwarding (text is stateless, so switching mid-synthesis is
//! well-defined); `stream()` opens on the first available candidate for the
//! same reason `FallbackStt::stream` does — once partial audio has gone
//! out, splicing a second provider's voice mid-utterance is a policy
//! decision the spec leaves to `retry_on_chunk_sent`, applied here at the
//! `synthesize` level only.

use std::sync::Arc;

use async_trait::async_trait;

use va_domain::capability::TtsCapabilities;
use va_domain::config::FallbackPolicy;

use crate::error::ApiError;
use crate::fallback::core::FallbackCore;
use crate::tts::{ChunkedStream, SynthesizeStream, SynthesizedAudio, TtsProvider};

fn id_of(p: &dyn TtsProvider) -> &str {
    p.provider_id()
}

pub struct FallbackTts {
    core: FallbackCore<dyn TtsProvider>,
    capabilities: TtsCapabilities,
}

impl FallbackTts {
    pub fn new(providers: Vec<Arc<dyn TtsProvider>>, policy: FallbackPolicy) -> Self {
        let capabilities = providers.first().map(|p| p.capabilities().clone()).unwrap_or_default();
        Self {
            core: FallbackCore::new(providers, policy),
            capabilities,
        }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<crate::fallback::core::AvailabilityChanged> {
        self.core.subscribe()
    }

    fn schedule_recovery(&self, provider: Arc<dyn TtsProvider>) {
        let provider_id = provider.provider_id().to_string();
        self.core.mark_unavailable_and_probe(&provider_id, id_of, move |provider| async move {
            provider.synthesize("ok").await.is_ok()
        });
    }
}

/// A chunked stream that forwards from `current`, and on a post-first-frame
/// error either aborts (per `retry_on_chunk_sent = false`) or opens the
/// next candidate and keeps going.
struct FallbackChunkedStream {
    text: String,
    current: Box<dyn ChunkedStream>,
    remaining: std::vec::IntoIter<Arc<dyn TtsProvider>>,
    emitted_any: bool,
    retry_on_chunk_sent: bool,
}

#[async_trait]
impl ChunkedStream for FallbackChunkedStream {
    async fn next(&mut self) -> Option<Result<SynthesizedAudio, ApiError>> {
        loop {
            match self.current.next().await {
                Some(Ok(frame)) => {
                    self.emitted_any = true;
                    return Some(Ok(frame));
                }
                Some(Err(e)) => {
                    if self.emitted_any && !self.retry_on_chunk_sent {
                        return Some(Err(e));
                    }
                    match self.remaining.next() {
                        Some(next_provider) => match next_provider.synthesize(&self.text).await {
                            Ok(s) => {
                                self.current = s;
                                continue;
                            }
                            Err(open_err) => return Some(Err(open_err)),
                        },
                        None => return Some(Err(e)),
                    }
                }
                None => return None,
            }
        }
    }
}

#[async_trait]
impl TtsProvider for FallbackTts {
    async fn synthesize(&self, text: &str) -> Result<Box<dyn ChunkedStream>, ApiError> {
        let attempt_timeout_ms = self.core.policy.attempt_timeout_ms;
        let candidates = self.core.candidates();
        let mut last_err: Option<ApiError> = None;
        let mut chosen: Option<(Arc<dyn TtsProvider>, Box<dyn ChunkedStream>)> = None;
        let mut iter = candidates.into_iter();

        for provider in iter.by_ref() {
            let fut = provider.synthesize(text);
            match tokio::time::timeout(std::time::Duration::from_millis(attempt_timeout_ms), fut).await {
                Ok(Ok(s)) => {
                    chosen = Some((provider, s));
                    break;
                }
                Ok(Err(e)) => {
                    tracing::warn!(provider = provider.provider_id(), error = %e, "tts provider failed to open, trying next");
                    self.schedule_recovery(provider);
                    last_err = Some(e);
                }
                Err(_) => {
                    last_err = Some(ApiError::Timeout { elapsed_ms: attempt_timeout_ms, timeout_ms: attempt_timeout_ms });
                    self.schedule_recovery(provider);
                }
            }
        }

        let Some((_provider, current)) = chosen else {
            return Err(last_err.unwrap_or_else(|| ApiError::Connection("no tts providers configured".into())));
        };

        Ok(Box::new(FallbackChunkedStream {
            text: text.to_string(),
            current,
            remaining: iter.collect::<Vec<_>>().into_iter(),
            emitted_any: false,
            retry_on_chunk_sent: self.core.policy.retry_on_chunk_sent,
        }))
    }

    async fn stream(&self) -> Result<Box<dyn SynthesizeStream>, ApiError> {
        let mut last_err: Option<ApiError> = None;
        for provider in self.core.candidates() {
            match provider.stream().await {
                Ok(s) => return Ok(s),
                Err(e) => {
                    tracing::warn!(provider = provider.provider_id(), error = %e, "tts provider failed to open stream, trying next");
                    self.schedule_recovery(provider);
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| ApiError::Connection("no tts providers configured".into())))
    }

    fn capabilities(&self) -> &TtsCapabilities {
        &self.capabilities
    }

    fn provider_id(&self) -> &str {
        "fallback"
    }
}
