//! Fallback adapter over `LlmProvider` (§4.5): tries providers in
//! availability order, forwarding chunks as they arrive; switches providers
//! on a pre-first-chunk error, aborts on a post-first-chunk error unless
//! `retry_on_chunk_sent` is set (§9 open question — behavior documented,
//! policy not prescribed beyond the flag).

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;

use va_domain::capability::LlmCapabilities;
use va_domain::config::FallbackPolicy;

use crate::error::ApiError;
use crate::fallback::core::FallbackCore;
use crate::llm::{ChatRequest, ConnectOptions, LlmProvider, LlmStream, ToolChoice};

fn id_of(p: &dyn LlmProvider) -> &str {
    p.provider_id()
}

pub struct FallbackLlm {
    core: Arc<FallbackCore<dyn LlmProvider>>,
    capabilities: LlmCapabilities,
}

impl FallbackLlm {
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>, policy: FallbackPolicy) -> Self {
        let capabilities = providers
            .first()
            .map(|p| p.capabilities().clone())
            .unwrap_or_default();
        Self {
            core: Arc::new(FallbackCore::new(providers, policy)),
            capabilities,
        }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<crate::fallback::core::AvailabilityChanged> {
        self.core.subscribe()
    }

    async fn open_with_timeout(
        provider: &Arc<dyn LlmProvider>,
        req: ChatRequest,
        timeout_ms: u64,
    ) -> Result<LlmStream, ApiError> {
        match tokio::time::timeout(std::time::Duration::from_millis(timeout_ms), provider.chat(req)).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout {
                elapsed_ms: timeout_ms,
                timeout_ms,
            }),
        }
    }
}

/// Marks `provider` unavailable, emits `availability_changed`, and schedules
/// a recovery probe (§4.5 step 3) — shared by the pre-stream open-failure
/// path and the mid-stream error path inside the forwarding stream.
fn schedule_recovery(core: &FallbackCore<dyn LlmProvider>, provider: Arc<dyn LlmProvider>) {
    let provider_id = provider.provider_id().to_string();
    core.mark_unavailable_and_probe(&provider_id, id_of, move |provider| async move {
        let probe_req = ChatRequest {
            chat_ctx: Arc::new(va_domain::ChatContext::new()),
            tool_ctx: None,
            tool_choice: ToolChoice::None,
            conn_options: ConnectOptions { timeout_ms: 5_000 },
            extra: serde_json::Value::Null,
        };
        provider.chat(probe_req).await.is_ok()
    });
}

#[async_trait]
impl LlmProvider for FallbackLlm {
    async fn chat(&self, req: ChatRequest) -> Result<LlmStream, ApiError> {
        let candidates = self.core.candidates();
        let attempt_timeout_ms = self.core.policy.attempt_timeout_ms;
        let retry_on_chunk_sent = self.core.policy.retry_on_chunk_sent;

        let mut last_err: Option<ApiError> = None;
        let mut chosen: Option<(Arc<dyn LlmProvider>, LlmStream)> = None;
        let mut tried_ids = Vec::new();

        for provider in candidates {
            tried_ids.push(provider.provider_id().to_string());
            match Self::open_with_timeout(&provider, req.clone(), attempt_timeout_ms).await {
                Ok(stream) => {
                    chosen = Some((provider, stream));
                    break;
                }
                Err(e) => {
                    tracing::warn!(provider = provider.provider_id(), error = %e, "llm provider failed to open, trying next");
                    schedule_recovery(&self.core, provider);
                    last_err = Some(e);
                }
            }
        }

        let Some((provider, first_stream)) = chosen else {
            return Err(last_err.unwrap_or_else(|| ApiError::Connection("no llm providers configured".into())));
        };

        let remaining: Vec<Arc<dyn LlmProvider>> = self
            .core
            .candidates()
            .into_iter()
            .filter(|p| p.provider_id() != provider.provider_id())
            .collect();

        let core = self.core.clone();

        let stream = async_stream::stream! {
            let mut emitted_any = false;
            let mut current = first_stream;
            let mut remaining = remaining.into_iter();
            let mut current_provider = provider;

            loop {
                match current.next().await {
                    Some(Ok(chunk)) => {
                        emitted_any = true;
                        yield Ok(chunk);
                    }
                    Some(Err(e)) => {
                        if emitted_any && !retry_on_chunk_sent {
                            yield Err(e);
                            return;
                        }
                        tracing::warn!(provider = %current_provider.provider_id(), error = %e, "llm stream errored, attempting fallback");
                        schedule_recovery(&core, current_provider.clone());
                        match remaining.next() {
                            Some(next_provider) => {
                                match FallbackLlm::open_with_timeout(&next_provider, req.clone(), attempt_timeout_ms).await {
                                    Ok(s) => {
                                        current_provider = next_provider;
                                        current = s;
                                        continue;
                                    }
                                    Err(open_err) => {
                                        yield Err(open_err);
                                        return;
                                    }
                                }
                            }
                            None => {
                                yield Err(e);
                                return;
                            }
                        }
                    }
                    None => return,
                }
            }
        };

        Ok(Box::pin(stream))
    }

    fn capabilities(&self) -> &LlmCapabilities {
        &self.capabilities
    }

    fn provider_id(&self) -> &str {
        "fallback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ChatChunk, ChatDelta};
    use std::sync::atomic::{AtomicU32, Ordering};
    use va_domain::capability::LlmCapabilities;
    use va_domain::stream::BoxStream;

    struct StubProvider {
        id: &'static str,
        fails: bool,
        calls: Arc<AtomicU32>,
        caps: LlmCapabilities,
    }

    #[async_trait]
    impl LlmProvider for StubProvider {
        async fn chat(&self, _req: ChatRequest) -> Result<LlmStream, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fails {
                return Err(ApiError::status(403, "forbidden"));
            }
            let id = self.id.to_string();
            let s = async_stream::stream! {
                yield Ok(ChatChunk { id: id.clone(), delta: ChatDelta { content: Some("hi".into()), ..Default::default() } });
            };
            let boxed: BoxStream<'static, Result<ChatChunk, ApiError>> = Box::pin(s);
            Ok(boxed)
        }
        fn capabilities(&self) -> &LlmCapabilities {
            &self.caps
        }
        fn provider_id(&self) -> &str {
            self.id
        }
    }

    fn req() -> ChatRequest {
        ChatRequest {
            chat_ctx: Arc::new(va_domain::ChatContext::new()),
            tool_ctx: None,
            tool_choice: ToolChoice::Auto,
            conn_options: ConnectOptions::default(),
            extra: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn falls_back_to_second_provider_on_open_failure() {
        let calls_a = Arc::new(AtomicU32::new(0));
        let calls_b = Arc::new(AtomicU32::new(0));
        let a = Arc::new(StubProvider { id: "a", fails: true, calls: calls_a.clone(), caps: LlmCapabilities::default() });
        let b = Arc::new(StubProvider { id: "b", fails: false, calls: calls_b.clone(), caps: LlmCapabilities::default() });
        let fb = FallbackLlm::new(vec![a, b], FallbackPolicy::default());

        let mut stream = fb.chat(req()).await.unwrap();
        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.id, "b");
        assert_eq!(calls_a.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn all_providers_failing_returns_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let a = Arc::new(StubProvider { id: "a", fails: true, calls: calls.clone(), caps: LlmCapabilities::default() });
        let fb = FallbackLlm::new(vec![a], FallbackPolicy::default());
        assert!(fb.chat(req()).await.is_err());
    }

    /// Opens fine but the first item off the stream is an error — exercises
    /// the mid-stream (not pre-open) failure path.
    struct ErrorsOnFirstChunk {
        id: &'static str,
    }

    #[async_trait]
    impl LlmProvider for ErrorsOnFirstChunk {
        async fn chat(&self, _req: ChatRequest) -> Result<LlmStream, ApiError> {
            let s = async_stream::stream! {
                yield Err(ApiError::Connection("reset".into()));
            };
            let boxed: BoxStream<'static, Result<ChatChunk, ApiError>> = Box::pin(s);
            Ok(boxed)
        }
        fn capabilities(&self) -> &LlmCapabilities {
            static CAPS: std::sync::OnceLock<LlmCapabilities> = std::sync::OnceLock::new();
            CAPS.get_or_init(LlmCapabilities::default)
        }
        fn provider_id(&self) -> &str {
            self.id
        }
    }

    #[tokio::test]
    async fn mid_stream_error_marks_provider_unavailable_and_switches() {
        let calls_b = Arc::new(AtomicU32::new(0));
        let a = Arc::new(ErrorsOnFirstChunk { id: "a" });
        let b = Arc::new(StubProvider { id: "b", fails: false, calls: calls_b, caps: LlmCapabilities::default() });
        let fb = FallbackLlm::new(vec![a, b], FallbackPolicy::default());

        let mut availability = fb.subscribe();
        let mut stream = fb.chat(req()).await.unwrap();
        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(chunk.id, "b");

        let event = availability.recv().await.unwrap();
        assert_eq!(event.provider_id, "a");
        assert!(!event.available);
    }
}
