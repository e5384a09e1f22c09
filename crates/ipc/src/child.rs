//! Child-side counterpart of [`crate::executor::ProcJobExecutor`] (§4.3).
//! Runs inside the forked job process: answers the initialize handshake,
//! answers pings, arms a 15-second orphan watchdog refreshed by every
//! `PingRequest`, dispatches `StartJobRequest`/`InferenceRequest`, and
//! exits once it has sent `Done` in response to `ShutdownRequest`.

use std::time::Duration;

use chrono::Utc;
use futures_util::StreamExt;
use tokio::io::{AsyncWriteExt, Stdin, Stdout};
use tokio_util::codec::{FramedRead, LinesCodec};

use va_domain::RunningJobInfo;
use va_protocol::{case_name, Envelope, ProtocolError};

use crate::inference::InferenceExecutor;

const DEFAULT_ORPHAN_TIMEOUT_MS: u64 = 15_000;

#[async_trait::async_trait]
pub trait JobHandler: Send + Sync {
    async fn start_job(&self, running_job: RunningJobInfo);
    async fn shutdown(&self, reason: Option<String>);
}

pub struct ChildRuntime<H: JobHandler> {
    handler: H,
    inference: InferenceExecutor,
    orphan_timeout_ms: u64,
}

impl<H: JobHandler> ChildRuntime<H> {
    pub fn new(handler: H, inference: InferenceExecutor) -> Self {
        Self {
            handler,
            inference,
            orphan_timeout_ms: DEFAULT_ORPHAN_TIMEOUT_MS,
        }
    }

    #[cfg(test)]
    fn with_orphan_timeout_ms(mut self, ms: u64) -> Self {
        self.orphan_timeout_ms = ms;
        self
    }

    /// Drives the handshake/ping/job/shutdown loop against the parent's
    /// stdio until a `ShutdownRequest` completes or the orphan watchdog
    /// fires.
    pub async fn run(self) -> Result<(), ProtocolError> {
        self.run_on(tokio::io::stdin(), tokio::io::stdout()).await
    }

    async fn run_on(&self, stdin: Stdin, mut stdout: Stdout) -> Result<(), ProtocolError> {
        let mut lines = FramedRead::new(stdin, LinesCodec::new());
        let deadline = tokio::time::sleep(Duration::from_millis(self.orphan_timeout_ms));
        tokio::pin!(deadline);

        loop {
            tokio::select! {
                biased;
                _ = &mut deadline => {
                    tracing::warn!("orphan watchdog expired, exiting");
                    return Err(ProtocolError::UnexpectedExit("orphan watchdog expired".into()));
                }
                line = lines.next() => {
                    let line = match line {
                        Some(Ok(l)) => l,
                        Some(Err(e)) => {
                            return Err(ProtocolError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)));
                        }
                        None => {
                            return Err(ProtocolError::UnexpectedExit("parent stdin closed".into()));
                        }
                    };

                    let env: Envelope = match serde_json::from_str(&line) {
                        Ok(e) => e,
                        Err(e) => {
                            tracing::warn!(error = %e, raw = %line, "failed to parse parent envelope");
                            continue;
                        }
                    };

                    match env {
                        Envelope::InitializeRequest { logger_options, .. } => {
                            tracing::debug!(?logger_options, "initialized by parent");
                            send(&mut stdout, &Envelope::InitializeResponse {}).await?;
                        }
                        Envelope::PingRequest { timestamp_ms } => {
                            send(&mut stdout, &Envelope::PongResponse {
                                last_timestamp_ms: timestamp_ms,
                                timestamp_ms: Utc::now().timestamp_millis(),
                            }).await?;
                            deadline.as_mut().reset(tokio::time::Instant::now() + Duration::from_millis(self.orphan_timeout_ms));
                        }
                        Envelope::StartJobRequest { running_job } => {
                            self.handler.start_job(running_job).await;
                        }
                        Envelope::ShutdownRequest { reason } => {
                            self.handler.shutdown(reason).await;
                            send(&mut stdout, &Envelope::Done {}).await?;
                            return Ok(());
                        }
                        Envelope::InferenceRequest { method, request_id, data } => {
                            let response = match self.inference.dispatch(&method, data).await {
                                Ok(data) => Envelope::InferenceResponse { request_id, data: Some(data), error: None },
                                Err(error) => Envelope::InferenceResponse { request_id, data: None, error: Some(error) },
                            };
                            send(&mut stdout, &response).await?;
                        }
                        other => {
                            tracing::warn!(case = case_name(&other), "unexpected message from parent, ignoring");
                        }
                    }
                }
            }
        }
    }
}

async fn send(stdout: &mut Stdout, env: &Envelope) -> Result<(), ProtocolError> {
    let json = serde_json::to_string(env)?;
    stdout.write_all(json.as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct RecordingHandler {
        started: Arc<AtomicBool>,
        shut_down: Arc<AtomicBool>,
    }

    #[async_trait::async_trait]
    impl JobHandler for RecordingHandler {
        async fn start_job(&self, _running_job: RunningJobInfo) {
            self.started.store(true, Ordering::SeqCst);
        }
        async fn shutdown(&self, _reason: Option<String>) {
            self.shut_down.store(true, Ordering::SeqCst);
        }
    }

    #[test]
    fn with_orphan_timeout_overrides_default() {
        let handler = RecordingHandler {
            started: Arc::new(AtomicBool::new(false)),
            shut_down: Arc::new(AtomicBool::new(false)),
        };
        let rt = ChildRuntime::new(handler, InferenceExecutor::new()).with_orphan_timeout_ms(42);
        assert_eq!(rt.orphan_timeout_ms, 42);
    }
}
