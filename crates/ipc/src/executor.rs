//! Parent-side supervision of one child job process (§4.3).
//!
//! Each job runs in its own OS child process. `ProcJobExecutor` forks it,
//! runs the initialize handshake, then a ping/pong watchdog, and
//! arbitrates shutdown — the same reader/writer/ping-task split as the
//! node client's WebSocket message loop, but over framed stdio instead of
//! a socket.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{mpsc, oneshot, Notify};
use tokio_util::codec::{FramedRead, LinesCodec};
use tokio_util::sync::CancellationToken;

use va_domain::config::WorkerConfig;
use va_domain::RunningJobInfo;
use va_protocol::{case_name, Envelope, LoggerOptions, ProtocolError};
use va_util::future::Outcome;
use va_util::sync::Mutex;
use va_util::SharedFuture;

/// Why a supervised child ultimately stopped running.
#[derive(Debug, Clone)]
pub enum JoinReason {
    /// Child acknowledged `ShutdownRequest` with `Done` and exited.
    ShutdownCompleted,
    /// Child's pipe closed, or it sent something it shouldn't have, without
    /// a shutdown request in flight.
    UnexpectedExit(String),
    /// Parent SIGKILLed the child (orphan/ping watchdog or close timeout).
    Killed(String),
}

struct Shared {
    pending_inference: Mutex<HashMap<String, oneshot::Sender<Result<serde_json::Value, String>>>>,
}

/// Supervises one child job process over framed newline-JSON stdio.
pub struct ProcJobExecutor {
    child: Arc<tokio::sync::Mutex<Child>>,
    outbound: mpsc::Sender<Envelope>,
    shared: Arc<Shared>,
    initialized: SharedFuture<()>,
    joined: SharedFuture<JoinReason>,
    watchdog_reset: Arc<Notify>,
    cancel: CancellationToken,
    config: WorkerConfig,
}

impl ProcJobExecutor {
    /// Forks `command` with piped stdio and starts the reader/writer tasks.
    /// Does not send `InitializeRequest` yet — call [`initialize`].
    pub fn spawn(mut command: Command, config: WorkerConfig) -> std::io::Result<Self> {
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        let mut child = command.spawn()?;
        let stdin = child.stdin.take().expect("piped stdin requested");
        let stdout = child.stdout.take().expect("piped stdout requested");

        let (outbound_tx, outbound_rx) = mpsc::channel::<Envelope>(32);
        let shared = Arc::new(Shared {
            pending_inference: Mutex::new(HashMap::new()),
        });
        let initialized: SharedFuture<()> = Arc::new(va_util::Future::new());
        let joined: SharedFuture<JoinReason> = Arc::new(va_util::Future::new());
        let cancel = CancellationToken::new();
        let watchdog_reset = Arc::new(Notify::new());
        let child = Arc::new(tokio::sync::Mutex::new(child));

        tokio::spawn(writer_loop(stdin, outbound_rx));
        tokio::spawn(reader_loop(
            stdout,
            shared.clone(),
            initialized.clone(),
            joined.clone(),
            watchdog_reset.clone(),
            child.clone(),
            cancel.clone(),
            config.high_ping_threshold_ms,
        ));

        Ok(Self {
            child,
            outbound: outbound_tx,
            shared,
            initialized,
            joined,
            watchdog_reset,
            cancel,
            config,
        })
    }

    async fn send(&self, env: Envelope) -> Result<(), ProtocolError> {
        self.outbound
            .send(env)
            .await
            .map_err(|_| ProtocolError::UnexpectedExit("outbound channel closed".into()))
    }

    async fn kill(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let _ = self.child.lock().await.start_kill();
        self.joined.resolve(JoinReason::Killed(reason));
        self.cancel.cancel();
    }

    /// Runs the handshake: sends `InitializeRequest`, waits up to
    /// `initialize_timeout_ms` for `InitializeResponse`, then starts the
    /// ping loop and the ping-timeout watchdog.
    pub async fn initialize(&self, logger_options: LoggerOptions) -> Result<(), ProtocolError> {
        self.send(Envelope::InitializeRequest {
            logger_options,
            ping_interval_ms: self.config.ping_interval_ms,
            ping_timeout_ms: self.config.ping_timeout_ms,
            high_ping_threshold_ms: self.config.high_ping_threshold_ms,
        })
        .await?;

        let timeout = Duration::from_millis(self.config.initialize_timeout_ms);
        match tokio::time::timeout(timeout, self.initialized.wait()).await {
            Ok(Outcome::Resolved(())) => {
                self.spawn_ping_loop();
                self.spawn_watchdog();
                Ok(())
            }
            Ok(Outcome::Rejected(reason)) => Err(ProtocolError::UnexpectedFirstMessage(reason)),
            Ok(Outcome::Pending) => {
                Err(ProtocolError::InitializeTimeout(self.config.initialize_timeout_ms))
            }
            Err(_) => {
                self.kill("initialize timeout").await;
                Err(ProtocolError::InitializeTimeout(self.config.initialize_timeout_ms))
            }
        }
    }

    fn spawn_ping_loop(&self) {
        let outbound = self.outbound.clone();
        let interval_ms = self.config.ping_interval_ms;
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        let timestamp_ms = Utc::now().timestamp_millis();
                        if outbound.send(Envelope::PingRequest { timestamp_ms }).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });
    }

    fn spawn_watchdog(&self) {
        let timeout = Duration::from_millis(self.config.ping_timeout_ms);
        let watchdog_reset = self.watchdog_reset.clone();
        let joined = self.joined.clone();
        let child = self.child.clone();
        let cancel = self.cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return,
                    _ = watchdog_reset.notified() => continue,
                    _ = tokio::time::sleep(timeout) => {
                        let err = ProtocolError::PingTimeout(timeout.as_millis() as u64);
                        tracing::warn!(%err, "killing unresponsive child");
                        let _ = child.lock().await.start_kill();
                        joined.resolve(JoinReason::Killed(err.to_string()));
                        cancel.cancel();
                        return;
                    }
                }
            }
        });
    }

    /// Assigns a job to this (already-initialized) child.
    pub async fn launch_job(&self, running_job: RunningJobInfo) -> Result<(), ProtocolError> {
        self.send(Envelope::StartJobRequest { running_job }).await
    }

    /// Dispatches an `InferenceRequest` and awaits the matching
    /// `InferenceResponse` by request id.
    pub async fn infer(
        &self,
        method: impl Into<String>,
        data: serde_json::Value,
    ) -> Result<serde_json::Value, String> {
        let request_id = va_util::shortuuid();
        let (tx, rx) = oneshot::channel();
        self.shared
            .pending_inference
            .lock()
            .await
            .insert(request_id.clone(), tx);

        let sent = self
            .send(Envelope::InferenceRequest {
                method: method.into(),
                request_id: request_id.clone(),
                data,
            })
            .await;
        if sent.is_err() {
            self.shared.pending_inference.lock().await.remove(&request_id);
            return Err("executor outbound channel closed".into());
        }

        match rx.await {
            Ok(result) => result,
            Err(_) => Err("inference response channel dropped before reply".into()),
        }
    }

    /// Requests a graceful shutdown: sends `ShutdownRequest`, waits for
    /// `Done` up to `close_timeout_ms`, then SIGKILLs on expiry.
    pub async fn shutdown(&self, reason: Option<String>) -> JoinReason {
        let _ = self.send(Envelope::ShutdownRequest { reason }).await;
        let timeout = Duration::from_millis(self.config.close_timeout_ms);
        match tokio::time::timeout(timeout, self.joined.wait()).await {
            Ok(Outcome::Resolved(r)) => r,
            Ok(_) => JoinReason::UnexpectedExit("join future settled without a reason".into()),
            Err(_) => {
                let err = ProtocolError::ShutdownOverTime(self.config.close_timeout_ms);
                tracing::warn!(%err, "killing child after shutdown timeout");
                let _ = self.child.lock().await.start_kill();
                let reason = JoinReason::Killed(err.to_string());
                self.joined.resolve(reason.clone());
                self.cancel.cancel();
                reason
            }
        }
    }

    /// Awaits the executor's terminal state without requesting shutdown.
    /// Used by a worker that only cares when a crashed child frees its slot.
    pub async fn join(&self) -> JoinReason {
        match self.joined.wait().await {
            Outcome::Resolved(r) => r,
            _ => JoinReason::UnexpectedExit("join future settled unexpectedly".into()),
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn reader_loop(
    stdout: ChildStdout,
    shared: Arc<Shared>,
    initialized: SharedFuture<()>,
    joined: SharedFuture<JoinReason>,
    watchdog_reset: Arc<Notify>,
    child: Arc<tokio::sync::Mutex<Child>>,
    cancel: CancellationToken,
    high_ping_threshold_ms: u64,
) {
    let mut lines = FramedRead::new(stdout, LinesCodec::new());
    let mut saw_first = false;

    while let Some(line) = lines.next().await {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::warn!(error = %e, "child stdout framing error");
                break;
            }
        };
        let env: Envelope = match serde_json::from_str(&line) {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!(error = %e, raw = %line, "failed to parse child envelope");
                continue;
            }
        };

        if !saw_first {
            saw_first = true;
            if !matches!(env, Envelope::InitializeResponse {}) {
                let case = case_name(&env);
                initialized.reject(format!("first message was {case}, not initializeResponse"));
                let _ = child.lock().await.start_kill();
                joined.resolve(JoinReason::UnexpectedExit(format!(
                    "first child message was {case}"
                )));
                cancel.cancel();
                return;
            }
            initialized.resolve(());
            continue;
        }

        match env {
            Envelope::PongResponse {
                last_timestamp_ms,
                timestamp_ms,
            } => {
                watchdog_reset.notify_one();
                let rtt_ms = timestamp_ms - last_timestamp_ms;
                if rtt_ms as u64 > high_ping_threshold_ms {
                    tracing::warn!(rtt_ms, high_ping_threshold_ms, "slow pong round-trip");
                }
            }
            Envelope::Exiting { reason } => {
                tracing::info!(?reason, "child reported exiting");
            }
            Envelope::Done {} => {
                joined.resolve(JoinReason::ShutdownCompleted);
                cancel.cancel();
                return;
            }
            Envelope::InferenceResponse {
                request_id,
                data,
                error,
            } => {
                if let Some(tx) = shared.pending_inference.lock().await.remove(&request_id) {
                    let result = match error {
                        Some(e) => Err(e),
                        None => Ok(data.unwrap_or(serde_json::Value::Null)),
                    };
                    let _ = tx.send(result);
                }
            }
            other => {
                tracing::debug!(case = case_name(&other), "unexpected message from child, ignoring");
            }
        }
    }

    if !cancel.is_cancelled() {
        joined.resolve(JoinReason::UnexpectedExit("child stdout closed".into()));
        cancel.cancel();
    }
}

async fn writer_loop(mut stdin: ChildStdin, mut outbound_rx: mpsc::Receiver<Envelope>) {
    while let Some(env) = outbound_rx.recv().await {
        let json = match serde_json::to_string(&env) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize outbound envelope");
                continue;
            }
        };
        if stdin.write_all(json.as_bytes()).await.is_err() {
            break;
        }
        if stdin.write_all(b"\n").await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> WorkerConfig {
        WorkerConfig {
            initialize_timeout_ms: 2_000,
            ping_interval_ms: 50,
            ping_timeout_ms: 300,
            high_ping_threshold_ms: 100,
            close_timeout_ms: 2_000,
            ..WorkerConfig::default()
        }
    }

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[tokio::test]
    async fn initialize_succeeds_on_well_behaved_child() {
        let cmd = sh("read _line; echo '{\"case\":\"initializeResponse\"}'; sleep 5");
        let executor = ProcJobExecutor::spawn(cmd, test_config()).unwrap();
        let result = executor.initialize(LoggerOptions::default()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn wrong_first_message_is_a_protocol_error() {
        let cmd = sh("read _line; echo '{\"case\":\"done\"}'; sleep 5");
        let executor = ProcJobExecutor::spawn(cmd, test_config()).unwrap();
        let result = executor.initialize(LoggerOptions::default()).await;
        assert!(matches!(result, Err(ProtocolError::UnexpectedFirstMessage(_))));
    }

    #[tokio::test]
    async fn silent_child_times_out_on_initialize() {
        let mut cfg = test_config();
        cfg.initialize_timeout_ms = 100;
        let cmd = sh("sleep 5");
        let executor = ProcJobExecutor::spawn(cmd, cfg).unwrap();
        let result = executor.initialize(LoggerOptions::default()).await;
        assert!(matches!(result, Err(ProtocolError::InitializeTimeout(_))));
    }

    #[tokio::test]
    async fn graceful_shutdown_observes_done() {
        let script = "read _line; echo '{\"case\":\"initializeResponse\"}'; \
                       read _line2; echo '{\"case\":\"done\"}'";
        let executor = ProcJobExecutor::spawn(sh(script), test_config()).unwrap();
        executor.initialize(LoggerOptions::default()).await.unwrap();
        let reason = executor.shutdown(Some("test".into())).await;
        assert!(matches!(reason, JoinReason::ShutdownCompleted));
    }

    #[tokio::test]
    async fn closed_stdout_without_done_is_unexpected_exit() {
        let script = "read _line; echo '{\"case\":\"initializeResponse\"}'; exit 1";
        let executor = ProcJobExecutor::spawn(sh(script), test_config()).unwrap();
        executor.initialize(LoggerOptions::default()).await.unwrap();
        let reason = executor.join().await;
        assert!(matches!(reason, JoinReason::UnexpectedExit(_)));
    }
}
