//! Process-wide job supervision (§4.4). `Worker` is the thing a binary
//! builds once per process; `ProcPool` is the warm-process machinery it
//! delegates to. Registering with a dispatch server and requesting
//! availability are external concerns — this crate starts at "a job was
//! assigned, run it."

mod factory;
mod pool;

pub use factory::{CommandFactory, ExecutorFactory};
pub use pool::ProcPool;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use va_domain::config::WorkerConfig;
use va_domain::RunningJobInfo;
use va_ipc::ProcJobExecutor;
use va_protocol::ProtocolError;

/// Worker lifecycle (§3): `register → available → draining → closed`.
/// Registration and availability signaling live outside this crate; the
/// states are tracked here so a caller can observe and gate on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Register,
    Available,
    Draining,
    Closed,
}

impl From<u8> for WorkerState {
    fn from(v: u8) -> Self {
        match v {
            0 => WorkerState::Register,
            1 => WorkerState::Available,
            2 => WorkerState::Draining,
            _ => WorkerState::Closed,
        }
    }
}

/// Process-wide: the active-job table and warmed-process queue (§3, §4.4).
pub struct Worker<F> {
    pool: Arc<ProcPool<F>>,
    state: AtomicU8,
}

impl<F: ExecutorFactory + 'static> Worker<F> {
    pub fn new(factory: F, config: WorkerConfig) -> Self {
        Self {
            pool: ProcPool::new(factory, config),
            state: AtomicU8::new(WorkerState::Register as u8),
        }
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from(self.state.load(Ordering::SeqCst))
    }

    pub fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// All executors currently running a job.
    pub fn processes(&self) -> Vec<Arc<ProcJobExecutor>> {
        self.pool.processes()
    }

    pub fn get_by_job_id(&self, id: &str) -> Option<Arc<ProcJobExecutor>> {
        self.pool.get_by_job_id(id)
    }

    /// Blocks until a warmed executor is available, assigns `info` to it,
    /// and frees the slot it held so the pool can start warming a
    /// replacement.
    pub async fn launch_job(&self, info: RunningJobInfo) -> Result<Arc<ProcJobExecutor>, ProtocolError> {
        self.pool.launch_job(info).await
    }

    /// Drains: marks the worker closed, stops replenishing, shuts down
    /// every warmed and active executor, and awaits them. Idempotent.
    pub async fn close(&self) {
        self.set_state(WorkerState::Draining);
        self.pool.close().await;
        self.set_state(WorkerState::Closed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::process::Command;
    use va_protocol::LoggerOptions;

    struct ShFactory {
        script: &'static str,
    }

    #[async_trait]
    impl ExecutorFactory for ShFactory {
        async fn spawn_and_initialize(&self, config: &WorkerConfig) -> Result<ProcJobExecutor, ProtocolError> {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(self.script);
            let executor = ProcJobExecutor::spawn(cmd, config.clone()).map_err(ProtocolError::Io)?;
            executor.initialize(LoggerOptions::default()).await?;
            Ok(executor)
        }
    }

    fn test_config(num_idle: usize) -> WorkerConfig {
        WorkerConfig {
            num_idle_processes: num_idle,
            initialize_timeout_ms: 2_000,
            ping_interval_ms: 200,
            ping_timeout_ms: 2_000,
            close_timeout_ms: 1_000,
            ..WorkerConfig::default()
        }
    }

    const WELL_BEHAVED: &str = "read _line; echo '{\"case\":\"initializeResponse\"}'; \
                                 while read _l; do :; done";

    #[tokio::test]
    async fn launch_job_assigns_a_warmed_executor() {
        let worker = Worker::new(ShFactory { script: WELL_BEHAVED }, test_config(1));
        tokio::time::sleep(std::time::Duration::from_millis(300)).await;

        let job = va_domain::Job::new("job-1", "room", 0);
        let info = RunningJobInfo {
            job,
            jwt: "t".into(),
            room_url: "wss://example".into(),
        };
        let executor = tokio::time::timeout(std::time::Duration::from_millis(500), worker.launch_job(info))
            .await
            .expect("launch_job should not block past one warm-up")
            .expect("launch_job should succeed against a well-behaved child");

        assert!(worker.get_by_job_id("job-1").is_some());
        drop(executor);
        worker.close().await;
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let worker = Worker::new(ShFactory { script: WELL_BEHAVED }, test_config(1));
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        worker.close().await;
        worker.close().await;
        assert_eq!(worker.state(), WorkerState::Closed);
    }

    #[tokio::test]
    async fn replenishment_replaces_a_dead_warm_proc() {
        // Dies immediately after init instead of staying warm.
        let worker = Worker::new(
            ShFactory {
                script: "read _line; echo '{\"case\":\"initializeResponse\"}'; exit 1",
            },
            test_config(1),
        );
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;

        let job = va_domain::Job::new("job-2", "room", 0);
        let info = RunningJobInfo {
            job,
            jwt: "t".into(),
            room_url: "wss://example".into(),
        };
        // The first couple of warm entries are already dead by the time we
        // claim one; launch_job must skip them and keep trying.
        let result = tokio::time::timeout(std::time::Duration::from_secs(3), worker.launch_job(info)).await;
        assert!(result.is_ok(), "launch_job should eventually find a live proc or a clean pool-closed error");
        worker.close().await;
    }
}
