//! Keeps `numIdleProcesses` warm child executors ready (§4.4).
//!
//! A `procMutex` (here: a counting `Semaphore`) caps how many executors are
//! concurrently warm. `initMutex` serializes the spawn+initialize step
//! itself, so a burst of replenishment doesn't fork a storm of children at
//! once. Claiming a warm executor (`launch_job`) releases its slot
//! immediately — the replenisher starts the next one before the claimed
//! executor has even taken its first job.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use va_domain::config::WorkerConfig;
use va_domain::RunningJobInfo;
use va_ipc::ProcJobExecutor;
use va_protocol::ProtocolError;
use va_util::Queue;

use crate::factory::ExecutorFactory;

struct WarmedProc {
    executor: Arc<ProcJobExecutor>,
    // Held for as long as this entry is warm-but-unclaimed; dropping it is
    // what frees a slot for the replenisher.
    _permit: tokio::sync::OwnedSemaphorePermit,
}

pub struct ProcPool<F> {
    factory: Arc<F>,
    config: WorkerConfig,
    proc_slots: Arc<Semaphore>,
    init_lock: tokio::sync::Mutex<()>,
    warmed: Queue<WarmedProc>,
    active: parking_lot::RwLock<HashMap<String, Arc<ProcJobExecutor>>>,
    closed: AtomicBool,
    replenisher: std::sync::Mutex<Option<JoinHandle<()>>>,
    tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl<F: ExecutorFactory + 'static> ProcPool<F> {
    pub fn new(factory: F, config: WorkerConfig) -> Arc<Self> {
        let pool = Arc::new(Self {
            factory: Arc::new(factory),
            proc_slots: Arc::new(Semaphore::new(config.num_idle_processes)),
            init_lock: tokio::sync::Mutex::new(()),
            warmed: Queue::new(),
            active: parking_lot::RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
            replenisher: std::sync::Mutex::new(None),
            tasks: std::sync::Mutex::new(Vec::new()),
            config,
        });

        let handle = tokio::spawn(pool.clone().replenish_loop());
        *pool.replenisher.lock().unwrap() = Some(handle);
        pool
    }

    async fn replenish_loop(self: Arc<Self>) {
        loop {
            if self.closed.load(Ordering::SeqCst) {
                return;
            }
            let permit = match self.proc_slots.clone().acquire_owned().await {
                Ok(p) => p,
                Err(_) => return,
            };
            if self.closed.load(Ordering::SeqCst) {
                drop(permit);
                return;
            }
            let handle = tokio::spawn(self.clone().proc_watch_task(permit));
            self.tasks.lock().unwrap().push(handle);
        }
    }

    async fn proc_watch_task(self: Arc<Self>, permit: tokio::sync::OwnedSemaphorePermit) {
        let init_guard = self.init_lock.lock().await;
        let spawned = self.factory.spawn_and_initialize(&self.config).await;
        drop(init_guard);

        let executor = match spawned {
            Ok(executor) => Arc::new(executor),
            Err(err) => {
                tracing::warn!(error = %err, "proc warm-up failed, releasing slot");
                drop(permit);
                return;
            }
        };

        self.warmed.put(WarmedProc {
            executor: executor.clone(),
            _permit: permit,
        });

        // Stays alive past the push so a warm-but-never-claimed proc that
        // crashes is at least observed; the slot itself was already handed
        // to the queue entry above and is released whenever that entry is
        // eventually drained (by `launch_job` or `close`).
        let reason = executor.join().await;
        tracing::debug!(?reason, "warm proc exited");
    }

    /// Blocks until a warmed executor is available, assigns the job to it,
    /// and releases the proc-slot that executor was occupying. A dead
    /// warm entry (the child crashed while sitting unclaimed) is dropped
    /// and the next one is tried instead.
    pub async fn launch_job(
        self: &Arc<Self>,
        running_job: RunningJobInfo,
    ) -> Result<Arc<ProcJobExecutor>, ProtocolError> {
        loop {
            let warmed = match self.warmed.get().await {
                Some(w) => w,
                None => return Err(ProtocolError::UnexpectedExit("pool closed".into())),
            };
            let WarmedProc { executor, _permit } = warmed;
            drop(_permit);

            if let Err(err) = executor.launch_job(running_job.clone()).await {
                tracing::warn!(error = %err, "warm proc died before claim, trying next");
                continue;
            }

            self.active.write().insert(running_job.job.id.clone(), executor.clone());
            let handle = tokio::spawn(self.clone().reap(running_job.job.id.clone(), executor.clone()));
            self.tasks.lock().unwrap().push(handle);
            return Ok(executor);
        }
    }

    async fn reap(self: Arc<Self>, job_id: String, executor: Arc<ProcJobExecutor>) {
        executor.join().await;
        self.active.write().remove(&job_id);
    }

    pub fn get_by_job_id(&self, id: &str) -> Option<Arc<ProcJobExecutor>> {
        self.active.read().get(id).cloned()
    }

    pub fn processes(&self) -> Vec<Arc<ProcJobExecutor>> {
        self.active.read().values().cloned().collect()
    }

    /// Drains the pool: stops replenishing, shuts down every warmed and
    /// active executor, and awaits all background tasks. Idempotent.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.proc_slots.close();
        if let Some(handle) = self.replenisher.lock().unwrap().take() {
            handle.abort();
        }

        // Drain whatever's sitting warm right now without blocking for a
        // replenishment that will never come once `closed` is set.
        loop {
            match tokio::time::timeout(std::time::Duration::from_millis(0), self.warmed.get()).await {
                Ok(Some(warmed)) => {
                    warmed.executor.shutdown(Some("pool closing".into())).await;
                }
                _ => break,
            }
        }
        for executor in self.processes() {
            executor.shutdown(Some("pool closing".into())).await;
        }

        let tasks: Vec<_> = self.tasks.lock().unwrap().drain(..).collect();
        for task in tasks {
            let _ = task.await;
        }
    }
}
