//! Pluggable executor construction. The pool knows how to keep executors
//! warm and hand them off; it has no opinion on what a job process *is* —
//! that's supplied by whoever builds the `Worker`.

use async_trait::async_trait;
use va_domain::config::WorkerConfig;
use va_ipc::ProcJobExecutor;
use va_protocol::{LoggerOptions, ProtocolError};

/// Builds and initializes one child job process.
#[async_trait]
pub trait ExecutorFactory: Send + Sync {
    /// Spawns the child and runs the initialize handshake. A returned `Err`
    /// is treated as a failed warm attempt — the pool releases the slot and
    /// the replenisher tries again.
    async fn spawn_and_initialize(&self, config: &WorkerConfig) -> Result<ProcJobExecutor, ProtocolError>;
}

/// An `ExecutorFactory` built from a plain `tokio::process::Command` factory
/// closure plus fixed logger options, for the common case where spawning
/// doesn't need anything fancier.
pub struct CommandFactory<F> {
    build: F,
    logger_options: LoggerOptions,
}

impl<F> CommandFactory<F>
where
    F: Fn() -> tokio::process::Command + Send + Sync,
{
    pub fn new(build: F, logger_options: LoggerOptions) -> Self {
        Self { build, logger_options }
    }
}

#[async_trait]
impl<F> ExecutorFactory for CommandFactory<F>
where
    F: Fn() -> tokio::process::Command + Send + Sync,
{
    async fn spawn_and_initialize(&self, config: &WorkerConfig) -> Result<ProcJobExecutor, ProtocolError> {
        let command = (self.build)();
        let executor = ProcJobExecutor::spawn(command, config.clone())
            .map_err(ProtocolError::Io)?;
        executor.initialize(self.logger_options.clone()).await?;
        Ok(executor)
    }
}
