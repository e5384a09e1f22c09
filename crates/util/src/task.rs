//! A cancellable coroutine (§4.2). Wraps a `tokio::task::JoinHandle` with a
//! `CancellationToken` threaded into the spawned future, matching the
//! context/abort-signal idiom used throughout the runtime (interruption,
//! handoff, session close, job shutdown all cancel this same way).

use std::future::Future as StdFuture;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Handed to the spawned function; `cancel` is signalled by `Task::cancel`.
#[derive(Clone)]
pub struct TaskContext {
    pub cancel: CancellationToken,
}

impl TaskContext {
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome<T> {
    Completed(T),
    Cancelled,
    Error(String),
}

pub struct Task<T> {
    token: CancellationToken,
    handle: JoinHandle<TaskOutcome<T>>,
}

impl<T: Send + 'static> Task<T> {
    /// Run `f(ctx)` on the current tokio runtime. `f`'s own future is raced
    /// against cancellation — if the token fires first, the task resolves
    /// to `Cancelled` without waiting for `f` to notice (well-behaved `f`
    /// implementations should still check `ctx.is_cancelled()` to stop
    /// doing work promptly).
    pub fn spawn<F, Fut>(f: F) -> Self
    where
        F: FnOnce(TaskContext) -> Fut + Send + 'static,
        Fut: StdFuture<Output = Result<T, String>> + Send + 'static,
        T: Send + 'static,
    {
        let token = CancellationToken::new();
        let ctx = TaskContext {
            cancel: token.clone(),
        };
        let race_token = token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = race_token.cancelled() => TaskOutcome::Cancelled,
                res = f(ctx) => match res {
                    Ok(v) => TaskOutcome::Completed(v),
                    Err(e) => TaskOutcome::Error(e),
                },
            }
        });
        Self { token, handle }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Await the task's terminal state.
    pub async fn result(self) -> TaskOutcome<T> {
        self.handle
            .await
            .unwrap_or_else(|e| TaskOutcome::Error(format!("task panicked: {e}")))
    }

    /// Force the task to a terminal state: signals cancellation then waits.
    pub async fn cancel_and_wait(self) -> TaskOutcome<T> {
        self.cancel();
        self.result().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_normally() {
        let t = Task::spawn(|_ctx| async move { Ok::<_, String>(42) });
        assert_eq!(t.result().await, TaskOutcome::Completed(42));
    }

    #[tokio::test]
    async fn cancel_and_wait_yields_cancelled() {
        let t = Task::spawn(|ctx| async move {
            ctx.cancelled().await;
            Ok::<_, String>(0)
        });
        assert_eq!(t.cancel_and_wait().await, TaskOutcome::Cancelled);
    }

    #[tokio::test]
    async fn error_is_propagated() {
        let t: Task<i32> = Task::spawn(|_ctx| async move { Err("boom".to_string()) });
        assert_eq!(t.result().await, TaskOutcome::Error("boom".into()));
    }
}
