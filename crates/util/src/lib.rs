//! Futures, cancellable tasks, mutexes/semaphores, queues, retry math and
//! short ids shared across the runtime (§4.2).

pub mod future;
pub mod queue;
pub mod retry;
pub mod shortid;
pub mod sync;
pub mod task;

pub use future::{Future, FutureHandle, Outcome, SharedFuture};
pub use queue::Queue;
pub use retry::{interval_for_retry, RetryOptions};
pub use shortid::shortuuid;
pub use sync::{Mutex, MutexGuard, Semaphore, SemaphorePermit};
pub use task::{Task, TaskContext, TaskOutcome};
