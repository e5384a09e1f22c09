//! A one-shot value cell with multiple wakeable awaiters (§4.2).
//!
//! Built on `tokio::sync::watch` rather than `oneshot` because the spec
//! requires many awaiters — `watch::Receiver` can be cloned freely and each
//! clone observes the same resolution exactly once.

use std::sync::Arc;

use tokio::sync::watch;

#[derive(Debug, Clone)]
pub enum Outcome<T> {
    Pending,
    Resolved(T),
    Rejected(String),
}

/// A one-shot, multi-awaiter future. Resolving or rejecting an already
/// -settled future is a no-op.
pub struct Future<T: Clone + Send + Sync + 'static> {
    tx: watch::Sender<Outcome<T>>,
    rx: watch::Receiver<Outcome<T>>,
}

impl<T: Clone + Send + Sync + 'static> Future<T> {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(Outcome::Pending);
        Self { tx, rx }
    }

    /// A cheap handle that can await the same resolution independently.
    pub fn handle(&self) -> FutureHandle<T> {
        FutureHandle {
            rx: self.rx.clone(),
        }
    }

    pub fn resolve(&self, value: T) {
        let _ = self.tx.send_if_modified(|cur| {
            if matches!(cur, Outcome::Pending) {
                *cur = Outcome::Resolved(value.clone());
                true
            } else {
                false
            }
        });
    }

    pub fn reject(&self, err: impl Into<String>) {
        let err = err.into();
        let _ = self.tx.send_if_modified(|cur| {
            if matches!(cur, Outcome::Pending) {
                *cur = Outcome::Rejected(err.clone());
                true
            } else {
                false
            }
        });
    }

    pub fn done(&self) -> bool {
        !matches!(*self.rx.borrow(), Outcome::Pending)
    }

    pub async fn wait(&self) -> Outcome<T> {
        self.handle().wait().await
    }
}

impl<T: Clone + Send + Sync + 'static> Default for Future<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A cloneable handle to await a [`Future`]'s resolution.
#[derive(Clone)]
pub struct FutureHandle<T: Clone + Send + Sync + 'static> {
    rx: watch::Receiver<Outcome<T>>,
}

impl<T: Clone + Send + Sync + 'static> FutureHandle<T> {
    pub fn done(&self) -> bool {
        !matches!(*self.rx.borrow(), Outcome::Pending)
    }

    /// Await resolution. If already settled, returns immediately.
    pub async fn wait(mut self) -> Outcome<T> {
        loop {
            {
                let cur = self.rx.borrow();
                if !matches!(*cur, Outcome::Pending) {
                    return cur.clone();
                }
            }
            if self.rx.changed().await.is_err() {
                return Outcome::Rejected("future dropped before resolution".into());
            }
        }
    }
}

/// Shareable variant for call sites that need to clone the whole future
/// (not just a waiting handle) across tasks.
pub type SharedFuture<T> = Arc<Future<T>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_once() {
        let f = Future::<i32>::new();
        f.resolve(1);
        f.resolve(2); // no-op
        match f.wait().await {
            Outcome::Resolved(v) => assert_eq!(v, 1),
            _ => panic!("expected resolved"),
        }
    }

    #[tokio::test]
    async fn multiple_awaiters_wake() {
        let f = Arc::new(Future::<i32>::new());
        let h1 = f.handle();
        let h2 = f.handle();
        let fut = f.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
            fut.resolve(7);
        });
        let (a, b) = tokio::join!(h1.wait(), h2.wait());
        assert!(matches!(a, Outcome::Resolved(7)));
        assert!(matches!(b, Outcome::Resolved(7)));
    }

    #[tokio::test]
    async fn reject_is_observed() {
        let f = Future::<i32>::new();
        f.reject("boom");
        match f.wait().await {
            Outcome::Rejected(msg) => assert_eq!(msg, "boom"),
            _ => panic!("expected rejected"),
        }
    }
}
