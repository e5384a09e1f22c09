//! `IdentityTransform<T>`: a bounded in-memory channel with a single writer
//! and single reader. Writes block when the buffer is full; reads block
//! when empty. Closing the writable side signals end-of-stream once the
//! buffer drains; aborting propagates an error to the reader immediately.

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error, Clone)]
pub enum StreamError {
    #[error("stream closed")]
    Closed,
    #[error("stream aborted: {0}")]
    Aborted(String),
}

pub struct Writable<T> {
    tx: Mutex<Option<mpsc::Sender<T>>>,
    abort: CancellationToken,
}

impl<T> Writable<T> {
    /// Blocks while the buffer is full; returns `Err` once closed or aborted.
    pub async fn write(&self, item: T) -> Result<(), StreamError> {
        let guard = self.tx.lock().await;
        match guard.as_ref() {
            Some(tx) => tx.send(item).await.map_err(|_| StreamError::Closed),
            None => Err(StreamError::Closed),
        }
    }

    /// Idempotent: subsequent closes are no-ops.
    pub async fn close(&self) {
        self.tx.lock().await.take();
    }

    pub fn abort(&self, reason: impl Into<String>) {
        self.abort.cancel();
        // Dropping the sender unblocks any pending `readable.next()` so it
        // observes the abort rather than hanging on a full buffer forever.
        if let Ok(mut guard) = self.tx.try_lock() {
            guard.take();
        }
        tracing::debug!(reason = %reason.into(), "stream aborted");
    }

    pub fn is_closed(&self) -> bool {
        self.tx.try_lock().map(|g| g.is_none()).unwrap_or(false)
    }
}

pub struct Readable<T> {
    rx: Mutex<mpsc::Receiver<T>>,
    abort: CancellationToken,
}

impl<T> Readable<T> {
    /// Returns `Ok(None)` at end-of-stream, `Ok(Some(item))` otherwise, or
    /// `Err` if the writable side was aborted.
    pub async fn next(&self) -> Result<Option<T>, StreamError> {
        let mut guard = self.rx.lock().await;
        tokio::select! {
            biased;
            _ = self.abort.cancelled() => Err(StreamError::Aborted("writable aborted".into())),
            item = guard.recv() => Ok(item),
        }
    }
}

pub struct IdentityTransform<T> {
    pub writable: std::sync::Arc<Writable<T>>,
    pub readable: std::sync::Arc<Readable<T>>,
}

impl<T> IdentityTransform<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        let abort = CancellationToken::new();
        Self {
            writable: std::sync::Arc::new(Writable {
                tx: Mutex::new(Some(tx)),
                abort: abort.clone(),
            }),
            readable: std::sync::Arc::new(Readable {
                rx: Mutex::new(rx),
                abort,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn write_then_read_in_order() {
        let t = Arc::new(IdentityTransform::<i32>::new(4));
        t.writable.write(1).await.unwrap();
        t.writable.write(2).await.unwrap();
        assert_eq!(t.readable.next().await.unwrap(), Some(1));
        assert_eq!(t.readable.next().await.unwrap(), Some(2));
    }

    #[tokio::test]
    async fn close_signals_end_of_stream_after_drain() {
        let t = IdentityTransform::<i32>::new(4);
        t.writable.write(1).await.unwrap();
        t.writable.close().await;
        assert_eq!(t.readable.next().await.unwrap(), Some(1));
        assert_eq!(t.readable.next().await.unwrap(), None);
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let t = IdentityTransform::<i32>::new(4);
        t.writable.close().await;
        t.writable.close().await;
        assert!(t.writable.write(1).await.is_err());
    }

    #[tokio::test]
    async fn abort_propagates_error_to_reader() {
        let t = IdentityTransform::<i32>::new(1);
        t.writable.abort("boom");
        assert!(t.readable.next().await.is_err());
    }
}
