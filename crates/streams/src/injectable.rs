//! `InjectableStream<T>`: merges a source stream with an inline channel of
//! injected items. Injection after close fails. `cancel(reason)` aborts
//! both the merged output and the injection channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::identity::{IdentityTransform, Readable, StreamError};

pub struct InjectableStream<T> {
    source: Arc<Readable<T>>,
    injected: IdentityTransform<T>,
    injection_closed: AtomicBool,
    source_done: AtomicBool,
    injection_done: AtomicBool,
    cancel: CancellationToken,
}

impl<T: Send + 'static> InjectableStream<T> {
    pub fn new(source: Arc<Readable<T>>, inject_capacity: usize) -> Self {
        Self {
            source,
            injected: IdentityTransform::new(inject_capacity),
            injection_closed: AtomicBool::new(false),
            source_done: AtomicBool::new(false),
            injection_done: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    /// Writes an item into the injection channel. Fails once the injection
    /// side has been closed or the stream cancelled.
    pub async fn inject(&self, item: T) -> Result<(), StreamError> {
        if self.injection_closed.load(Ordering::SeqCst) {
            return Err(StreamError::Closed);
        }
        self.injected.writable.write(item).await
    }

    /// Stops accepting injected items; the source keeps flowing.
    pub async fn close_injection(&self) {
        self.injection_closed.store(true, Ordering::SeqCst);
        self.injected.writable.close().await;
    }

    /// Aborts both the source read and the injection channel.
    pub fn cancel(&self, reason: impl Into<String>) {
        let reason = reason.into();
        self.injection_closed.store(true, Ordering::SeqCst);
        self.injected.writable.abort(reason.clone());
        self.cancel.cancel();
        tracing::debug!(reason, "injectable stream cancelled");
    }

    /// Next merged item, drawn from whichever side is ready. Ends only once
    /// both the source and the injection channel are exhausted.
    pub async fn next(&self) -> Result<Option<T>, StreamError> {
        loop {
            let source_done = self.source_done.load(Ordering::SeqCst);
            let injection_done = self.injection_done.load(Ordering::SeqCst);

            if source_done && injection_done {
                return Ok(None);
            }

            if injection_done {
                return self.next_from_source_only().await;
            }
            if source_done {
                match self.next_from_injection_only().await {
                    Ok(Some(v)) => return Ok(Some(v)),
                    Ok(None) => continue,
                    Err(e) => return Err(e),
                }
            }

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    return Err(StreamError::Aborted("injectable stream cancelled".into()));
                }
                item = self.injected.readable.next() => {
                    match item {
                        Ok(Some(v)) => return Ok(Some(v)),
                        Ok(None) => { self.injection_done.store(true, Ordering::SeqCst); continue; }
                        Err(e) => return Err(e),
                    }
                }
                item = self.source.next() => {
                    match item {
                        Ok(Some(v)) => return Ok(Some(v)),
                        Ok(None) => { self.source_done.store(true, Ordering::SeqCst); continue; }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
    }

    async fn next_from_source_only(&self) -> Result<Option<T>, StreamError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(StreamError::Aborted("injectable stream cancelled".into())),
            item = self.source.next() => {
                if matches!(item, Ok(None)) {
                    self.source_done.store(true, Ordering::SeqCst);
                }
                item
            }
        }
    }

    async fn next_from_injection_only(&self) -> Result<Option<T>, StreamError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(StreamError::Aborted("injectable stream cancelled".into())),
            item = self.injected.readable.next() => {
                if matches!(item, Ok(None)) {
                    self.injection_done.store(true, Ordering::SeqCst);
                }
                item
            }
        }
    }
}
