//! `DeferredReadableStream<T>`: a readable whose source arrives later via
//! `set_source`. Reads issued before a source is set park until one
//! arrives; replacing an already-set source is an error.

use std::sync::Arc;

use tokio::sync::{Notify, RwLock};

use crate::identity::{Readable, StreamError};

pub struct DeferredReadableStream<T> {
    source: RwLock<Option<Arc<Readable<T>>>>,
    notify: Notify,
}

#[derive(Debug, thiserror::Error)]
pub enum DeferredError {
    #[error("source already set")]
    SourceAlreadySet,
}

impl<T> DeferredReadableStream<T> {
    pub fn new() -> Self {
        Self {
            source: RwLock::new(None),
            notify: Notify::new(),
        }
    }

    pub async fn set_source(&self, source: Arc<Readable<T>>) -> Result<(), DeferredError> {
        let mut guard = self.source.write().await;
        if guard.is_some() {
            return Err(DeferredError::SourceAlreadySet);
        }
        *guard = Some(source);
        drop(guard);
        self.notify.notify_waiters();
        Ok(())
    }

    pub async fn has_source(&self) -> bool {
        self.source.read().await.is_some()
    }

    /// Parks until a source is set, then delegates to it.
    pub async fn next(&self) -> Result<Option<T>, StreamError> {
        loop {
            {
                let guard = self.source.read().await;
                if let Some(src) = guard.as_ref() {
                    let src = src.clone();
                    drop(guard);
                    return src.next().await;
                }
            }
            self.notify.notified().await;
        }
    }
}

impl<T> Default for DeferredReadableStream<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityTransform;

    #[tokio::test]
    async fn reads_park_until_source_set() {
        let deferred = Arc::new(DeferredReadableStream::<i32>::new());
        let d2 = deferred.clone();
        let reader = tokio::spawn(async move { d2.next().await });

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!reader.is_finished());

        let transform = IdentityTransform::<i32>::new(4);
        transform.writable.write(99).await.unwrap();
        let readable = transform.readable.clone();
        deferred.set_source(readable).await.unwrap();

        let result = reader.await.unwrap();
        assert_eq!(result.unwrap(), Some(99));
    }

    #[tokio::test]
    async fn replacing_source_is_an_error() {
        let deferred = DeferredReadableStream::<i32>::new();
        let t1 = IdentityTransform::<i32>::new(1);
        deferred.set_source(t1.readable.clone()).await.unwrap();
        let t2 = IdentityTransform::<i32>::new(1);
        assert!(deferred.set_source(t2.readable.clone()).await.is_err());
    }
}
