//! `StreamChannel<T>`: a thin `{write, close, stream}` wrapper over
//! `IdentityTransform`. `close()` is idempotent; writes after close fail.

use crate::identity::{IdentityTransform, StreamError};

pub struct StreamChannel<T> {
    inner: IdentityTransform<T>,
}

impl<T> StreamChannel<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: IdentityTransform::new(capacity),
        }
    }

    pub async fn write(&self, item: T) -> Result<(), StreamError> {
        self.inner.writable.write(item).await
    }

    pub async fn close(&self) {
        self.inner.writable.close().await;
    }

    pub async fn stream_next(&self) -> Result<Option<T>, StreamError> {
        self.inner.readable.next().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn close_is_idempotent_and_blocks_further_writes() {
        let ch = StreamChannel::<i32>::new(2);
        ch.write(1).await.unwrap();
        ch.close().await;
        ch.close().await;
        assert!(ch.write(2).await.is_err());
        assert_eq!(ch.stream_next().await.unwrap(), Some(1));
        assert_eq!(ch.stream_next().await.unwrap(), None);
    }
}
