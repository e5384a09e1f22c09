//! `MultiInputStream<T>`: fans multiple input streams into one output.
//! An error on one input silently removes that input — the output is
//! never errored by it. The output closes only via an explicit `close()`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::identity::{IdentityTransform, Readable, StreamError, Writable};

pub struct MultiInputStream<T> {
    output: Arc<IdentityTransform<T>>,
    inputs: Mutex<HashMap<u64, CancellationToken>>,
    next_id: AtomicU64,
}

impl<T: Send + 'static> MultiInputStream<T> {
    pub fn new(output_capacity: usize) -> Self {
        Self {
            output: Arc::new(IdentityTransform::new(output_capacity)),
            inputs: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn readable(&self) -> &Readable<T> {
        &self.output.readable
    }

    pub fn writable(&self) -> &Writable<T> {
        &self.output.writable
    }

    /// Starts a pump copying `input` into the shared output. Returns an id
    /// usable with `remove_input_stream`.
    pub async fn add_input_stream(&self, input: Arc<Readable<T>>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let token = CancellationToken::new();
        self.inputs.lock().await.insert(id, token.clone());

        let output = self.output.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    item = input.next() => match item {
                        Ok(Some(v)) => {
                            if output.writable.write(v).await.is_err() {
                                // Output closed — nothing left to pump into.
                                break;
                            }
                        }
                        Ok(None) => break,
                        Err(_) => {
                            // This input errored; it is silently removed,
                            // the output is left untouched.
                            break;
                        }
                    },
                }
            }
        });

        id
    }

    /// Detaches one input, releasing its reader, without closing the output.
    pub async fn remove_input_stream(&self, id: u64) {
        if let Some(token) = self.inputs.lock().await.remove(&id) {
            token.cancel();
        }
    }

    /// Closes the output. Only way the output stream ever closes.
    pub async fn close(&self) {
        let mut guard = self.inputs.lock().await;
        for (_, token) in guard.drain() {
            token.cancel();
        }
        drop(guard);
        self.output.writable.close().await;
    }

    pub async fn next(&self) -> Result<Option<T>, StreamError> {
        self.output.readable.next().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn error_on_one_input_leaves_output_open_and_others_unaffected() {
        let multi = MultiInputStream::<i32>::new(16);

        let good = IdentityTransform::<i32>::new(4);
        good.writable.write(1).await.unwrap();
        let good_readable = good.readable.clone();
        multi.add_input_stream(good_readable).await;

        let bad = IdentityTransform::<i32>::new(4);
        bad.writable.abort("simulated provider failure");
        let bad_readable = bad.readable.clone();
        multi.add_input_stream(bad_readable).await;

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        // The good input's item still arrives; the output was not errored
        // by the bad input.
        let item = multi.next().await;
        assert_eq!(item.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn output_closes_only_via_explicit_close() {
        let multi = MultiInputStream::<i32>::new(4);
        let input = IdentityTransform::<i32>::new(4);
        input.writable.close().await; // input ends immediately
        multi.add_input_stream(input.readable.clone()).await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;

        // Input ended, but output is not closed — writable() still accepts.
        assert!(multi.writable().write(5).await.is_ok());

        multi.close().await;
        assert!(multi.writable().write(6).await.is_err());
    }

    #[tokio::test]
    async fn remove_input_stream_detaches_without_closing_output() {
        let multi = MultiInputStream::<i32>::new(4);
        let input = IdentityTransform::<i32>::new(4);
        let id = multi.add_input_stream(input.readable.clone()).await;
        multi.remove_input_stream(id).await;
        assert!(multi.writable().write(1).await.is_ok());
    }
}
