//! Unbounded FIFO queue with an awaitable `get` (§4.2). `put` never blocks.

use tokio::sync::mpsc;

pub struct Queue<T> {
    tx: mpsc::UnboundedSender<T>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<T>>,
}

impl<T> Queue<T> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: tokio::sync::Mutex::new(rx),
        }
    }

    pub fn put(&self, item: T) {
        // An unbounded sender only errs once every receiver is dropped; the
        // queue owns its own receiver for its whole lifetime, so this can't
        // happen while `self` is alive.
        let _ = self.tx.send(item);
    }

    /// Await the next item. Returns `None` once the queue is closed (all
    /// senders dropped and the buffer drained) — never happens while a
    /// `Queue` handle is held, since `Queue` owns the only sender it hands
    /// out via `put`.
    pub async fn get(&self) -> Option<T> {
        self.rx.lock().await.recv().await
    }
}

impl<T> Default for Queue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fifo_order() {
        let q = Queue::new();
        q.put(1);
        q.put(2);
        q.put(3);
        assert_eq!(q.get().await, Some(1));
        assert_eq!(q.get().await, Some(2));
        assert_eq!(q.get().await, Some(3));
    }

    #[tokio::test]
    async fn put_never_blocks() {
        let q = Queue::new();
        for i in 0..10_000 {
            q.put(i);
        }
        assert_eq!(q.get().await, Some(0));
    }
}
