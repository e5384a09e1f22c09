//! Async-capable mutex and semaphore re-exports (§4.2).
//!
//! `tokio::sync::Mutex` and `tokio::sync::Semaphore` already queue waiters
//! FIFO, which is what the spec requires to avoid starvation on drain
//! paths — the "unlock closure" the spec describes is this crate's
//! `MutexGuard`'s `Drop` impl, the idiomatic Rust equivalent of a scoped
//! release.

pub type Mutex<T> = tokio::sync::Mutex<T>;
pub type MutexGuard<'a, T> = tokio::sync::MutexGuard<'a, T>;
pub type Semaphore = tokio::sync::Semaphore;
pub use tokio::sync::SemaphorePermit;
