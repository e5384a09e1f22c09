//! `SpeechHandle` (§3, §4.7.1): one scheduled utterance. Owned by the
//! activity that created it; chained via `parent` for the LLM→tool-output
//! →LLM re-entry sequence (§4.7.3).

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::chat::ChatContext;

/// Monotonic counter used to break priority ties FIFO. Scoped per-activity
/// by the caller (the scheduler owns the actual sequence); this is just the
/// storage slot on the handle.
pub type InsertionSeq = u64;

pub struct SpeechHandle {
    pub id: String,
    pub priority: i32,
    pub allow_interruptions: bool,
    /// Depth in the tool-reply chain; 0 for a root speech, parent.depth+1 for
    /// a synthesized follow-up. Compared against `max_tool_steps`.
    pub depth: u32,
    /// Chat-ctx snapshot this speech was generated from (deep copy taken
    /// before the LLM call that produced it).
    pub chat_ctx: ChatContext,
    pub parent: Option<Arc<SpeechHandle>>,

    interrupted: AtomicBool,
    scheduled: AtomicBool,
    generation_done: AtomicBool,
    playout_done: AtomicBool,
    /// -1 until the speech starts playing, then millis-since-epoch.
    started_at_ms: AtomicI64,
    cancel: CancellationToken,
}

impl SpeechHandle {
    pub fn new(
        id: impl Into<String>,
        priority: i32,
        allow_interruptions: bool,
        depth: u32,
        chat_ctx: ChatContext,
        parent: Option<Arc<SpeechHandle>>,
    ) -> Self {
        Self {
            id: id.into(),
            priority,
            allow_interruptions,
            depth,
            chat_ctx,
            parent,
            interrupted: AtomicBool::new(false),
            scheduled: AtomicBool::new(false),
            generation_done: AtomicBool::new(false),
            playout_done: AtomicBool::new(false),
            started_at_ms: AtomicI64::new(-1),
            cancel: CancellationToken::new(),
        }
    }

    /// A token cancelled exactly when `interrupt()` is called — threaded
    /// into the speech's generation/playout tasks and any tool executors
    /// run on its behalf.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
        self.cancel.cancel();
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    pub fn mark_scheduled(&self) {
        self.scheduled.store(true, Ordering::SeqCst);
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled.load(Ordering::SeqCst)
    }

    pub fn mark_started(&self, now_ms: i64) {
        self.started_at_ms.store(now_ms, Ordering::SeqCst);
    }

    /// `None` if the speech never started playing.
    pub fn started_at_ms(&self) -> Option<i64> {
        match self.started_at_ms.load(Ordering::SeqCst) {
            -1 => None,
            v => Some(v),
        }
    }

    pub fn mark_generation_done(&self) {
        self.generation_done.store(true, Ordering::SeqCst);
    }

    pub fn is_generation_done(&self) -> bool {
        self.generation_done.load(Ordering::SeqCst)
    }

    pub fn mark_playout_done(&self) {
        self.playout_done.store(true, Ordering::SeqCst);
    }

    /// `true` once playout has completed, whether by finishing naturally or
    /// by interruption — this is what the scheduler's main loop waits on.
    pub fn is_done(&self) -> bool {
        self.playout_done.load(Ordering::SeqCst) || self.is_interrupted()
    }
}

impl std::fmt::Debug for SpeechHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechHandle")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("depth", &self.depth)
            .field("interrupted", &self.is_interrupted())
            .field("scheduled", &self.is_scheduled())
            .finish()
    }
}
