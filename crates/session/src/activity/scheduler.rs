//! Speech queue ordering (§4.7.1): a min-heap keyed by `(-priority,
//! insertion_seq)`, realized as a max-heap over the reversed comparison so
//! `std::collections::BinaryHeap::pop` returns the highest-priority,
//! earliest-arrived speech directly.

use std::cmp::Ordering;
use std::sync::Arc;

use va_domain::SpeechHandle;

pub struct QueuedSpeech {
    pub seq: u64,
    pub priority: i32,
    pub handle: Arc<SpeechHandle>,
}

impl PartialEq for QueuedSpeech {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}
impl Eq for QueuedSpeech {}

impl PartialOrd for QueuedSpeech {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedSpeech {
    /// Higher priority sorts greater (popped first). Within equal priority,
    /// the earlier-arrived (smaller `seq`) sorts greater — FIFO tiebreak.
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority.cmp(&other.priority).then_with(|| other.seq.cmp(&self.seq))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BinaryHeap;
    use va_domain::chat::ChatContext;

    fn handle(id: &str) -> Arc<SpeechHandle> {
        Arc::new(SpeechHandle::new(id, 0, true, 0, ChatContext::new(), None))
    }

    #[test]
    fn higher_priority_pops_first() {
        let mut heap = BinaryHeap::new();
        heap.push(QueuedSpeech { seq: 0, priority: 1, handle: handle("low") });
        heap.push(QueuedSpeech { seq: 1, priority: 5, handle: handle("high") });
        assert_eq!(heap.pop().unwrap().handle.id, "high");
        assert_eq!(heap.pop().unwrap().handle.id, "low");
    }

    #[test]
    fn equal_priority_breaks_ties_fifo() {
        let mut heap = BinaryHeap::new();
        heap.push(QueuedSpeech { seq: 2, priority: 3, handle: handle("second") });
        heap.push(QueuedSpeech { seq: 1, priority: 3, handle: handle("first") });
        assert_eq!(heap.pop().unwrap().handle.id, "first");
        assert_eq!(heap.pop().unwrap().handle.id, "second");
    }

    #[test]
    fn lower_priority_never_preempts_higher() {
        let mut heap = BinaryHeap::new();
        heap.push(QueuedSpeech { seq: 0, priority: 10, handle: handle("urgent") });
        for seq in 1..5 {
            heap.push(QueuedSpeech { seq, priority: 0, handle: handle("normal") });
        }
        assert_eq!(heap.pop().unwrap().handle.id, "urgent");
    }
}
