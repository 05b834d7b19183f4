use std::sync::atomic::{AtomicU64, Ordering};

/// Identifies one issued request and the state it was built against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub seq: u64,
    based_on: u64,
}

/// Orders responses of one feed.
///
/// A response is applied only when nothing else has been applied since its
/// query was built. Anything else either arrived late or overlaps data
/// that is already stored, and is dropped; the next cycle re-queries from
/// the current high-water mark.
#[derive(Debug, Default)]
pub struct RequestSequencer {
    next: AtomicU64,
    applied: AtomicU64,
}

impl RequestSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Must be called while the state used to build the query is locked.
    pub fn issue(&self) -> Ticket {
        let seq = self.next.fetch_add(1, Ordering::AcqRel) + 1;
        Ticket {
            seq,
            based_on: self.applied.load(Ordering::Acquire),
        }
    }

    /// Marks `ticket` applied if it is still current.
    pub fn accept(&self, ticket: Ticket) -> bool {
        self.applied
            .compare_exchange(ticket.based_on, ticket.seq, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn last_applied(&self) -> u64 {
        self.applied.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_order_responses_apply() {
        let sequencer = RequestSequencer::new();
        let first = sequencer.issue();
        assert!(sequencer.accept(first));
        let second = sequencer.issue();
        assert!(sequencer.accept(second));
        assert_eq!(sequencer.last_applied(), second.seq);
    }

    #[test]
    fn slow_earlier_response_is_discarded() {
        let sequencer = RequestSequencer::new();
        let slow = sequencer.issue();
        let fast = sequencer.issue();

        assert!(sequencer.accept(fast));
        assert!(!sequencer.accept(slow));
        assert_eq!(sequencer.last_applied(), fast.seq);
    }

    #[test]
    fn overlapping_later_response_is_discarded() {
        let sequencer = RequestSequencer::new();
        let first = sequencer.issue();
        let overlapping = sequencer.issue();

        assert!(sequencer.accept(first));
        assert!(!sequencer.accept(overlapping));

        let fresh = sequencer.issue();
        assert!(sequencer.accept(fresh));
    }

    #[test]
    fn failed_request_does_not_block_others() {
        let sequencer = RequestSequencer::new();
        let _failed = sequencer.issue();
        let next = sequencer.issue();
        assert!(sequencer.accept(next));
    }
}
