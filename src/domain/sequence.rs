use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A monotone ordinal assigned to a published value within one (index,
/// stream) pair, used for resumable subscriptions and deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Sequence(pub u64);

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Wraps a published value with the sequence it was assigned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequenced<T> {
    pub value: T,
    pub sequence: Sequence,
    pub timestamp: DateTime<Utc>,
}

/// Assigns strictly increasing sequences to values published on one stream.
///
/// Hands out a fresh ordinal either by wrapping a brand-new value
/// (`make_sequenced`) or by bumping the ordinal in place when an existing
/// book entry is merely updated (`increment_next_sequence`) — a distinction
/// the registry relies on when accumulating in-place book-quote updates
/// without re-wrapping them.
#[derive(Debug, Default)]
pub struct Sequencer {
    next: u64,
}

impl Sequencer {
    pub fn new() -> Self {
        Sequencer { next: 0 }
    }

    /// Seeds the sequencer to resume after `last`, e.g. from a historical
    /// store's `load_initial_sequences`.
    pub fn resume_after(last: u64) -> Self {
        Sequencer { next: last }
    }

    pub fn make_sequenced<T>(&mut self, value: T, timestamp: DateTime<Utc>) -> Sequenced<T> {
        let sequence = Sequence(self.next);
        self.next += 1;
        Sequenced { value, sequence, timestamp }
    }

    /// Bumps the ordinal without producing a new wrapper, for in-place
    /// mutation of an already-published entry.
    pub fn increment_next_sequence(&mut self) -> Sequence {
        let sequence = Sequence(self.next);
        self.next += 1;
        sequence
    }

    pub fn peek_next(&self) -> Sequence {
        Sequence(self.next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequences_strictly_increase() {
        let mut s = Sequencer::new();
        let a = s.make_sequenced(1, Utc::now());
        let b = s.make_sequenced(2, Utc::now());
        assert!(a.sequence < b.sequence);
    }

    #[test]
    fn resume_after_continues_from_last() {
        let mut s = Sequencer::resume_after(5);
        assert_eq!(s.peek_next(), Sequence(5));
        let v = s.make_sequenced((), Utc::now());
        assert_eq!(v.sequence, Sequence(5));
        assert_eq!(s.peek_next(), Sequence(6));
    }
}
