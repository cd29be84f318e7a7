//! Indexed subscription fan-out with atomic initialize/commit over the
//! snapshot/real-time seam, so a client sees no gap and no duplicate.

use super::query::Range;
use crate::domain::Sequence;
use dashmap::DashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;

pub trait SequencedValue {
    fn sequence(&self) -> Sequence;
}

enum SubState<T> {
    Buffering(Vec<T>),
    Live,
}

struct Subscription<T> {
    query_id: u64,
    sender: mpsc::UnboundedSender<T>,
    range: Range,
    filter: Arc<dyn Fn(&T) -> bool + Send + Sync>,
    state: SubState<T>,
}

/// Maps an index key (e.g. `Security` for per-security streams, `MarketCode`
/// for market-wide ones) to the set of active subscriptions for it,
/// delivering each published value to every subscription whose range and
/// predicate accept it.
pub struct IndexedSubscriptions<Idx, T> {
    by_index: DashMap<Idx, Mutex<Vec<Subscription<T>>>>,
    next_query_id: AtomicU64,
}

impl<Idx: Eq + Hash, T> Default for IndexedSubscriptions<Idx, T> {
    fn default() -> Self {
        IndexedSubscriptions { by_index: DashMap::new(), next_query_id: AtomicU64::new(1) }
    }
}

impl<Idx: Eq + Hash + Clone, T: Clone + Send + SequencedValue + 'static> IndexedSubscriptions<Idx, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a buffered subscription: real-time values are queued rather
    /// than delivered until [`Self::commit`] replays the historical
    /// snapshot and flushes the buffer without gap or duplicate.
    pub fn open(
        &self,
        index: Idx,
        range: Range,
        filter: Arc<dyn Fn(&T) -> bool + Send + Sync>,
    ) -> (u64, mpsc::UnboundedReceiver<T>) {
        let query_id = self.next_query_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();
        let list = self.by_index.entry(index).or_insert_with(|| Mutex::new(Vec::new()));
        list.lock().unwrap().push(Subscription { query_id, sender, range, filter, state: SubState::Buffering(Vec::new()) });
        (query_id, receiver)
    }

    /// Replays `snapshot_tail` (assumed ordered by sequence), then drains
    /// anything buffered strictly after the snapshot's last sequence, then
    /// switches the subscription to direct real-time delivery.
    pub fn commit(&self, index: &Idx, query_id: u64, snapshot_tail: Vec<T>) {
        let Some(list) = self.by_index.get(index) else { return };
        let mut list = list.lock().unwrap();
        let Some(sub) = list.iter_mut().find(|s| s.query_id == query_id) else { return };
        let last_sequence = snapshot_tail.last().map(|v| v.sequence());
        for value in &snapshot_tail {
            if sub.range.contains(value.sequence()) && (sub.filter)(value) {
                let _ = sub.sender.send(value.clone());
            }
        }
        if let SubState::Buffering(buffered) = std::mem::replace(&mut sub.state, SubState::Live) {
            for value in buffered {
                let after_snapshot = match last_sequence {
                    None => true,
                    Some(last) => value.sequence() > last,
                };
                if after_snapshot && sub.range.contains(value.sequence()) && (sub.filter)(&value) {
                    let _ = sub.sender.send(value);
                }
            }
        }
        debug!(query_id, "subscription committed");
    }

    pub fn publish(&self, index: &Idx, value: T) {
        let Some(list) = self.by_index.get(index) else { return };
        let mut list = list.lock().unwrap();
        for sub in list.iter_mut() {
            if !sub.range.contains(value.sequence()) || !(sub.filter)(&value) {
                continue;
            }
            match &mut sub.state {
                SubState::Live => {
                    let _ = sub.sender.send(value.clone());
                }
                SubState::Buffering(buf) => buf.push(value.clone()),
            }
        }
    }

    pub fn end(&self, index: &Idx, query_id: u64) {
        if let Some(list) = self.by_index.get(index) {
            list.lock().unwrap().retain(|s| s.query_id != query_id);
        }
    }

    /// Removes every subscription across every index owned by `query_ids`,
    /// used when a client disconnects.
    pub fn cancel_all(&self, query_ids: &[(Idx, u64)]) {
        for (index, query_id) in query_ids {
            self.end(index, *query_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Security;

    #[derive(Debug, Clone)]
    struct Tick(Sequence);

    impl SequencedValue for Tick {
        fn sequence(&self) -> Sequence {
            self.0
        }
    }

    fn sec() -> Security {
        Security::new("TEST", "NSDQ", "US")
    }

    #[test]
    fn commit_replays_snapshot_then_buffered_without_duplication() {
        let subs: IndexedSubscriptions<Security, Tick> = IndexedSubscriptions::new();
        let (id, mut rx) = subs.open(sec(), Range::UNBOUNDED, Arc::new(|_| true));
        // Real-time publishes arrive while still buffering.
        subs.publish(&sec(), Tick(Sequence(5)));
        subs.publish(&sec(), Tick(Sequence(6)));
        // Snapshot load completes with sequences up to 5 (duplicating what's buffered).
        subs.commit(&sec(), id, vec![Tick(Sequence(4)), Tick(Sequence(5))]);

        let mut received = Vec::new();
        while let Ok(tick) = rx.try_recv() {
            received.push(tick.0);
        }
        assert_eq!(received, vec![Sequence(4), Sequence(5), Sequence(6)]);
    }

    #[test]
    fn publish_after_commit_delivers_live() {
        let subs: IndexedSubscriptions<Security, Tick> = IndexedSubscriptions::new();
        let (id, mut rx) = subs.open(sec(), Range::UNBOUNDED, Arc::new(|_| true));
        subs.commit(&sec(), id, vec![]);
        subs.publish(&sec(), Tick(Sequence(1)));
        assert_eq!(rx.try_recv().unwrap().0, Sequence(1));
    }

    #[test]
    fn end_removes_subscription() {
        let subs: IndexedSubscriptions<Security, Tick> = IndexedSubscriptions::new();
        let (id, mut rx) = subs.open(sec(), Range::UNBOUNDED, Arc::new(|_| true));
        subs.commit(&sec(), id, vec![]);
        subs.end(&sec(), id);
        subs.publish(&sec(), Tick(Sequence(1)));
        assert!(rx.try_recv().is_err());
    }
}
