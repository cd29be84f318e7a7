//! Schedules market-data replay events against a [`BacktesterEventScheduler`]:
//! a bounded load from the historical store, one event per item at the
//! item's own timestamp, and a continuation load queued after the last
//! item's sequence once the current page is exhausted.

use super::scheduler::BacktesterEventScheduler;
use crate::domain::Sequence;
use crate::historical_store::HistoricalDataStore;
use std::sync::Arc;
use tracing::trace;

/// Drives one historical stream (selected by `load`/`publish`) into the
/// scheduler, starting after `after`. `load` is an [`HistoricalDataStore`]
/// method reference (e.g. `HistoricalDataStore::load_bbo`) bound to a
/// security; `publish` republishes a loaded item to the live registry so
/// downstream subscription flow matches production.
pub fn schedule_replay_stream<T>(
    scheduler: &mut BacktesterEventScheduler,
    store: Arc<dyn HistoricalDataStore>,
    page_size: usize,
    after: Sequence,
    load: Arc<dyn Fn(&dyn HistoricalDataStore, Sequence, usize) -> Vec<crate::domain::Sequenced<T>> + Send + Sync>,
    publish: Arc<dyn Fn(T) + Send + Sync>,
) where
    T: Send + 'static,
{
    let page = load(store.as_ref(), after, page_size);
    if page.is_empty() {
        trace!("replay stream exhausted, no continuation scheduled");
        return;
    }
    let last_sequence = page.last().unwrap().sequence;
    for item in page {
        let publish = publish.clone();
        scheduler.schedule(item.timestamp, move |_scheduler| publish(item.value));
    }
    let continuation_store = store.clone();
    let continuation_load = load.clone();
    let continuation_publish = publish.clone();
    // The continuation is scheduled to run immediately after the page's
    // last item at the scheduler's current logical time, which by the time
    // this closure runs has already advanced past every item just emitted.
    scheduler.schedule(scheduler.now(), move |scheduler| {
        schedule_replay_stream(scheduler, continuation_store, page_size, last_sequence, continuation_load, continuation_publish);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BboQuote, Quote, Security, Sequenced, Side};
    use crate::historical_store::InMemoryHistoricalDataStore;
    use chrono::{Duration, Utc};
    use std::sync::Mutex;

    fn bbo_at(seconds: i64) -> BboQuote {
        BboQuote { ask: Quote::empty(Side::Ask), bid: Quote::empty(Side::Bid), timestamp: Utc::now() + Duration::seconds(seconds) }
    }

    #[test]
    fn replay_schedules_one_event_per_item_and_continues_paging() {
        let security = Security::new("ABC", "NSDQ", "US");
        let concrete_store = InMemoryHistoricalDataStore::new();
        for i in 0..3 {
            let quote = bbo_at(i);
            concrete_store.store_bbo(&security, Sequenced { value: quote, sequence: Sequence(i as u64), timestamp: quote.timestamp });
        }
        let store: Arc<dyn HistoricalDataStore> = Arc::new(concrete_store);

        let start = Utc::now();
        let mut scheduler = BacktesterEventScheduler::new(start, start + Duration::hours(1));
        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = received.clone();

        let security_for_load = security.clone();
        let load: Arc<dyn Fn(&dyn HistoricalDataStore, Sequence, usize) -> Vec<Sequenced<BboQuote>> + Send + Sync> =
            Arc::new(move |store, after, limit| store.load_bbo(&security_for_load, after, limit));
        let publish: Arc<dyn Fn(BboQuote) + Send + Sync> = Arc::new(move |quote| received_clone.lock().unwrap().push(quote.timestamp));

        schedule_replay_stream(&mut scheduler, store, 2, Sequence(0), load, publish);
        scheduler.run();

        assert_eq!(received.lock().unwrap().len(), 3);
    }
}
