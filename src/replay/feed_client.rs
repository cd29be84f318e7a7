//! Streams a security's historical BBO stream at wall-clock pace rather
//! than at backtester logical-clock speed, for demos and soak tests run
//! against production-shaped client code. Barrier-aligns every security's
//! stream start so, once replay begins, streams stay time-aligned with
//! each other the way they would have been on the original session.

use crate::clock::TimeClient;
use crate::domain::{BboQuote, Security, Sequence};
use crate::historical_store::HistoricalDataStore;
use chrono::DateTime;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tracing::{debug, info};

const PAGE_SIZE: usize = 1000;
const POLL_QUANTUM: StdDuration = StdDuration::from_secs(1);

/// Receives a replayed quote with its timestamp rewritten to wall-clock
/// "now" at the moment it was released.
pub type ReplaySink = Arc<dyn Fn(Security, BboQuote) + Send + Sync>;

pub struct HistoricalReplayClient {
    store: Arc<dyn HistoricalDataStore>,
    clock: Arc<dyn TimeClient>,
}

impl HistoricalReplayClient {
    pub fn new(store: Arc<dyn HistoricalDataStore>, clock: Arc<dyn TimeClient>) -> Self {
        HistoricalReplayClient { store, clock }
    }

    /// Loads the first page for every security (the barrier), then replays
    /// each stream concurrently, pacing items against `replay_time = start
    /// + (now - open_time)`.
    pub async fn run(&self, securities: Vec<Security>, start_time: DateTime<Utc>, sink: ReplaySink) {
        let open_time = self.clock.now();
        let mut initial_pages = Vec::with_capacity(securities.len());
        for security in &securities {
            let page = self.store.load_bbo(security, Sequence(0), PAGE_SIZE);
            initial_pages.push((security.clone(), page));
        }
        info!(count = initial_pages.len(), "replay streams loaded, starting barrier-aligned playback");

        let mut handles = Vec::with_capacity(initial_pages.len());
        for (security, page) in initial_pages {
            let store = self.store.clone();
            let clock = self.clock.clone();
            let sink = sink.clone();
            handles.push(tokio::spawn(async move {
                replay_security(store, clock, security, page, start_time, open_time, sink).await;
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }
    }
}

async fn replay_security(
    store: Arc<dyn HistoricalDataStore>,
    clock: Arc<dyn TimeClient>,
    security: Security,
    mut page: Vec<crate::domain::Sequenced<BboQuote>>,
    start_time: DateTime<Utc>,
    open_time: DateTime<Utc>,
    sink: ReplaySink,
) {
    loop {
        if page.is_empty() {
            return;
        }
        for item in &page {
            let released_at = loop {
                let now = clock.now();
                let replay_time = start_time + (now - open_time);
                if item.timestamp <= replay_time {
                    break now;
                }
                tokio::time::sleep(POLL_QUANTUM).await;
            };
            debug!(%security, sequence = %item.sequence, "replaying quote");
            let mut quote = item.value;
            quote.timestamp = released_at;
            sink(security.clone(), quote);
        }
        let last_sequence = page.last().unwrap().sequence;
        page = store.load_bbo(&security, last_sequence, PAGE_SIZE);
    }
}
