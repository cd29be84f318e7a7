//! Concurrent, per-security market-data registry. Each security's entry is
//! guarded by its own mutex so publishing to one security never blocks
//! another, with the top-level index itself sharded via `dashmap::DashMap`.

use super::entry::{SecurityEntry, SecuritySnapshot};
use crate::domain::{
    BboQuote, MarketCode, MarketQuote, Money, OrderImbalance, Security, SecurityTechnicals, Sequence, Sequencer, Side,
    TimeAndSale,
};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Mutex;
use tracing::trace;

pub struct SecurityRegistry {
    entries: DashMap<Security, Mutex<SecurityEntry>>,
    imbalance_sequencers: DashMap<MarketCode, Mutex<Sequencer>>,
}

impl Default for SecurityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityRegistry {
    pub fn new() -> Self {
        SecurityRegistry { entries: DashMap::new(), imbalance_sequencers: DashMap::new() }
    }

    fn entry_or_insert(&self, security: &Security, timestamp: DateTime<Utc>) -> dashmap::mapref::one::Ref<'_, Security, Mutex<SecurityEntry>> {
        if !self.entries.contains_key(security) {
            self.entries
                .entry(security.clone())
                .or_insert_with(|| Mutex::new(SecurityEntry::new(security.clone(), Money::ZERO, timestamp)));
        }
        self.entries.get(security).unwrap()
    }

    pub fn publish_bbo(&self, security: &Security, bbo: BboQuote) -> Sequence {
        let entry = self.entry_or_insert(security, bbo.timestamp);
        let sequence = entry.lock().unwrap().publish_bbo(bbo);
        trace!(%security, %sequence, "published bbo");
        sequence
    }

    pub fn publish_market_quote(&self, security: &Security, quote: MarketQuote) -> Sequence {
        let entry = self.entry_or_insert(security, quote.timestamp);
        entry.lock().unwrap().publish_market_quote(quote)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn update_book_quote(
        &self,
        security: &Security,
        side: Side,
        price: Money,
        mpid: &str,
        is_primary_mpid: bool,
        market: MarketCode,
        size_delta: i64,
        source_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Sequence {
        let entry = self.entry_or_insert(security, timestamp);
        entry.lock().unwrap().update_book_quote(side, price, mpid, is_primary_mpid, market, size_delta, source_id, timestamp)
    }

    pub fn publish_time_and_sale(&self, security: &Security, print: TimeAndSale) -> Sequence {
        let entry = self.entry_or_insert(security, print.timestamp);
        entry.lock().unwrap().publish_time_and_sale(print)
    }

    pub fn publish_order_imbalance(&self, imbalance: OrderImbalance) -> Sequence {
        let sequencer = self
            .imbalance_sequencers
            .entry(imbalance.security.market.clone())
            .or_insert_with(|| Mutex::new(Sequencer::new()));
        sequencer.lock().unwrap().increment_next_sequence()
    }

    /// Returns `None` if the security has never been published to, distinct
    /// from an all-zero snapshot of a quiet security.
    pub fn load_snapshot(&self, security: &Security) -> Option<SecuritySnapshot> {
        self.entries.get(security).map(|e| e.lock().unwrap().snapshot())
    }

    pub fn load_technicals(&self, security: &Security) -> Option<SecurityTechnicals> {
        self.entries.get(security).map(|e| e.lock().unwrap().technicals())
    }

    /// Removes every book entry tagged with `source_id` across every
    /// security, for use when a feed source disconnects.
    pub fn clear_source(&self, source_id: &str) {
        for entry in self.entries.iter() {
            entry.value().lock().unwrap().clear(source_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MarketCode, Quote};

    fn security() -> Security {
        Security::new("TEST", "NSDQ", "US")
    }

    #[test]
    fn load_snapshot_is_none_before_any_publish() {
        let registry = SecurityRegistry::new();
        assert!(registry.load_snapshot(&security()).is_none());
    }

    #[test]
    fn bbo_sequences_strictly_increase() {
        let registry = SecurityRegistry::new();
        let sec = security();
        let bbo = BboQuote { ask: Quote::empty(Side::Ask), bid: Quote::empty(Side::Bid), timestamp: Utc::now() };
        let s1 = registry.publish_bbo(&sec, bbo);
        let s2 = registry.publish_bbo(&sec, bbo);
        assert!(s1 < s2);
    }

    #[test]
    fn clear_source_removes_entries_across_securities() {
        let registry = SecurityRegistry::new();
        let sec = security();
        registry.update_book_quote(&sec, Side::Bid, Money::from_raw(100), "A", false, MarketCode("NSDQ".into()), 10, "feed-x", Utc::now());
        registry.clear_source("feed-x");
        assert!(registry.load_snapshot(&sec).unwrap().bids.is_empty());
    }
}
