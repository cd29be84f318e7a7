//! Durable market-data archive used by the backtester and replay feeder:
//! a seam between the hot path and whatever persistence layer a deployment
//! chooses to put behind it.

use crate::domain::{BboQuote, MarketCode, MarketQuote, OrderImbalance, Security, Sequence, Sequenced, TimeAndSale};
use std::collections::HashMap;
use std::sync::RwLock;

/// Bounded, paged access to a security's historical market-data streams.
/// `after` is exclusive: only sequences strictly greater are returned.
/// A production implementation backs this with SQL/columnar storage; this
/// crate ships only the in-memory reference below, used by tests and the
/// backtester's own harness.
pub trait HistoricalDataStore: Send + Sync {
    fn load_bbo(&self, security: &Security, after: Sequence, limit: usize) -> Vec<Sequenced<BboQuote>>;
    fn load_market_quotes(&self, security: &Security, after: Sequence, limit: usize) -> Vec<Sequenced<MarketQuote>>;
    fn load_time_and_sales(&self, security: &Security, after: Sequence, limit: usize) -> Vec<Sequenced<TimeAndSale>>;
    fn load_order_imbalances(&self, market: &MarketCode, after: Sequence, limit: usize) -> Vec<Sequenced<OrderImbalance>>;

    fn store_bbo(&self, security: &Security, value: Sequenced<BboQuote>);
    fn store_market_quote(&self, security: &Security, value: Sequenced<MarketQuote>);
    fn store_time_and_sale(&self, security: &Security, value: Sequenced<TimeAndSale>);
    fn store_order_imbalance(&self, market: &MarketCode, value: Sequenced<OrderImbalance>);
}

#[derive(Default)]
struct SecurityArchive {
    bbo: Vec<Sequenced<BboQuote>>,
    market_quotes: Vec<Sequenced<MarketQuote>>,
    time_and_sales: Vec<Sequenced<TimeAndSale>>,
}

/// An in-memory reference implementation, sorted by sequence on insert so
/// paged loads can binary-search their starting point.
#[derive(Default)]
pub struct InMemoryHistoricalDataStore {
    archives: RwLock<HashMap<Security, SecurityArchive>>,
    imbalances: RwLock<HashMap<MarketCode, Vec<Sequenced<OrderImbalance>>>>,
}

impl InMemoryHistoricalDataStore {
    pub fn new() -> Self {
        InMemoryHistoricalDataStore::default()
    }

    fn page<T: Clone>(items: &[Sequenced<T>], after: Sequence, limit: usize) -> Vec<Sequenced<T>> {
        let start = items.partition_point(|item| item.sequence <= after);
        items[start..].iter().take(limit).cloned().collect()
    }
}

impl HistoricalDataStore for InMemoryHistoricalDataStore {
    fn load_bbo(&self, security: &Security, after: Sequence, limit: usize) -> Vec<Sequenced<BboQuote>> {
        let archives = self.archives.read().unwrap();
        archives.get(security).map_or_else(Vec::new, |a| Self::page(&a.bbo, after, limit))
    }

    fn load_market_quotes(&self, security: &Security, after: Sequence, limit: usize) -> Vec<Sequenced<MarketQuote>> {
        let archives = self.archives.read().unwrap();
        archives.get(security).map_or_else(Vec::new, |a| Self::page(&a.market_quotes, after, limit))
    }

    fn load_time_and_sales(&self, security: &Security, after: Sequence, limit: usize) -> Vec<Sequenced<TimeAndSale>> {
        let archives = self.archives.read().unwrap();
        archives.get(security).map_or_else(Vec::new, |a| Self::page(&a.time_and_sales, after, limit))
    }

    fn store_bbo(&self, security: &Security, value: Sequenced<BboQuote>) {
        self.archives.write().unwrap().entry(security.clone()).or_default().bbo.push(value);
    }

    fn store_market_quote(&self, security: &Security, value: Sequenced<MarketQuote>) {
        self.archives.write().unwrap().entry(security.clone()).or_default().market_quotes.push(value);
    }

    fn store_time_and_sale(&self, security: &Security, value: Sequenced<TimeAndSale>) {
        self.archives.write().unwrap().entry(security.clone()).or_default().time_and_sales.push(value);
    }

    fn load_order_imbalances(&self, market: &MarketCode, after: Sequence, limit: usize) -> Vec<Sequenced<OrderImbalance>> {
        let imbalances = self.imbalances.read().unwrap();
        imbalances.get(market).map_or_else(Vec::new, |i| Self::page(i, after, limit))
    }

    fn store_order_imbalance(&self, market: &MarketCode, value: Sequenced<OrderImbalance>) {
        self.imbalances.write().unwrap().entry(market.clone()).or_default().push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Quote, Side};
    use chrono::Utc;

    fn bbo(price: i64) -> BboQuote {
        let quote = Quote { price: crate::domain::Money::from_raw(price as i128), size: 100, side: Side::Bid };
        BboQuote { ask: quote, bid: quote, timestamp: Utc::now() }
    }

    #[test]
    fn paged_load_resumes_after_last_sequence() {
        let store = InMemoryHistoricalDataStore::new();
        let security = Security::new("ABC", "NSDQ", "US");
        for i in 0..5 {
            store.store_bbo(&security, Sequenced { value: bbo(i), sequence: Sequence(i as u64), timestamp: Utc::now() });
        }
        let first_page = store.load_bbo(&security, Sequence(0), 2);
        assert_eq!(first_page.len(), 2);
        assert_eq!(first_page[0].sequence, Sequence(1));

        let next_page = store.load_bbo(&security, first_page.last().unwrap().sequence, 10);
        assert_eq!(next_page.len(), 2);
        assert_eq!(next_page[0].sequence, Sequence(3));
    }

    #[test]
    fn unknown_security_returns_empty() {
        let store = InMemoryHistoricalDataStore::new();
        let security = Security::new("NONE", "NSDQ", "US");
        assert!(store.load_bbo(&security, Sequence(0), 10).is_empty());
    }

    #[test]
    fn order_imbalances_are_paged_per_market() {
        let store = InMemoryHistoricalDataStore::new();
        let market = crate::domain::MarketCode("NSDQ".into());
        let security = Security::new("ABC", "NSDQ", "US");
        let imbalance = crate::domain::OrderImbalance {
            security: security.clone(),
            side: Side::Bid,
            size: 500,
            reference_price: crate::domain::Money::from_raw(100),
            timestamp: Utc::now(),
        };
        for i in 0..3 {
            store.store_order_imbalance(&market, Sequenced { value: imbalance.clone(), sequence: Sequence(i), timestamp: Utc::now() });
        }
        let page = store.load_order_imbalances(&market, Sequence(0), 10);
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].sequence, Sequence(1));

        let other_market = crate::domain::MarketCode("ARCA".into());
        assert!(store.load_order_imbalances(&other_market, Sequence(0), 10).is_empty());
    }
}
