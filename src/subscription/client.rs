//! The one surface client sessions actually call: open a bounded, filtered,
//! entitlement-gated query against a security's stream and get back a
//! receiver that replays history then switches to live, with no gap and no
//! duplicate at the seam.

use super::entitlement::{EntitlementSet, MarketDataType};
use super::multiplexer::{IndexedSubscriptions, SequencedValue};
use super::query::{Range, SnapshotLimit};
use crate::domain::{
    BboQuote, BookQuote, MarketCode, MarketQuote, Money, OrderImbalance, Quote, Security, Sequence, Sequenced, Side, TimeAndSale,
};
use crate::historical_store::HistoricalDataStore;
use crate::registry::SecurityRegistry;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;

const LOAD_PAGE_SIZE: usize = 1000;

impl<T: Clone> SequencedValue for Sequenced<T> {
    fn sequence(&self) -> Sequence {
        self.sequence
    }
}

/// A bounded request for one security's stream: the range and snapshot
/// depth to replay, and an optional predicate over delivered values.
pub struct SecurityMarketDataQuery<T> {
    pub index: Security,
    pub range: Range,
    pub snapshot_limit: SnapshotLimit,
    pub filter: Option<Arc<dyn Fn(&T) -> bool + Send + Sync>>,
}

impl<T> SecurityMarketDataQuery<T> {
    pub fn new(index: Security) -> Self {
        SecurityMarketDataQuery { index, range: Range::UNBOUNDED, snapshot_limit: SnapshotLimit::Unlimited, filter: None }
    }
}

/// A bounded request for one market-wide stream (currently only order
/// imbalances), keyed by [`MarketCode`] rather than [`Security`].
pub struct MarketWideDataQuery<T> {
    pub index: MarketCode,
    pub range: Range,
    pub snapshot_limit: SnapshotLimit,
    pub filter: Option<Arc<dyn Fn(&T) -> bool + Send + Sync>>,
}

impl<T> MarketWideDataQuery<T> {
    pub fn new(index: MarketCode) -> Self {
        MarketWideDataQuery { index, range: Range::UNBOUNDED, snapshot_limit: SnapshotLimit::Unlimited, filter: None }
    }
}

/// Identifies a live query so a session can cancel it later, individually or
/// in bulk on disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Bbo,
    MarketQuote,
    BookQuote,
    TimeAndSale,
    OrderImbalance,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryIndex {
    Security(Security),
    Market(MarketCode),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryHandle {
    pub stream: Stream,
    pub index: QueryIndex,
    pub query_id: u64,
}

fn apply_snapshot_limit<T>(mut items: Vec<T>, limit: SnapshotLimit) -> Vec<T> {
    match limit {
        SnapshotLimit::Unlimited => items,
        SnapshotLimit::Head(n) => {
            items.truncate(n);
            items
        }
        SnapshotLimit::Tail(n) => {
            let len = items.len();
            if len > n {
                items.drain(0..len - n);
            }
            items
        }
    }
}

fn load_all<Idx, T: Clone>(
    store: &dyn HistoricalDataStore,
    index: &Idx,
    range: Range,
    load: impl Fn(&dyn HistoricalDataStore, &Idx, Sequence, usize) -> Vec<Sequenced<T>>,
) -> Vec<Sequenced<T>> {
    let mut after = range.start.map(|s| Sequence(s.0.saturating_sub(1))).unwrap_or(Sequence(0));
    let mut collected = Vec::new();
    loop {
        let page = load(store, index, after, LOAD_PAGE_SIZE);
        let Some(last) = page.last() else { break };
        after = last.sequence;
        let page_len = page.len();
        collected.extend(page.into_iter().filter(|item| range.contains(item.sequence)));
        let past_end = range.end.is_some_and(|end| after >= end);
        if page_len < LOAD_PAGE_SIZE || past_end {
            break;
        }
    }
    collected
}

fn gate<T: 'static>(entitled: bool, filter: Option<Arc<dyn Fn(&T) -> bool + Send + Sync>>) -> Arc<dyn Fn(&T) -> bool + Send + Sync> {
    if !entitled {
        return Arc::new(|_| false);
    }
    filter.unwrap_or_else(|| Arc::new(|_| true))
}

/// Ties the registry, the historical store and one indexed subscription map
/// per stream type together behind the query/publish surface a client
/// session and the feed ingestion path actually call.
pub struct MarketDataClient {
    registry: Arc<SecurityRegistry>,
    store: Arc<dyn HistoricalDataStore>,
    bbo_subs: IndexedSubscriptions<Security, Sequenced<BboQuote>>,
    market_quote_subs: IndexedSubscriptions<Security, Sequenced<MarketQuote>>,
    book_quote_subs: IndexedSubscriptions<Security, Sequenced<BookQuote>>,
    time_and_sale_subs: IndexedSubscriptions<Security, Sequenced<TimeAndSale>>,
    order_imbalance_subs: IndexedSubscriptions<MarketCode, Sequenced<OrderImbalance>>,
}

impl MarketDataClient {
    pub fn new(registry: Arc<SecurityRegistry>, store: Arc<dyn HistoricalDataStore>) -> Self {
        MarketDataClient {
            registry,
            store,
            bbo_subs: IndexedSubscriptions::new(),
            market_quote_subs: IndexedSubscriptions::new(),
            book_quote_subs: IndexedSubscriptions::new(),
            time_and_sale_subs: IndexedSubscriptions::new(),
            order_imbalance_subs: IndexedSubscriptions::new(),
        }
    }

    pub fn publish_bbo(&self, security: &Security, bbo: BboQuote) -> Sequence {
        let sequence = self.registry.publish_bbo(security, bbo);
        let sequenced = Sequenced { value: bbo, sequence, timestamp: bbo.timestamp };
        self.store.store_bbo(security, sequenced.clone());
        self.bbo_subs.publish(security, sequenced);
        sequence
    }

    pub fn publish_market_quote(&self, security: &Security, quote: MarketQuote) -> Sequence {
        let sequence = self.registry.publish_market_quote(security, quote.clone());
        let sequenced = Sequenced { value: quote.clone(), sequence, timestamp: quote.timestamp };
        self.store.store_market_quote(security, sequenced.clone());
        self.market_quote_subs.publish(security, sequenced);
        sequence
    }

    pub fn publish_time_and_sale(&self, security: &Security, print: TimeAndSale) -> Sequence {
        let sequence = self.registry.publish_time_and_sale(security, print.clone());
        let sequenced = Sequenced { value: print.clone(), sequence, timestamp: print.timestamp };
        self.store.store_time_and_sale(security, sequenced.clone());
        self.time_and_sale_subs.publish(security, sequenced);
        sequence
    }

    /// Book quotes carry no historical stream; subscribers only ever see
    /// this as a live, incremental delta, the same shape the registry
    /// itself merges into its book.
    #[allow(clippy::too_many_arguments)]
    pub fn publish_book_quote(
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
        let sequence = self
            .registry
            .update_book_quote(security, side, price, mpid, is_primary_mpid, market.clone(), size_delta, source_id, timestamp);
        let quote = BookQuote { mpid: mpid.to_string(), is_primary_mpid, market, quote: Quote { price, size: size_delta, side }, timestamp };
        self.book_quote_subs.publish(security, Sequenced { value: quote, sequence, timestamp });
        sequence
    }

    pub fn query_bbo_quotes(
        &self,
        query: SecurityMarketDataQuery<Sequenced<BboQuote>>,
        entitlements: &EntitlementSet,
        source: &str,
    ) -> (QueryHandle, mpsc::UnboundedReceiver<Sequenced<BboQuote>>) {
        let entitled = entitlements.is_entitled(&query.index.market, source, MarketDataType::BBO);
        let filter = gate(entitled, query.filter);
        let (query_id, receiver) = self.bbo_subs.open(query.index.clone(), query.range, filter);
        let tail = if entitled {
            apply_snapshot_limit(load_all(self.store.as_ref(), &query.index, query.range, |s, sec, after, limit| s.load_bbo(sec, after, limit)), query.snapshot_limit)
        } else {
            Vec::new()
        };
        self.bbo_subs.commit(&query.index, query_id, tail);
        (QueryHandle { stream: Stream::Bbo, index: QueryIndex::Security(query.index), query_id }, receiver)
    }

    pub fn query_market_quotes(
        &self,
        query: SecurityMarketDataQuery<Sequenced<MarketQuote>>,
        entitlements: &EntitlementSet,
        source: &str,
    ) -> (QueryHandle, mpsc::UnboundedReceiver<Sequenced<MarketQuote>>) {
        let entitled = entitlements.is_entitled(&query.index.market, source, MarketDataType::MARKET_QUOTE);
        let filter = gate(entitled, query.filter);
        let (query_id, receiver) = self.market_quote_subs.open(query.index.clone(), query.range, filter);
        let tail = if entitled {
            apply_snapshot_limit(
                load_all(self.store.as_ref(), &query.index, query.range, |s, sec, after, limit| s.load_market_quotes(sec, after, limit)),
                query.snapshot_limit,
            )
        } else {
            Vec::new()
        };
        self.market_quote_subs.commit(&query.index, query_id, tail);
        (QueryHandle { stream: Stream::MarketQuote, index: QueryIndex::Security(query.index), query_id }, receiver)
    }

    pub fn query_time_and_sales(
        &self,
        query: SecurityMarketDataQuery<Sequenced<TimeAndSale>>,
        entitlements: &EntitlementSet,
        source: &str,
    ) -> (QueryHandle, mpsc::UnboundedReceiver<Sequenced<TimeAndSale>>) {
        let entitled = entitlements.is_entitled(&query.index.market, source, MarketDataType::TIME_AND_SALE);
        let filter = gate(entitled, query.filter);
        let (query_id, receiver) = self.time_and_sale_subs.open(query.index.clone(), query.range, filter);
        let tail = if entitled {
            apply_snapshot_limit(
                load_all(self.store.as_ref(), &query.index, query.range, |s, sec, after, limit| s.load_time_and_sales(sec, after, limit)),
                query.snapshot_limit,
            )
        } else {
            Vec::new()
        };
        self.time_and_sale_subs.commit(&query.index, query_id, tail);
        (QueryHandle { stream: Stream::TimeAndSale, index: QueryIndex::Security(query.index), query_id }, receiver)
    }

    /// Book quotes have no historical backing, so the snapshot side of the
    /// initialize/commit seam is always empty; a fresh query only ever sees
    /// live deltas from the moment it opens.
    pub fn query_book_quotes(
        &self,
        query: SecurityMarketDataQuery<Sequenced<BookQuote>>,
        entitlements: &EntitlementSet,
        source: &str,
    ) -> (QueryHandle, mpsc::UnboundedReceiver<Sequenced<BookQuote>>) {
        let entitled = entitlements.is_entitled(&query.index.market, source, MarketDataType::BOOK_QUOTE);
        let filter = gate(entitled, query.filter);
        let (query_id, receiver) = self.book_quote_subs.open(query.index.clone(), query.range, filter);
        self.book_quote_subs.commit(&query.index, query_id, Vec::new());
        (QueryHandle { stream: Stream::BookQuote, index: QueryIndex::Security(query.index), query_id }, receiver)
    }

    /// Market-wide: the imbalance's own security is irrelevant to routing,
    /// only the market it was announced on.
    pub fn publish_order_imbalance(&self, imbalance: OrderImbalance) -> Sequence {
        let market = imbalance.security.market.clone();
        let timestamp = imbalance.timestamp;
        let sequence = self.registry.publish_order_imbalance(imbalance.clone());
        let sequenced = Sequenced { value: imbalance, sequence, timestamp };
        self.store.store_order_imbalance(&market, sequenced.clone());
        self.order_imbalance_subs.publish(&market, sequenced);
        sequence
    }

    pub fn query_order_imbalances(
        &self,
        query: MarketWideDataQuery<Sequenced<OrderImbalance>>,
        entitlements: &EntitlementSet,
        source: &str,
    ) -> (QueryHandle, mpsc::UnboundedReceiver<Sequenced<OrderImbalance>>) {
        let entitled = entitlements.is_entitled(&query.index, source, MarketDataType::ORDER_IMBALANCE);
        let filter = gate(entitled, query.filter);
        let (query_id, receiver) = self.order_imbalance_subs.open(query.index.clone(), query.range, filter);
        let tail = if entitled {
            apply_snapshot_limit(
                load_all(self.store.as_ref(), &query.index, query.range, |s, market, after, limit| s.load_order_imbalances(market, after, limit)),
                query.snapshot_limit,
            )
        } else {
            Vec::new()
        };
        self.order_imbalance_subs.commit(&query.index, query_id, tail);
        (QueryHandle { stream: Stream::OrderImbalance, index: QueryIndex::Market(query.index), query_id }, receiver)
    }

    pub fn end(&self, handle: &QueryHandle) {
        match (&handle.stream, &handle.index) {
            (Stream::Bbo, QueryIndex::Security(index)) => self.bbo_subs.end(index, handle.query_id),
            (Stream::MarketQuote, QueryIndex::Security(index)) => self.market_quote_subs.end(index, handle.query_id),
            (Stream::BookQuote, QueryIndex::Security(index)) => self.book_quote_subs.end(index, handle.query_id),
            (Stream::TimeAndSale, QueryIndex::Security(index)) => self.time_and_sale_subs.end(index, handle.query_id),
            (Stream::OrderImbalance, QueryIndex::Market(index)) => self.order_imbalance_subs.end(index, handle.query_id),
            _ => {}
        }
    }

    /// Removes every subscription a disconnecting client held, across every
    /// stream and security it had queried.
    pub fn disconnect(&self, handles: &[QueryHandle]) {
        for handle in handles {
            self.end(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Quote;
    use crate::historical_store::InMemoryHistoricalDataStore;
    use crate::subscription::EntitlementDatabase;

    fn sec() -> Security {
        Security::new("TEST", "NSDQ", "US")
    }

    fn bbo(price: i128, timestamp: DateTime<Utc>) -> BboQuote {
        let quote = Quote { price: Money::from_raw(price), size: 100, side: Side::Bid };
        BboQuote { ask: quote, bid: quote, timestamp }
    }

    fn client() -> MarketDataClient {
        MarketDataClient::new(Arc::new(SecurityRegistry::new()), Arc::new(InMemoryHistoricalDataStore::new()))
    }

    #[test]
    fn entitled_query_replays_snapshot_then_live() {
        let client = client();
        let sec = sec();
        client.publish_bbo(&sec, bbo(100, Utc::now()));
        client.publish_bbo(&sec, bbo(101, Utc::now()));

        let mut db = EntitlementDatabase::new();
        db.grant(crate::domain::AccountId("trader1".into()), MarketCode("NSDQ".into()), "desk", MarketDataType::BBO);
        let entitlements = db.resolve(&crate::domain::AccountId("trader1".into()), &[]);

        let query = SecurityMarketDataQuery::new(sec.clone());
        let (_handle, mut rx) = client.query_bbo_quotes(query, &entitlements, "desk");
        let first = rx.try_recv().expect("snapshot replay");
        assert_eq!(first.value.bid.price, Money::from_raw(100));
        let second = rx.try_recv().expect("snapshot replay");
        assert_eq!(second.value.bid.price, Money::from_raw(101));

        client.publish_bbo(&sec, bbo(102, Utc::now()));
        let third = rx.try_recv().expect("live delivery");
        assert_eq!(third.value.bid.price, Money::from_raw(102));
    }

    #[test]
    fn missing_entitlement_yields_empty_snapshot_and_silent_future_publishes() {
        let client = client();
        let sec = sec();
        client.publish_bbo(&sec, bbo(100, Utc::now()));

        let db = EntitlementDatabase::new();
        let entitlements = db.resolve(&crate::domain::AccountId("trader1".into()), &[]);

        let query = SecurityMarketDataQuery::new(sec.clone());
        let (_handle, mut rx) = client.query_bbo_quotes(query, &entitlements, "desk");
        assert!(rx.try_recv().is_err(), "no entitlement means no snapshot replay");

        client.publish_bbo(&sec, bbo(101, Utc::now()));
        assert!(rx.try_recv().is_err(), "no entitlement means no future delivery either");
    }

    #[test]
    fn head_snapshot_limit_truncates_the_replayed_tail() {
        let client = client();
        let sec = sec();
        for price in 0..5 {
            client.publish_bbo(&sec, bbo(price, Utc::now()));
        }
        let mut db = EntitlementDatabase::new();
        db.grant(crate::domain::AccountId("trader1".into()), MarketCode("NSDQ".into()), "desk", MarketDataType::BBO);
        let entitlements = db.resolve(&crate::domain::AccountId("trader1".into()), &[]);

        let mut query = SecurityMarketDataQuery::new(sec.clone());
        query.snapshot_limit = SnapshotLimit::Head(2);
        let (_handle, mut rx) = client.query_bbo_quotes(query, &entitlements, "desk");
        assert_eq!(rx.try_recv().unwrap().value.bid.price, Money::from_raw(0));
        assert_eq!(rx.try_recv().unwrap().value.bid.price, Money::from_raw(1));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn disconnect_removes_every_handle() {
        let client = client();
        let sec = sec();
        let db = EntitlementDatabase::new();
        let entitlements = db.resolve(&crate::domain::AccountId("trader1".into()), &[]);
        let (handle, mut rx) = client.query_bbo_quotes(SecurityMarketDataQuery::new(sec.clone()), &entitlements, "desk");
        client.disconnect(&[handle]);
        client.publish_bbo(&sec, bbo(5, Utc::now()));
        assert!(rx.try_recv().is_err());
    }

    fn imbalance(sec: Security, size: i64, timestamp: DateTime<Utc>) -> OrderImbalance {
        OrderImbalance { security: sec, side: Side::Bid, size, reference_price: Money::from_raw(100), timestamp }
    }

    #[test]
    fn order_imbalance_query_replays_snapshot_then_live_keyed_by_market() {
        let client = client();
        let sec = sec();
        let market = sec.market.clone();
        client.publish_order_imbalance(imbalance(sec.clone(), 100, Utc::now()));
        client.publish_order_imbalance(imbalance(sec.clone(), 200, Utc::now()));

        let mut db = EntitlementDatabase::new();
        db.grant(crate::domain::AccountId("trader1".into()), market.clone(), "desk", MarketDataType::ORDER_IMBALANCE);
        let entitlements = db.resolve(&crate::domain::AccountId("trader1".into()), &[]);

        let query = MarketWideDataQuery::new(market);
        let (_handle, mut rx) = client.query_order_imbalances(query, &entitlements, "desk");
        assert_eq!(rx.try_recv().expect("snapshot replay").value.size, 100);
        assert_eq!(rx.try_recv().expect("snapshot replay").value.size, 200);

        client.publish_order_imbalance(imbalance(sec, 300, Utc::now()));
        assert_eq!(rx.try_recv().expect("live delivery").value.size, 300);
    }

    #[test]
    fn order_imbalance_query_without_entitlement_yields_nothing() {
        let client = client();
        let sec = sec();
        let market = sec.market.clone();
        client.publish_order_imbalance(imbalance(sec, 100, Utc::now()));

        let db = EntitlementDatabase::new();
        let entitlements = db.resolve(&crate::domain::AccountId("trader1".into()), &[]);
        let query = MarketWideDataQuery::new(market);
        let (_handle, mut rx) = client.query_order_imbalances(query, &entitlements, "desk");
        assert!(rx.try_recv().is_err());
    }
}
