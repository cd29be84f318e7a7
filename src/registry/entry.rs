//! Per-security state: sequencing, BBO/market/book merging and daily
//! technicals. Grounded in the source system's `SecurityEntry`.

use crate::domain::{
    BboQuote, BookQuote, MarketCode, MarketQuote, Money, Quote, Security, SecurityTechnicals, Sequence, Sequencer,
    Side, TimeAndSale,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// One level-2 entry retained in a side's ordered book, tagged with the
/// feed source that published it so a disconnect can clear just its entries.
#[derive(Debug, Clone)]
pub struct BookEntry {
    pub mpid: String,
    pub is_primary_mpid: bool,
    pub market: MarketCode,
    pub price: Money,
    pub size: i64,
    pub timestamp: DateTime<Utc>,
    pub sequence: Sequence,
    pub source_id: String,
}

impl BookEntry {
    fn to_book_quote(&self, side: Side) -> BookQuote {
        BookQuote {
            mpid: self.mpid.clone(),
            is_primary_mpid: self.is_primary_mpid,
            market: self.market.clone(),
            quote: Quote { price: self.price, size: self.size, side },
            timestamp: self.timestamp,
        }
    }
}

/// A read-only view of a security's current state, filtered to what clients
/// should see (zero-size book entries omitted).
#[derive(Debug, Clone)]
pub struct SecuritySnapshot {
    pub security: Security,
    pub bbo: BboQuote,
    pub last_time_and_sale: Option<TimeAndSale>,
    pub market_quotes: Vec<MarketQuote>,
    pub asks: Vec<BookQuote>,
    pub bids: Vec<BookQuote>,
    pub technicals: SecurityTechnicals,
}

pub struct SecurityEntry {
    security: Security,
    technicals: SecurityTechnicals,
    bbo: BboQuote,
    last_time_and_sale: Option<TimeAndSale>,
    market_quotes: HashMap<MarketCode, MarketQuote>,
    asks: Vec<BookEntry>,
    bids: Vec<BookEntry>,
    bbo_sequencer: Sequencer,
    market_quote_sequencer: Sequencer,
    book_quote_sequencer: Sequencer,
    time_and_sale_sequencer: Sequencer,
}

impl SecurityEntry {
    /// Constructs a new entry, seeding the technicals with the prior
    /// session's closing price the way the source system does at
    /// construction time.
    pub fn new(security: Security, prior_close: Money, timestamp: DateTime<Utc>) -> Self {
        SecurityEntry {
            security,
            technicals: SecurityTechnicals::new(prior_close),
            bbo: BboQuote { ask: Quote::empty(Side::Ask), bid: Quote::empty(Side::Bid), timestamp },
            last_time_and_sale: None,
            market_quotes: HashMap::new(),
            asks: Vec::new(),
            bids: Vec::new(),
            bbo_sequencer: Sequencer::new(),
            market_quote_sequencer: Sequencer::new(),
            book_quote_sequencer: Sequencer::new(),
            time_and_sale_sequencer: Sequencer::new(),
        }
    }

    pub fn publish_bbo(&mut self, bbo: BboQuote) -> Sequence {
        self.bbo = bbo;
        self.bbo_sequencer.increment_next_sequence()
    }

    pub fn publish_market_quote(&mut self, quote: MarketQuote) -> Sequence {
        let sequence = self.market_quote_sequencer.increment_next_sequence();
        self.market_quotes.insert(quote.market.clone(), quote);
        sequence
    }

    fn side_book(&mut self, side: Side) -> &mut Vec<BookEntry> {
        match side {
            Side::Ask => &mut self.asks,
            Side::Bid => &mut self.bids,
            Side::None => panic!("book quote must be ASK or BID"),
        }
    }

    /// Orders entries ascending by price for asks, descending for bids; ties
    /// broken by MPID for a deterministic merge position.
    fn insertion_index(side: Side, book: &[BookEntry], price: Money, mpid: &str) -> Result<usize, usize> {
        book.binary_search_by(|entry| {
            let price_order = match side {
                Side::Ask => entry.price.cmp(&price),
                Side::Bid => price.cmp(&entry.price),
                Side::None => std::cmp::Ordering::Equal,
            };
            price_order.then_with(|| entry.mpid.as_str().cmp(mpid))
        })
    }

    /// Applies an incremental size update at (price, mpid) on the given
    /// side: merges into an existing entry if present, otherwise inserts a
    /// new one when the delta is positive.
    pub fn update_book_quote(&mut self, side: Side, price: Money, mpid: &str, is_primary_mpid: bool, market: MarketCode, size_delta: i64, source_id: &str, timestamp: DateTime<Utc>) -> Sequence {
        let sequence = self.book_quote_sequencer.increment_next_sequence();
        let book = self.side_book(side);
        match Self::insertion_index(side, book, price, mpid) {
            Ok(idx) => {
                let entry = &mut book[idx];
                entry.size = (entry.size + size_delta).max(0);
                entry.timestamp = timestamp;
                entry.sequence = sequence;
                entry.source_id = source_id.to_string();
            }
            Err(idx) => {
                if size_delta > 0 {
                    book.insert(
                        idx,
                        BookEntry {
                            mpid: mpid.to_string(),
                            is_primary_mpid,
                            market,
                            price,
                            size: size_delta,
                            timestamp,
                            sequence,
                            source_id: source_id.to_string(),
                        },
                    );
                }
            }
        }
        sequence
    }

    pub fn publish_time_and_sale(&mut self, print: TimeAndSale) -> Sequence {
        self.technicals.record_trade(print.price, print.size);
        self.last_time_and_sale = Some(print);
        self.time_and_sale_sequencer.increment_next_sequence()
    }

    /// Hard-removes every book entry (either side) tagged with `source_id`,
    /// used when a feed source disconnects.
    pub fn clear(&mut self, source_id: &str) {
        self.asks.retain(|e| e.source_id != source_id);
        self.bids.retain(|e| e.source_id != source_id);
    }

    pub fn snapshot(&self) -> SecuritySnapshot {
        SecuritySnapshot {
            security: self.security.clone(),
            bbo: self.bbo,
            last_time_and_sale: self.last_time_and_sale.clone(),
            market_quotes: self.market_quotes.values().cloned().collect(),
            asks: self.asks.iter().filter(|e| e.size > 0).map(|e| e.to_book_quote(Side::Ask)).collect(),
            bids: self.bids.iter().filter(|e| e.size > 0).map(|e| e.to_book_quote(Side::Bid)).collect(),
            technicals: self.technicals,
        }
    }

    pub fn technicals(&self) -> SecurityTechnicals {
        self.technicals
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> SecurityEntry {
        SecurityEntry::new(Security::new("TEST", "NSDQ", "US"), Money::ZERO, Utc::now())
    }

    #[test]
    fn update_book_quote_inserts_then_merges_same_level() {
        let mut e = entry();
        e.update_book_quote(Side::Bid, Money::from_raw(100), "NSDQ", true, MarketCode("NSDQ".into()), 50, "feed-a", Utc::now());
        e.update_book_quote(Side::Bid, Money::from_raw(100), "NSDQ", true, MarketCode("NSDQ".into()), 25, "feed-a", Utc::now());
        let snap = e.snapshot();
        assert_eq!(snap.bids.len(), 1);
        assert_eq!(snap.bids[0].quote.size, 75);
    }

    #[test]
    fn zero_size_entry_is_omitted_from_snapshot_but_retained() {
        let mut e = entry();
        e.update_book_quote(Side::Bid, Money::from_raw(100), "NSDQ", true, MarketCode("NSDQ".into()), 50, "feed-a", Utc::now());
        e.update_book_quote(Side::Bid, Money::from_raw(100), "NSDQ", true, MarketCode("NSDQ".into()), -50, "feed-a", Utc::now());
        assert!(e.snapshot().bids.is_empty());
        assert_eq!(e.bids.len(), 1);
    }

    #[test]
    fn asks_sorted_ascending_bids_descending() {
        let mut e = entry();
        e.update_book_quote(Side::Ask, Money::from_raw(200), "A", false, MarketCode("NSDQ".into()), 10, "f", Utc::now());
        e.update_book_quote(Side::Ask, Money::from_raw(100), "B", false, MarketCode("NSDQ".into()), 10, "f", Utc::now());
        let snap = e.snapshot();
        assert_eq!(snap.asks[0].quote.price, Money::from_raw(100));
        assert_eq!(snap.asks[1].quote.price, Money::from_raw(200));
    }

    #[test]
    fn clear_removes_only_matching_source() {
        let mut e = entry();
        e.update_book_quote(Side::Bid, Money::from_raw(100), "A", false, MarketCode("NSDQ".into()), 10, "feed-a", Utc::now());
        e.update_book_quote(Side::Bid, Money::from_raw(100), "B", false, MarketCode("NSDQ".into()), 10, "feed-b", Utc::now());
        e.clear("feed-a");
        assert_eq!(e.snapshot().bids.len(), 1);
        assert_eq!(e.snapshot().bids[0].mpid, "B");
    }

    #[test]
    fn time_and_sale_updates_technicals() {
        let mut e = entry();
        e.publish_time_and_sale(TimeAndSale {
            timestamp: Utc::now(),
            price: Money::from_raw(150),
            size: 10,
            condition: "@".into(),
            market_center: MarketCode("NSDQ".into()),
        });
        assert_eq!(e.technicals().volume, 10);
    }
}
