use super::money::Money;
use super::security::{MarketCode, Security};
use super::side::Side;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub price: Money,
    pub size: i64,
    pub side: Side,
}

impl Quote {
    pub fn empty(side: Side) -> Self {
        Quote { price: Money::ZERO, size: 0, side }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BboQuote {
    pub ask: Quote,
    pub bid: Quote,
    pub timestamp: DateTime<Utc>,
}

impl BboQuote {
    pub fn mid_price(&self) -> Option<Money> {
        if self.ask.size > 0 && self.bid.size > 0 {
            Some(Money::from_raw((self.ask.price.raw() + self.bid.price.raw()) / 2))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketQuote {
    pub market: MarketCode,
    pub ask: Quote,
    pub bid: Quote,
    pub timestamp: DateTime<Utc>,
}

/// A single level-2 entry attributed to a market participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookQuote {
    pub mpid: String,
    pub is_primary_mpid: bool,
    pub market: MarketCode,
    pub quote: Quote,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeAndSale {
    pub timestamp: DateTime<Utc>,
    pub price: Money,
    pub size: i64,
    pub condition: String,
    pub market_center: MarketCode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderImbalance {
    pub security: Security,
    pub side: Side,
    pub size: i64,
    pub reference_price: Money,
    pub timestamp: DateTime<Utc>,
}

/// Daily accumulated statistics for a security, rebuilt from the session's
/// time-and-sale stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SecurityTechnicals {
    pub volume: i64,
    pub high: Money,
    pub low: Money,
    pub open: Money,
    pub close: Money,
}

impl SecurityTechnicals {
    pub fn new(prior_close: Money) -> Self {
        SecurityTechnicals {
            volume: 0,
            high: Money::ZERO,
            low: Money::ZERO,
            open: Money::ZERO,
            close: prior_close,
        }
    }

    /// Folds in a trade print, matching the open/high/low zero-sentinel
    /// bootstrapping rule used by the security registry.
    pub fn record_trade(&mut self, price: Money, size: i64) {
        if self.open.is_zero() {
            self.open = price;
        }
        if self.high.is_zero() || price > self.high {
            self.high = price;
        }
        if self.low.is_zero() || price < self.low {
            self.low = price;
        }
        self.volume += size;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn technicals_bootstrap_high_low_open_from_zero_sentinel() {
        let mut t = SecurityTechnicals::new(Money::from_raw(100));
        t.record_trade(Money::from_raw(50), 10);
        assert_eq!(t.open, Money::from_raw(50));
        assert_eq!(t.high, Money::from_raw(50));
        assert_eq!(t.low, Money::from_raw(50));
        t.record_trade(Money::from_raw(70), 5);
        assert_eq!(t.open, Money::from_raw(50));
        assert_eq!(t.high, Money::from_raw(70));
        assert_eq!(t.low, Money::from_raw(50));
        assert_eq!(t.volume, 15);
    }
}
