//! Tracks unrealized P&L per security and aggregates realized/unrealized
//! P&L per currency, grounded in the source system's `Portfolio`.

use super::bookkeeper::Bookkeeper;
use crate::domain::{CurrencyId, ExecutionReport, Money, OrderFields, Security};
use std::collections::HashMap;

/// The most recent ask/bid prices available to value an open position.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityValuation {
    pub ask_value: Option<Money>,
    pub bid_value: Option<Money>,
}

#[derive(Debug, Clone, Copy, Default)]
struct PortfolioEntry {
    valuation: SecurityValuation,
    unrealized: Money,
}

/// Per-account P&L tracker: realized P&L comes from the [`Bookkeeper`],
/// unrealized P&L is recomputed from the latest valuation on every fill or
/// quote update.
#[derive(Default)]
pub struct Portfolio {
    bookkeeper: Bookkeeper,
    entries: HashMap<Security, PortfolioEntry>,
    currencies: HashMap<Security, CurrencyId>,
    unrealized_by_currency: HashMap<CurrencyId, Money>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a fill into the bookkeeper and refreshes unrealized P&L for the
    /// affected security. A report with zero filled size is a no-op.
    pub fn update(&mut self, fields: &OrderFields, report: &ExecutionReport) {
        if report.last_quantity == 0 {
            return;
        }
        let delta = fields.side.direction() * report.last_quantity;
        self.bookkeeper.record_transaction(&fields.security, &fields.currency, delta, report.last_price, report.total_fees());
        self.currencies.insert(fields.security.clone(), fields.currency.clone());
        self.recalculate_unrealized(&fields.security);
    }

    pub fn update_ask(&mut self, security: &Security, ask_value: Money) {
        let entry = self.entries.entry(security.clone()).or_default();
        entry.valuation.ask_value = Some(ask_value);
        self.recalculate_unrealized(security);
    }

    pub fn update_bid(&mut self, security: &Security, bid_value: Money) {
        let entry = self.entries.entry(security.clone()).or_default();
        entry.valuation.bid_value = Some(bid_value);
        self.recalculate_unrealized(security);
    }

    pub fn update_valuation(&mut self, security: &Security, ask_value: Money, bid_value: Money) {
        let entry = self.entries.entry(security.clone()).or_default();
        entry.valuation.ask_value = Some(ask_value);
        entry.valuation.bid_value = Some(bid_value);
        self.recalculate_unrealized(security);
    }

    /// `unrealized = position.quantity * valuation_price - cost_basis`,
    /// using the bid value for a long/flat position and the ask value for a
    /// short position; `Money::ZERO` if no valuation has arrived yet.
    fn recalculate_unrealized(&mut self, security: &Security) {
        let Some(currency) = self.currencies.get(security).cloned() else { return };
        let inv = self.bookkeeper.inventory(security, &currency);
        let entry = self.entries.entry(security.clone()).or_default();
        let valuation_price = if inv.position.quantity >= 0 { entry.valuation.bid_value } else { entry.valuation.ask_value }.unwrap_or(Money::ZERO);
        let new_unrealized = valuation_price * inv.position.quantity - inv.position.cost_basis;
        let delta = new_unrealized - entry.unrealized;
        entry.unrealized = new_unrealized;
        *self.unrealized_by_currency.entry(currency).or_insert(Money::ZERO) += delta;
    }

    pub fn realized_profit_and_loss(&self, security: &Security) -> Money {
        let Some(currency) = self.currencies.get(security) else { return Money::ZERO };
        self.bookkeeper.inventory(security, currency).realized_profit_and_loss()
    }

    pub fn unrealized_profit_and_loss(&self, security: &Security) -> Money {
        self.entries.get(security).map_or(Money::ZERO, |e| e.unrealized)
    }

    pub fn total_profit_and_loss(&self, security: &Security) -> Money {
        self.realized_profit_and_loss(security) + self.unrealized_profit_and_loss(security)
    }

    pub fn total_unrealized_by_currency(&self, currency: &CurrencyId) -> Money {
        self.unrealized_by_currency.get(currency).copied().unwrap_or(Money::ZERO)
    }

    pub fn position(&self, security: &Security) -> i64 {
        let Some(currency) = self.currencies.get(security) else { return 0 };
        self.bookkeeper.inventory(security, currency).position.quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AccountId, Destination, OrderStatus, OrderType, Side, TimeInForce};
    use chrono::Utc;
    use std::collections::HashMap as Map;

    fn sec() -> Security {
        Security::new("TEST", "NSDQ", "US")
    }

    fn buy_fields(security: &Security, quantity: i64) -> OrderFields {
        OrderFields {
            account: AccountId("acct".into()),
            security: security.clone(),
            currency: CurrencyId("USD".into()),
            order_type: OrderType::Limit,
            side: Side::Bid,
            destination: Destination("NSDQ".into()),
            quantity,
            price: Money::ZERO,
            time_in_force: TimeInForce::Day,
            tags: Map::new(),
        }
    }

    fn report(quantity: i64, price: i128) -> ExecutionReport {
        ExecutionReport {
            order_id: crate::domain::OrderId(1),
            timestamp: Utc::now(),
            sequence: 0,
            status: OrderStatus::PartiallyFilled,
            last_quantity: quantity,
            last_price: Money::from_raw(price),
            liquidity_flag: String::new(),
            last_market: None,
            execution_fee: Money::ZERO,
            processing_fee: Money::ZERO,
            commission: Money::ZERO,
            text: String::new(),
            tags: Map::new(),
        }
    }

    #[test]
    fn unrealized_tracks_bid_valuation_for_long_position() {
        let mut p = Portfolio::new();
        let sec = sec();
        p.update(&buy_fields(&sec, 100), &report(100, 10));
        assert_eq!(p.unrealized_profit_and_loss(&sec), Money::ZERO);
        p.update_bid(&sec, Money::from_raw(12));
        assert_eq!(p.unrealized_profit_and_loss(&sec), Money::from_raw(200));
    }

    #[test]
    fn zero_quantity_report_is_a_no_op() {
        let mut p = Portfolio::new();
        let sec = sec();
        p.update(&buy_fields(&sec, 0), &report(0, 10));
        assert_eq!(p.position(&sec), 0);
    }
}
