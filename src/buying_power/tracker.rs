//! Reserves expected expenditure for pending orders, offset by the
//! position they would close, releasing the reservation as reports arrive.
//! Grounded in the source system's `BuyingPowerTracker`.

use crate::domain::{CurrencyId, ExecutionReport, Money, OrderFields, OrderId, Security, Side};
use std::collections::HashMap;

struct BpEntry {
    order_id: OrderId,
    price: Money,
    remaining: i64,
}

#[derive(Default)]
struct SecurityState {
    currency: Option<CurrencyId>,
    asks: Vec<BpEntry>,
    bids: Vec<BpEntry>,
    position: i64,
    expenditure: Money,
}

fn same_direction(position: i64, delta: i64) -> bool {
    position == 0 || (position > 0) == (delta > 0)
}

/// Sums `remaining * price` over entries (assumed best-first for their
/// side), offsetting `threshold` units of size as implicitly covered by the
/// existing position rather than consuming fresh buying power.
fn offset_sum(entries: &[BpEntry], mut threshold: i64) -> Money {
    let mut total = Money::ZERO;
    for entry in entries {
        if threshold > 0 {
            let covered = threshold.min(entry.remaining);
            threshold -= covered;
            total += entry.price * (entry.remaining - covered);
        } else {
            total += entry.price * entry.remaining;
        }
    }
    total
}

fn sum_all(entries: &[BpEntry]) -> Money {
    entries.iter().fold(Money::ZERO, |acc, e| acc + e.price * e.remaining)
}

impl SecurityState {
    fn side_list_mut(&mut self, side: Side) -> &mut Vec<BpEntry> {
        match side {
            Side::Ask => &mut self.asks,
            Side::Bid => &mut self.bids,
            Side::None => panic!("order must be ASK or BID"),
        }
    }

    fn compute(&self) -> Money {
        let threshold = self.position.abs();
        let ask_power = if self.position > 0 {
            offset_sum(&self.asks, threshold)
        } else {
            let opening_offset = if self.position < 0 { -self.expenditure } else { Money::ZERO };
            sum_all(&self.asks) + opening_offset
        };
        let bid_power = if self.position < 0 {
            offset_sum(&self.bids, threshold)
        } else {
            let opening_offset = if self.position > 0 { self.expenditure } else { Money::ZERO };
            sum_all(&self.bids) + opening_offset
        };
        ask_power.max(bid_power)
    }

    fn apply_fill(&mut self, side: Side, quantity: i64, last_price: Money) {
        if quantity == 0 {
            return;
        }
        let delta = side.direction() * quantity;
        if same_direction(self.position, delta) {
            self.expenditure += last_price * delta;
            self.position += delta;
            return;
        }
        let closing_magnitude = delta.unsigned_abs().min(self.position.unsigned_abs()) as i64;
        let position_sign = if self.position > 0 { 1 } else { -1 };
        let closing_signed = closing_magnitude * delta.signum();
        let average_cost = if self.position != 0 {
            Money::from_raw(self.expenditure.raw() / self.position as i128)
        } else {
            Money::ZERO
        };
        self.expenditure -= average_cost * (closing_magnitude * position_sign);
        self.position += closing_signed;
        let remainder = delta - closing_signed;
        if remainder != 0 {
            self.expenditure += last_price * remainder;
            self.position += remainder;
        }
    }
}

#[derive(Default)]
pub struct BuyingPowerTracker {
    buying_power: HashMap<CurrencyId, Money>,
    securities: HashMap<Security, SecurityState>,
    order_index: HashMap<OrderId, (Security, Side)>,
}

impl BuyingPowerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_buying_power(&mut self, currency: CurrencyId, amount: Money) {
        self.buying_power.insert(currency, amount);
    }

    pub fn buying_power(&self, currency: &CurrencyId) -> Money {
        self.buying_power.get(currency).copied().unwrap_or(Money::ZERO)
    }

    pub fn position(&self, security: &Security) -> i64 {
        self.securities.get(security).map_or(0, |s| s.position)
    }

    /// Reserves the expenditure a new order would require, inserting it
    /// into the security's side-ordered list keyed by `expected_price`.
    pub fn submit(&mut self, order_id: OrderId, fields: &OrderFields, expected_price: Money) {
        let state = self.securities.entry(fields.security.clone()).or_default();
        state.currency.get_or_insert_with(|| fields.currency.clone());
        let before = state.compute();

        let side = fields.side;
        let list = state.side_list_mut(side);
        let insert_at = list
            .binary_search_by(|e| match side {
                Side::Ask => e.price.cmp(&expected_price),
                Side::Bid => expected_price.cmp(&e.price),
                Side::None => std::cmp::Ordering::Equal,
            })
            .unwrap_or_else(|idx| idx);
        list.insert(insert_at, BpEntry { order_id, price: expected_price, remaining: fields.quantity });
        self.order_index.insert(order_id, (fields.security.clone(), side));

        let after = state.compute();
        *self.buying_power.entry(fields.currency.clone()).or_insert(Money::ZERO) += after - before;
    }

    /// Folds an execution report into the reservation: releases the
    /// reservation for filled/terminal size and applies the fill to the
    /// tracked inventory used to offset future submissions.
    pub fn update(&mut self, order_id: OrderId, report: &ExecutionReport) {
        if report.status.changes_no_size() {
            return;
        }
        let Some((security, side)) = self.order_index.get(&order_id).cloned() else { return };
        let Some(state) = self.securities.get_mut(&security) else { return };
        let Some(currency) = state.currency.clone() else { return };
        let before = state.compute();

        let list = state.side_list_mut(side);
        if let Some(idx) = list.iter().position(|e| e.order_id == order_id) {
            if report.status.is_terminal() {
                list.remove(idx);
            } else {
                list[idx].remaining -= report.last_quantity;
            }
        }
        if report.last_quantity != 0 {
            state.apply_fill(side, report.last_quantity, report.last_price);
        }
        if report.status.is_terminal() {
            self.order_index.remove(&order_id);
        }

        let after = state.compute();
        *self.buying_power.entry(currency).or_insert(Money::ZERO) += after - before;
    }
}
