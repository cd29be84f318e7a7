//! Realized P&L and cost-basis tracking per (security, currency), grounded
//! in the zero-crossing expenditure logic of the source system's
//! `BuyingPowerTracker::Update`, generalized here to realized profit.

use crate::domain::{CurrencyId, Money, Security};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default)]
pub struct Position {
    pub quantity: i64,
    pub cost_basis: Money,
}

impl Position {
    pub fn average_price(&self) -> Money {
        if self.quantity == 0 {
            Money::ZERO
        } else {
            Money::from_raw(self.cost_basis.raw() / self.quantity as i128)
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Inventory {
    pub position: Position,
    pub gross_profit_and_loss: Money,
    pub fees: Money,
    pub volume: i64,
}

impl Inventory {
    pub fn realized_profit_and_loss(&self) -> Money {
        self.gross_profit_and_loss - self.fees
    }
}

fn same_direction(position_quantity: i64, delta: i64) -> bool {
    position_quantity == 0 || (position_quantity > 0) == (delta > 0)
}

/// Accumulates signed position and cost basis per (security, currency),
/// recognizing realized P&L on the portion of any transaction that closes
/// existing inventory and opening the remainder (if the transaction flips
/// the position's sign) at the transaction price.
#[derive(Default)]
pub struct Bookkeeper {
    inventories: HashMap<(Security, CurrencyId), Inventory>,
}

impl Bookkeeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inventory(&self, security: &Security, currency: &CurrencyId) -> Inventory {
        self.inventories.get(&(security.clone(), currency.clone())).copied().unwrap_or_default()
    }

    /// Records a fill of `delta` shares (signed: positive buys, negative
    /// sells) at `price`, with `fees` always reducing realized P&L.
    pub fn record_transaction(&mut self, security: &Security, currency: &CurrencyId, delta: i64, price: Money, fees: Money) {
        let key = (security.clone(), currency.clone());
        let inv = self.inventories.entry(key).or_default();
        inv.fees += fees;
        inv.volume += delta.abs();

        if same_direction(inv.position.quantity, delta) {
            inv.position.cost_basis += price * delta;
            inv.position.quantity += delta;
            return;
        }

        let closing_magnitude = delta.unsigned_abs().min(inv.position.quantity.unsigned_abs()) as i64;
        let position_sign = if inv.position.quantity > 0 { 1 } else { -1 };
        // The closing portion consumes part of `delta`, so it shares its sign.
        let closing_signed = closing_magnitude * delta.signum();
        let average_cost = inv.position.average_price();
        let realized = if inv.position.quantity > 0 {
            (price - average_cost) * closing_magnitude
        } else {
            (average_cost - price) * closing_magnitude
        };
        inv.gross_profit_and_loss += realized;
        inv.position.cost_basis -= average_cost * (closing_magnitude * position_sign);
        inv.position.quantity += closing_signed;

        let remainder = delta - closing_signed;
        if remainder != 0 {
            inv.position.cost_basis += price * remainder;
            inv.position.quantity += remainder;
        }
    }
}
