//! Tracks, per account, which live orders are opening or closing a position.
//! Grounded in the source system's `PositionOrderBook`/`SecurityEntry`.

use crate::domain::{ExecutionReport, OrderFields, OrderId, Security, Side, side_of};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct OrderEntry {
    pub order_id: OrderId,
    pub fields: OrderFields,
    pub remaining: i64,
    ordinal: u64,
}

#[derive(Debug, Default)]
struct SecurityBook {
    asks: Vec<OrderEntry>,
    bids: Vec<OrderEntry>,
    position: i64,
    ask_open_quantity: i64,
    bid_open_quantity: i64,
}

impl SecurityBook {
    fn side_list(&self, side: Side) -> &Vec<OrderEntry> {
        match side {
            Side::Ask => &self.asks,
            Side::Bid => &self.bids,
            Side::None => panic!("order must be ASK or BID"),
        }
    }

    fn side_list_mut(&mut self, side: Side) -> &mut Vec<OrderEntry> {
        match side {
            Side::Ask => &mut self.asks,
            Side::Bid => &mut self.bids,
            Side::None => panic!("order must be ASK or BID"),
        }
    }

    fn open_quantity_mut(&mut self, side: Side) -> &mut i64 {
        match side {
            Side::Ask => &mut self.ask_open_quantity,
            Side::Bid => &mut self.bid_open_quantity,
            Side::None => panic!("order must be ASK or BID"),
        }
    }

    fn open_quantity(&self, side: Side) -> i64 {
        match side {
            Side::Ask => self.ask_open_quantity,
            Side::Bid => self.bid_open_quantity,
            Side::None => 0,
        }
    }
}

/// A per-account record of live orders, their running remaining quantity
/// and the account's resulting position per security.
#[derive(Default)]
pub struct PositionOrderBook {
    securities: HashMap<Security, SecurityBook>,
    order_index: HashMap<OrderId, (Security, Side)>,
    next_ordinal: u64,
}

impl PositionOrderBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, order_id: OrderId, fields: OrderFields) {
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;
        let security = fields.security.clone();
        let side = fields.side;
        let quantity = fields.quantity;
        let book = self.securities.entry(security.clone()).or_default();
        let entry = OrderEntry { order_id, fields, remaining: quantity, ordinal };
        let list = book.side_list_mut(side);
        let insert_at = list
            .binary_search_by(|e| Self::order_cmp(side, e, &entry))
            .unwrap_or_else(|idx| idx);
        list.insert(insert_at, entry);
        *book.open_quantity_mut(side) += quantity;
        self.order_index.insert(order_id, (security, side));
    }

    fn order_cmp(side: Side, a: &OrderEntry, b: &OrderEntry) -> std::cmp::Ordering {
        let price_order = match side {
            Side::Ask => a.fields.ordering_price().cmp(&b.fields.ordering_price()),
            Side::Bid => b.fields.ordering_price().cmp(&a.fields.ordering_price()),
            Side::None => std::cmp::Ordering::Equal,
        };
        price_order.then_with(|| a.ordinal.cmp(&b.ordinal))
    }

    /// Folds an execution report into the book: adjusts position and open
    /// quantity, removing the order once it is terminal or fully filled.
    pub fn update(&mut self, order_id: OrderId, report: &ExecutionReport) {
        if report.last_quantity == 0 && !report.status.is_terminal() {
            return;
        }
        let Some((security, side)) = self.order_index.get(&order_id).cloned() else { return };
        let Some(book) = self.securities.get_mut(&security) else { return };
        let list = book.side_list_mut(side);
        let Some(idx) = list.iter().position(|e| e.order_id == order_id) else { return };

        book.position += side.direction() * report.last_quantity;
        *book.open_quantity_mut(side) -= report.last_quantity;
        let list = book.side_list_mut(side);
        list[idx].remaining -= report.last_quantity;

        let terminal = report.status.is_terminal();
        let remaining = list[idx].remaining;
        if terminal {
            *book.open_quantity_mut(side) -= remaining;
            book.side_list_mut(side).remove(idx);
            self.order_index.remove(&order_id);
        } else if remaining <= 0 {
            book.side_list_mut(side).remove(idx);
            self.order_index.remove(&order_id);
        }
    }

    pub fn position(&self, security: &Security) -> i64 {
        self.securities.get(security).map_or(0, |b| b.position)
    }

    pub fn open_quantity(&self, security: &Security, side: Side) -> i64 {
        self.securities.get(security).map_or(0, |b| b.open_quantity(side))
    }

    pub fn live_orders(&self, security: &Security) -> Vec<&OrderEntry> {
        let Some(book) = self.securities.get(security) else { return vec![] };
        book.asks.iter().chain(book.bids.iter()).collect()
    }

    pub fn all_live_orders(&self) -> Vec<&OrderEntry> {
        self.securities.values().flat_map(|b| b.asks.iter().chain(b.bids.iter())).collect()
    }

    /// Every security with a non-zero position, paired with its signed size.
    pub fn positions(&self) -> Vec<(Security, i64)> {
        self.securities
            .iter()
            .filter(|(_, book)| book.position != 0)
            .map(|(security, book)| (security.clone(), book.position))
            .collect()
    }

    /// Returns `true` if a hypothetical submission of `fields` would open
    /// (rather than close) the account's position in that security.
    pub fn test_opening_order_submission(&self, fields: &OrderFields) -> bool {
        let Some(book) = self.securities.get(&fields.security) else { return true };
        if book.position == 0 {
            return true;
        }
        if side_of(book.position) == fields.side {
            return true;
        }
        let open = book.open_quantity(fields.side);
        open + fields.quantity > book.position.abs()
    }

    /// Every live order classified as opening: the same-direction side in
    /// full, plus whichever opposing-side orders (best-priced first) cross
    /// the |position| boundary — an order that straddles the boundary counts
    /// wholly as opening rather than being split.
    pub fn opening_orders(&self, security: &Security) -> Vec<&OrderEntry> {
        let Some(book) = self.securities.get(security) else { return vec![] };
        if book.position == 0 {
            return book.asks.iter().chain(book.bids.iter()).collect();
        }
        let (same_side, opposing_side) = if book.position > 0 { (&book.bids, &book.asks) } else { (&book.asks, &book.bids) };
        let threshold = book.position.abs();
        let mut opening: Vec<&OrderEntry> = same_side.iter().collect();
        let mut cumulative = 0i64;
        for entry in opposing_side.iter() {
            let before = cumulative;
            cumulative += entry.remaining;
            if before >= threshold || cumulative > threshold {
                opening.push(entry);
            }
        }
        opening
    }

    /// [`Self::opening_orders`] across every security this account holds
    /// live orders or a position in.
    pub fn all_opening_orders(&self) -> Vec<&OrderEntry> {
        self.securities.keys().flat_map(|security| self.opening_orders(security)).collect()
    }
}
