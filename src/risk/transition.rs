//! Drives an account's response to a [`RiskState`] change: cancel opening
//! orders, then cancel every live order, then flatten remaining positions.
//! Grounded in the source system's `RiskTransitionTracker`, a 7-state
//! machine (S0-S6) driven by four conditions (C0-C3).

use crate::domain::{AccountId, CurrencyId, Destination, ExecutionReport, MarketCode, OrderFields, OrderId, OrderType, Security, Side, TimeInForce, side_of};
use crate::position::PositionOrderBook;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskState {
    Active,
    CloseOrders,
    Disabled,
}

/// Per-market settlement currency and preferred execution destination,
/// consulted only when flattening a position in [`RiskTransitionTracker::s5`].
#[derive(Debug, Clone)]
pub struct MarketInfo {
    pub currency: CurrencyId,
    pub preferred_destination: Destination,
}

pub type MarketDatabase = HashMap<MarketCode, MarketInfo>;

/// Cancels and submits orders on an account's behalf. A thin seam over
/// whatever order-execution transport the host process runs; transport
/// failures are logged and swallowed, matching the source system's
/// best-effort flatten behavior.
pub trait RiskOrderExecutionClient: Send + Sync {
    fn cancel(&self, order_id: OrderId);
    fn submit(&self, fields: OrderFields);
}

pub struct RiskTransitionTracker<C: RiskOrderExecutionClient> {
    account: AccountId,
    client: Arc<C>,
    markets: MarketDatabase,
    risk_state: RiskState,
    book: PositionOrderBook,
    live_orders: HashSet<OrderId>,
    state: u8,
}

impl<C: RiskOrderExecutionClient> RiskTransitionTracker<C> {
    pub fn new(account: AccountId, client: Arc<C>, markets: MarketDatabase) -> Self {
        RiskTransitionTracker {
            account,
            client,
            markets,
            risk_state: RiskState::Active,
            book: PositionOrderBook::new(),
            live_orders: HashSet::new(),
            state: 0,
        }
    }

    pub fn add(&mut self, order_id: OrderId, fields: OrderFields) {
        self.book.add(order_id, fields);
    }

    pub fn update_state(&mut self, state: RiskState) {
        self.risk_state = state;
        match self.state {
            0 => self.s0(),
            2 => self.s2(),
            4 => self.s4(),
            6 => self.s6(),
            _ => {}
        }
    }

    pub fn update_report(&mut self, order_id: OrderId, report: &ExecutionReport) {
        self.book.update(order_id, report);
        if report.status.is_terminal() {
            self.live_orders.remove(&order_id);
        }
        if self.state == 4 {
            self.s4();
        }
    }

    fn c0(&self) -> bool {
        self.risk_state == RiskState::CloseOrders
    }

    fn c1(&self) -> bool {
        self.risk_state == RiskState::Active
    }

    fn c2(&self) -> bool {
        self.risk_state == RiskState::Disabled
    }

    fn c3(&self) -> bool {
        self.live_orders.is_empty()
    }

    fn s0(&mut self) {
        self.state = 0;
        if self.c0() {
            self.s1();
        }
    }

    fn s1(&mut self) {
        self.state = 1;
        for order in self.book.all_opening_orders() {
            self.client.cancel(order.order_id);
        }
        self.s2();
    }

    fn s2(&mut self) {
        self.state = 2;
        if self.c1() {
            self.s0();
        } else if self.c2() {
            self.s3();
        }
    }

    fn s3(&mut self) {
        self.state = 3;
        self.live_orders.clear();
        for order in self.book.all_live_orders() {
            self.live_orders.insert(order.order_id);
            self.client.cancel(order.order_id);
        }
        self.s4();
    }

    fn s4(&mut self) {
        self.state = 4;
        if self.c1() {
            self.s0();
        } else if self.c3() {
            self.s5();
        }
    }

    fn s5(&mut self) {
        self.state = 5;
        for (security, quantity) in self.book.positions() {
            let Some(market_info) = self.markets.get(&security.market) else {
                error!(security = %security, "no market info registered, cannot flatten position");
                continue;
            };
            let fields = OrderFields {
                account: self.account.clone(),
                security,
                currency: market_info.currency.clone(),
                order_type: OrderType::Market,
                side: side_of(quantity).opposite(),
                destination: market_info.preferred_destination.clone(),
                quantity: quantity.abs(),
                price: crate::domain::Money::ZERO,
                time_in_force: TimeInForce::Day,
                tags: HashMap::new(),
            };
            self.client.submit(fields);
        }
        self.s6();
    }

    fn s6(&mut self) {
        self.state = 6;
        if self.c1() {
            self.s0();
        }
    }
}
