use super::money::Money;
use super::security::{CurrencyId, Destination, Security};
use super::side::Side;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A directory-entry identifier: an account or a group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    Limit,
    Market,
    Pegged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimeInForce {
    Day,
    Gtc,
    Ioc,
    Fok,
}

/// The terms of an order as submitted by a client, independent of any
/// particular exchange acceptance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderFields {
    pub account: AccountId,
    pub security: Security,
    pub currency: CurrencyId,
    pub order_type: OrderType,
    pub side: Side,
    pub destination: Destination,
    pub quantity: i64,
    pub price: Money,
    pub time_in_force: TimeInForce,
    pub tags: HashMap<String, String>,
}

impl OrderFields {
    /// The price used to order this order's entries within a side's book,
    /// substituting a side-specific sentinel for market orders so every
    /// comparison remains total (DESIGN.md: market-order sentinel convention).
    pub fn ordering_price(&self) -> Money {
        match self.order_type {
            OrderType::Market => match self.side {
                Side::Ask => Money::MIN,
                Side::Bid => Money::MAX,
                Side::None => self.price,
            },
            _ => self.price,
        }
    }
}

/// A submitted order together with its assigned identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderInfo {
    pub fields: OrderFields,
    pub submission_account: AccountId,
    pub order_id: OrderId,
    pub is_short: bool,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    PendingNew,
    New,
    Suspended,
    PendingCancel,
    CancelReject,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    Expired,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled
                | OrderStatus::Canceled
                | OrderStatus::Rejected
                | OrderStatus::Expired
                | OrderStatus::CancelReject
        )
    }

    /// Statuses that never change an order's filled size, skipped by both
    /// the position order book and the buying-power tracker.
    pub fn changes_no_size(self) -> bool {
        matches!(
            self,
            OrderStatus::PendingNew
                | OrderStatus::New
                | OrderStatus::Suspended
                | OrderStatus::PendingCancel
                | OrderStatus::CancelReject
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub order_id: OrderId,
    pub timestamp: DateTime<Utc>,
    pub sequence: u32,
    pub status: OrderStatus,
    pub last_quantity: i64,
    pub last_price: Money,
    pub liquidity_flag: String,
    pub last_market: Option<Destination>,
    pub execution_fee: Money,
    pub processing_fee: Money,
    pub commission: Money,
    pub text: String,
    pub tags: HashMap<String, String>,
}

impl ExecutionReport {
    pub fn initial(order_id: OrderId, timestamp: DateTime<Utc>) -> Self {
        ExecutionReport {
            order_id,
            timestamp,
            sequence: 0,
            status: OrderStatus::PendingNew,
            last_quantity: 0,
            last_price: Money::ZERO,
            liquidity_flag: String::new(),
            last_market: None,
            execution_fee: Money::ZERO,
            processing_fee: Money::ZERO,
            commission: Money::ZERO,
            text: String::new(),
            tags: HashMap::new(),
        }
    }

    pub fn total_fees(&self) -> Money {
        self.execution_fee + self.processing_fee + self.commission
    }
}
