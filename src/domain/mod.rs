//! Core value types shared by every subsystem: money, securities, orders,
//! quotes and the sequencing primitive used to order them.

pub mod market_data;
pub mod money;
pub mod order;
pub mod security;
pub mod sequence;
pub mod side;

pub use market_data::{BboQuote, BookQuote, MarketQuote, OrderImbalance, Quote, SecurityTechnicals, TimeAndSale};
pub use money::Money;
pub use order::{AccountId, ExecutionReport, OrderFields, OrderId, OrderInfo, OrderStatus, OrderType, TimeInForce};
pub use security::{CountryCode, CurrencyId, Destination, MarketCode, Security, SecurityInfo};
pub use sequence::{Sequence, Sequenced, Sequencer};
pub use side::{Side, side_of};
