//! Per-account risk state machine: reacts to `RiskState` changes by
//! canceling opening orders, then all live orders, then flattening any
//! remaining position.

pub mod transition;

pub use transition::{MarketDatabase, MarketInfo, RiskOrderExecutionClient, RiskState, RiskTransitionTracker};
