//! Entitlement-gated, indexed fan-out of market data to subscribed clients.

pub mod client;
pub mod entitlement;
pub mod multiplexer;
pub mod query;

pub use client::{MarketDataClient, MarketWideDataQuery, QueryHandle, QueryIndex, SecurityMarketDataQuery, Stream};
pub use entitlement::{EntitlementDatabase, EntitlementSet, MarketDataType};
pub use multiplexer::{IndexedSubscriptions, SequencedValue};
pub use query::{InterruptionPolicy, Range, SnapshotLimit};
