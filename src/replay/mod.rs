//! Wall-clock-paced historical replay, distinct from the backtester's
//! logical-clock-paced replay in [`crate::backtester::replay`].

pub mod feed_client;

pub use feed_client::{HistoricalReplayClient, ReplaySink};
