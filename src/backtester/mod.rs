//! Deterministic backtester: a single logical clock drives timer
//! expirations, market-data replay and order-execution reports through the
//! same client interfaces production code uses.

pub mod execution;
pub mod replay;
pub mod scheduler;

pub use execution::{BacktesterOrderExecutionClient, ScriptedOrderExecutionDriver};
pub use replay::schedule_replay_stream;
pub use scheduler::{BacktesterEventScheduler, TimerHandle, TimerResult};
