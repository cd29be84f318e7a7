//! Realized and unrealized profit-and-loss tracking.

pub mod bookkeeper;
pub mod portfolio;

pub use bookkeeper::{Bookkeeper, Inventory, Position};
pub use portfolio::{Portfolio, SecurityValuation};
