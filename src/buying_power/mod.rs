//! Reserves buying power for pending orders, offsetting reservations
//! against the position an order would close.

pub mod tracker;

pub use tracker::BuyingPowerTracker;
