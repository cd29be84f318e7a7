use serde::{Deserialize, Serialize};
use std::fmt;

/// The side of a quote, order, or position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Ask,
    Bid,
    None,
}

impl Side {
    /// Returns `+1` for `Bid`, `-1` for `Ask`, `0` for `None`. Used to sign
    /// position deltas from execution reports.
    pub fn direction(self) -> i64 {
        match self {
            Side::Bid => 1,
            Side::Ask => -1,
            Side::None => 0,
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Ask => Side::Bid,
            Side::Bid => Side::Ask,
            Side::None => Side::None,
        }
    }

    /// Maps a `(bid, ask)` pair to the value for this side, mirroring the
    /// `Pick` helper used throughout the accounting and compliance modules.
    pub fn pick<T>(self, bid: T, ask: T) -> T
    where
        T: Default,
    {
        match self {
            Side::Bid => bid,
            Side::Ask => ask,
            Side::None => T::default(),
        }
    }

    /// The sign a position must have for this side to be "closing" it:
    /// asks close long positions, bids close short positions.
    pub fn closes(self, position: i64) -> bool {
        match self {
            Side::Ask => position > 0,
            Side::Bid => position < 0,
            Side::None => false,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Ask => write!(f, "ASK"),
            Side::Bid => write!(f, "BID"),
            Side::None => write!(f, "NONE"),
        }
    }
}

/// The sign of a position or quantity, independent of any particular order.
pub fn side_of(quantity: i64) -> Side {
    if quantity > 0 {
        Side::Bid
    } else if quantity < 0 {
        Side::Ask
    } else {
        Side::None
    }
}
