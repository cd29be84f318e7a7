use crate::domain::Sequence;
use serde::{Deserialize, Serialize};

/// Bounds a subscription or snapshot request by sequence number. `None`
/// bounds are open-ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Range {
    pub start: Option<Sequence>,
    pub end: Option<Sequence>,
}

impl Range {
    pub const UNBOUNDED: Range = Range { start: None, end: None };

    pub fn contains(&self, sequence: Sequence) -> bool {
        self.start.map_or(true, |s| sequence >= s) && self.end.map_or(true, |e| sequence <= e)
    }

    pub fn from(start: Sequence) -> Self {
        Range { start: Some(start), end: None }
    }
}

/// Limits how much of a security's history a query's initial snapshot
/// replays before switching to real-time delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SnapshotLimit {
    Head(usize),
    Tail(usize),
    Unlimited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterruptionPolicy {
    RecoverData,
    BreakQuery,
}
