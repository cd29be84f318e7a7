//! Time source abstraction, swapped for a deterministic clock in tests and
//! the backtester (`Nexus::TimeService::TimeClient` in the source system).

use chrono::{DateTime, Utc};
use std::sync::Mutex;

pub trait TimeClient: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system wall clock. Used in production.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeClient;

impl TimeClient for SystemTimeClient {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Always returns the same instant, useful for unit tests with no time
/// dependency.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeClient(pub DateTime<Utc>);

impl TimeClient for FixedTimeClient {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// A mutable clock a test or the backtester advances explicitly.
#[derive(Debug)]
pub struct IncrementalTimeClient {
    current: Mutex<DateTime<Utc>>,
}

impl IncrementalTimeClient {
    pub fn new(start: DateTime<Utc>) -> Self {
        IncrementalTimeClient { current: Mutex::new(start) }
    }

    pub fn set(&self, time: DateTime<Utc>) {
        *self.current.lock().unwrap() = time;
    }
}

impl TimeClient for IncrementalTimeClient {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn incremental_clock_reflects_last_set_value() {
        let start = Utc::now();
        let clock = IncrementalTimeClient::new(start);
        assert_eq!(clock.now(), start);
        let later = start + Duration::seconds(5);
        clock.set(later);
        assert_eq!(clock.now(), later);
    }
}
