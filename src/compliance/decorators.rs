//! Rule decorators that narrow when and for which security an inner rule
//! applies, composed in `SecurityFilter(TimeFilter(MapSecurity(rule)))`
//! order by the concrete rule builders in [`super::rules`].

use super::error::ComplianceResult;
use super::rule::ComplianceRule;
use crate::clock::TimeClient;
use crate::domain::{ExecutionReport, OrderInfo, Security};
use chrono::{Duration, NaiveTime};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

fn time_of_day(duration: Duration) -> NaiveTime {
    NaiveTime::from_num_seconds_from_midnight_opt((duration.num_seconds().rem_euclid(86_400)) as u32, 0).unwrap()
}

fn in_window(now: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    if start <= end {
        now >= start && now <= end
    } else {
        now >= start || now <= end
    }
}

/// Applies the inner rule only to orders on a configured set of securities.
pub struct SecurityFilterComplianceRule {
    symbols: HashSet<Security>,
    inner: Box<dyn ComplianceRule>,
}

impl SecurityFilterComplianceRule {
    pub fn new(symbols: HashSet<Security>, inner: Box<dyn ComplianceRule>) -> Self {
        SecurityFilterComplianceRule { symbols, inner }
    }

    fn matches(&self, order: &OrderInfo) -> bool {
        self.symbols.is_empty() || self.symbols.contains(&order.fields.security)
    }
}

impl ComplianceRule for SecurityFilterComplianceRule {
    fn add(&mut self, order: &OrderInfo) {
        if self.matches(order) {
            self.inner.add(order);
        }
    }

    fn submit(&mut self, order: &OrderInfo) -> ComplianceResult<()> {
        if self.matches(order) { self.inner.submit(order) } else { Ok(()) }
    }

    fn cancel(&mut self, order: &OrderInfo) -> ComplianceResult<()> {
        if self.matches(order) { self.inner.cancel(order) } else { Ok(()) }
    }

    fn report(&mut self, order: &OrderInfo, report: &ExecutionReport) {
        if self.matches(order) {
            self.inner.report(order, report);
        }
    }
}

/// Applies the inner rule's `submit` only when the clock's current
/// time-of-day falls within `[start, end]`, wrapping past midnight if
/// `start > end`. Other operations always forward.
pub struct TimeFilterComplianceRule {
    start: Duration,
    end: Duration,
    clock: Arc<dyn TimeClient>,
    inner: Box<dyn ComplianceRule>,
}

impl TimeFilterComplianceRule {
    pub fn new(start: Duration, end: Duration, clock: Arc<dyn TimeClient>, inner: Box<dyn ComplianceRule>) -> Self {
        TimeFilterComplianceRule { start, end, clock, inner }
    }
}

impl ComplianceRule for TimeFilterComplianceRule {
    fn add(&mut self, order: &OrderInfo) {
        self.inner.add(order);
    }

    fn submit(&mut self, order: &OrderInfo) -> ComplianceResult<()> {
        let now = self.clock.now().time();
        if in_window(now, time_of_day(self.start), time_of_day(self.end)) {
            self.inner.submit(order)
        } else {
            Ok(())
        }
    }

    fn cancel(&mut self, order: &OrderInfo) -> ComplianceResult<()> {
        self.inner.cancel(order)
    }

    fn report(&mut self, order: &OrderInfo, report: &ExecutionReport) {
        self.inner.report(order, report);
    }
}

/// Lazily builds one inner rule instance per security the first time it is
/// seen, then dispatches every subsequent operation for that security to
/// its own instance.
pub struct MapSecurityComplianceRule {
    factory: Arc<dyn Fn() -> Box<dyn ComplianceRule> + Send + Sync>,
    rules: HashMap<Security, Box<dyn ComplianceRule>>,
}

impl MapSecurityComplianceRule {
    pub fn new(factory: Arc<dyn Fn() -> Box<dyn ComplianceRule> + Send + Sync>) -> Self {
        MapSecurityComplianceRule { factory, rules: HashMap::new() }
    }

    fn rule_for(&mut self, security: &Security) -> &mut Box<dyn ComplianceRule> {
        self.rules.entry(security.clone()).or_insert_with(|| (self.factory)())
    }
}

impl ComplianceRule for MapSecurityComplianceRule {
    fn add(&mut self, order: &OrderInfo) {
        self.rule_for(&order.fields.security).add(order);
    }

    fn submit(&mut self, order: &OrderInfo) -> ComplianceResult<()> {
        self.rule_for(&order.fields.security).submit(order)
    }

    fn cancel(&mut self, order: &OrderInfo) -> ComplianceResult<()> {
        self.rule_for(&order.fields.security).cancel(order)
    }

    fn report(&mut self, order: &OrderInfo, report: &ExecutionReport) {
        self.rule_for(&order.fields.security).report(order, report);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedTimeClient;
    use crate::compliance::error::ComplianceCheckError;
    use crate::domain::{AccountId, CurrencyId, Destination, Money, OrderFields, OrderId, OrderType, Side, TimeInForce};
    use chrono::Utc;
    use std::collections::HashMap as Map;

    struct AlwaysReject;
    impl ComplianceRule for AlwaysReject {
        fn submit(&mut self, _order: &OrderInfo) -> ComplianceResult<()> {
            Err(ComplianceCheckError::new("always rejects"))
        }
    }

    fn order(security: Security) -> OrderInfo {
        OrderInfo {
            fields: OrderFields {
                account: AccountId("acct".into()),
                security,
                currency: CurrencyId("USD".into()),
                order_type: OrderType::Limit,
                side: Side::Bid,
                destination: Destination("NSDQ".into()),
                quantity: 100,
                price: Money::ZERO,
                time_in_force: TimeInForce::Day,
                tags: Map::new(),
            },
            submission_account: AccountId("acct".into()),
            order_id: OrderId(1),
            is_short: false,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn security_filter_skips_non_matching_security() {
        let watched = Security::new("WATCH", "NSDQ", "US");
        let other = Security::new("OTHER", "NSDQ", "US");
        let mut symbols = HashSet::new();
        symbols.insert(watched.clone());
        let mut rule = SecurityFilterComplianceRule::new(symbols, Box::new(AlwaysReject));
        assert!(rule.submit(&order(other)).is_ok());
        assert!(rule.submit(&order(watched)).is_err());
    }

    #[test]
    fn time_filter_skips_outside_window() {
        let noon = Utc::now().date_naive().and_hms_opt(12, 0, 0).unwrap().and_utc();
        let clock: Arc<dyn TimeClient> = Arc::new(FixedTimeClient(noon));
        let mut rule = TimeFilterComplianceRule::new(Duration::hours(9), Duration::hours(10), clock, Box::new(AlwaysReject));
        assert!(rule.submit(&order(Security::new("X", "NSDQ", "US"))).is_ok());
    }

    #[test]
    fn map_security_dispatches_per_security_instance() {
        let mut rule = MapSecurityComplianceRule::new(Arc::new(|| Box::new(AlwaysReject) as Box<dyn ComplianceRule>));
        assert!(rule.submit(&order(Security::new("X", "NSDQ", "US"))).is_err());
    }
}
