//! Concrete compliance rules, each paired with a `make_*` builder that wraps
//! it in the decorator stack described in `super::decorators`.

use super::decorators::{MapSecurityComplianceRule, SecurityFilterComplianceRule, TimeFilterComplianceRule};
use super::error::{ComplianceCheckError, ComplianceResult};
use super::rule::ComplianceRule;
use crate::clock::TimeClient;
use crate::domain::{ExecutionReport, Money, OrderFields, OrderInfo, OrderStatus, OrderType, Security, Side};
use chrono::{DateTime, Duration, Timelike, Utc};
use std::collections::HashSet;
use std::sync::Arc;

/// The price a compliance rule should gate on for an order that may not
/// carry a real limit price. Limit orders use their own price; market
/// orders substitute the side's most-marketable sentinel (zero for an ask,
/// unbounded for a bid); pegged orders have no fixed submission price and
/// are excluded from this rule entirely.
fn submission_price(fields: &OrderFields) -> Option<Money> {
    match fields.order_type {
        OrderType::Limit => Some(fields.price),
        OrderType::Market => Some(match fields.side {
            Side::Ask => Money::ZERO,
            Side::Bid => Money::MAX,
            Side::None => fields.price,
        }),
        OrderType::Pegged => None,
    }
}

/// Rejects a submission that would re-cross a price the same account just
/// had canceled on the opposing side, within `timeout`, unless it has moved
/// away by at least `offset`.
///
/// Grounded in the source system's opposing-order rule: it watches execution
/// reports for `Canceled` fills to track, per side, the *most aggressive*
/// canceled price seen within `timeout`, then at submission time checks the
/// new order's price against the opposing side's tracked price adjusted by
/// `offset`. A tracked price that falls outside `timeout` resets rather than
/// keeping a stale, possibly less aggressive, price around.
pub struct OpposingOrderSubmissionComplianceRule {
    timeout: Duration,
    offset: Money,
    clock: Arc<dyn TimeClient>,
    last_ask_cancel: Option<(DateTime<Utc>, Money)>,
    last_bid_cancel: Option<(DateTime<Utc>, Money)>,
}

impl OpposingOrderSubmissionComplianceRule {
    pub fn new(timeout: Duration, offset: Money, clock: Arc<dyn TimeClient>) -> Self {
        OpposingOrderSubmissionComplianceRule {
            timeout,
            offset,
            clock,
            last_ask_cancel: None,
            last_bid_cancel: None,
        }
    }

    fn within_timeout(&self, recorded: DateTime<Utc>) -> bool {
        self.clock.now() - recorded <= self.timeout
    }
}

impl ComplianceRule for OpposingOrderSubmissionComplianceRule {
    fn submit(&mut self, order: &OrderInfo) -> ComplianceResult<()> {
        let Some(price) = submission_price(&order.fields) else { return Ok(()) };
        match order.fields.side {
            Side::Ask => {
                if let Some((when, bid_price)) = self.last_bid_cancel {
                    if self.within_timeout(when) && price <= bid_price + self.offset {
                        return Err(ComplianceCheckError::new(
                            "ask submission re-crosses a recently canceled bid",
                        ));
                    }
                }
            }
            Side::Bid => {
                if let Some((when, ask_price)) = self.last_ask_cancel {
                    if self.within_timeout(when) && price >= ask_price - self.offset {
                        return Err(ComplianceCheckError::new(
                            "bid submission re-crosses a recently canceled ask",
                        ));
                    }
                }
            }
            Side::None => {}
        }
        Ok(())
    }

    fn report(&mut self, order: &OrderInfo, report: &ExecutionReport) {
        if report.status != OrderStatus::Canceled {
            return;
        }
        let Some(price) = submission_price(&order.fields) else { return };
        match order.fields.side {
            Side::Ask => {
                if self.last_ask_cancel.is_some_and(|(when, _)| !self.within_timeout(when)) {
                    self.last_ask_cancel = None;
                }
                let replace = match self.last_ask_cancel {
                    None => true,
                    Some((when, tracked)) => report.timestamp >= when && price <= tracked,
                };
                if replace {
                    self.last_ask_cancel = Some((report.timestamp, price));
                }
            }
            Side::Bid => {
                if self.last_bid_cancel.is_some_and(|(when, _)| !self.within_timeout(when)) {
                    self.last_bid_cancel = None;
                }
                let replace = match self.last_bid_cancel {
                    None => true,
                    Some((when, tracked)) => report.timestamp >= when && price >= tracked,
                };
                if replace {
                    self.last_bid_cancel = Some((report.timestamp, price));
                }
            }
            Side::None => {}
        }
    }
}

/// Composes an [`OpposingOrderSubmissionComplianceRule`] behind the standard
/// decorator stack: security filter outermost, then a time-of-day filter,
/// then a per-security instance map.
pub fn make_opposing_order_submission_rule(
    symbols: HashSet<Security>,
    active_start: Duration,
    active_end: Duration,
    timeout: Duration,
    offset: Money,
    clock: Arc<dyn TimeClient>,
) -> Box<dyn ComplianceRule> {
    let clock_for_rule = clock.clone();
    let map = MapSecurityComplianceRule::new(Arc::new(move || {
        Box::new(OpposingOrderSubmissionComplianceRule::new(timeout, offset, clock_for_rule.clone()))
            as Box<dyn ComplianceRule>
    }));
    let time_filtered = TimeFilterComplianceRule::new(active_start, active_end, clock, Box::new(map));
    Box::new(SecurityFilterComplianceRule::new(symbols, Box::new(time_filtered)))
}

/// Rejects any submission on a listed security during a configured
/// time-of-day window, wrapping past midnight when `end < start`.
pub struct SubmissionRestrictionPeriodComplianceRule {
    symbols: HashSet<Security>,
    start: Duration,
    end: Duration,
    clock: Arc<dyn TimeClient>,
}

impl SubmissionRestrictionPeriodComplianceRule {
    pub fn new(symbols: HashSet<Security>, start: Duration, end: Duration, clock: Arc<dyn TimeClient>) -> Self {
        SubmissionRestrictionPeriodComplianceRule { symbols, start, end, clock }
    }

    fn seconds_since_midnight(&self) -> i64 {
        let now = self.clock.now();
        now.time().num_seconds_from_midnight() as i64
    }
}

impl ComplianceRule for SubmissionRestrictionPeriodComplianceRule {
    fn submit(&mut self, order: &OrderInfo) -> ComplianceResult<()> {
        if !self.symbols.contains(&order.fields.security) {
            return Ok(());
        }
        let now = self.seconds_since_midnight();
        let start = self.start.num_seconds();
        let end = self.end.num_seconds();
        let restricted = if start <= end {
            now >= start && now <= end
        } else {
            now >= start || now <= end
        };
        if restricted {
            Err(ComplianceCheckError::new("security is under a submission restriction period"))
        } else {
            Ok(())
        }
    }
}
