//! Aggregates compliance rules across an account's directory-entry ancestry
//! (the account itself plus any trading groups it belongs to) and fans
//! submissions, cancels and execution reports out to each entry according
//! to its [`RuleState`].

use super::error::ComplianceResult;
use super::rule::ComplianceRule;
use super::schema::{ComplianceReport, ComplianceRuleEntry, ComplianceRuleEntryId, ComplianceRuleSchema, RuleState};
use crate::domain::{AccountId, ExecutionReport, OrderInfo};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

type Builder = Arc<dyn Fn(&ComplianceRuleSchema) -> ComplianceResult<Box<dyn ComplianceRule>> + Send + Sync>;

fn violation_report(order: &OrderInfo, meta: &ComplianceRuleEntry, message: &str) -> ComplianceReport {
    ComplianceReport {
        submission_account: order.submission_account.clone(),
        order_id: order.order_id,
        rule_id: meta.id,
        schema_name: meta.schema.name.clone(),
        message: message.to_string(),
    }
}

struct Entry {
    meta: ComplianceRuleEntry,
    rule: Box<dyn ComplianceRule>,
}

/// Maps an account to the directory entries whose rules also govern it
/// (its enclosing trading groups). Supplied by the caller because the
/// directory hierarchy lives outside this module.
pub type AncestryFn = Arc<dyn Fn(&AccountId) -> Vec<AccountId> + Send + Sync>;

/// Where a rule violation is sent. Dispatched synchronously from the same
/// call site that evaluates the rule, mirroring how `report` delivers
/// execution reports to rules in this crate (see the compliance module's
/// design notes on the source system's async publisher-monitor queue).
pub trait ComplianceReportClient: Send + Sync {
    fn report(&self, report: ComplianceReport);
}

pub struct ComplianceRuleSet {
    builders: HashMap<String, Builder>,
    entries: HashMap<AccountId, Vec<Entry>>,
    ancestry: AncestryFn,
    report_client: Arc<dyn ComplianceReportClient>,
    next_id: u64,
}

impl ComplianceRuleSet {
    pub fn new(ancestry: AncestryFn, report_client: Arc<dyn ComplianceReportClient>) -> Self {
        ComplianceRuleSet { builders: HashMap::new(), entries: HashMap::new(), ancestry, report_client, next_id: 1 }
    }

    pub fn register_builder<F>(&mut self, name: impl Into<String>, builder: F)
    where
        F: Fn(&ComplianceRuleSchema) -> ComplianceResult<Box<dyn ComplianceRule>> + Send + Sync + 'static,
    {
        self.builders.insert(name.into(), Arc::new(builder));
    }

    /// Installs a schema for `target`, building its live rule instance.
    pub fn add(&mut self, target: AccountId, schema: ComplianceRuleSchema, state: RuleState) -> ComplianceResult<ComplianceRuleEntryId> {
        let builder = self
            .builders
            .get(&schema.name)
            .cloned()
            .ok_or_else(|| super::error::ComplianceCheckError::new(format!("no rule builder registered for '{}'", schema.name)))?;
        let rule = builder(&schema)?;
        let id = ComplianceRuleEntryId(self.next_id);
        self.next_id += 1;
        let meta = ComplianceRuleEntry { id, target: target.clone(), schema, state };
        self.entries.entry(target).or_default().push(Entry { meta, rule });
        Ok(id)
    }

    pub fn set_state(&mut self, target: &AccountId, id: ComplianceRuleEntryId, state: RuleState) {
        if let Some(list) = self.entries.get_mut(target) {
            if let Some(entry) = list.iter_mut().find(|e| e.meta.id == id) {
                entry.meta.state = state;
            }
        }
    }

    fn governing_accounts(&self, account: &AccountId) -> Vec<AccountId> {
        let mut accounts = vec![account.clone()];
        accounts.extend((self.ancestry)(account));
        accounts
    }

    fn for_each_governing_entry<F>(&mut self, account: &AccountId, mut f: F)
    where
        F: FnMut(&mut Entry),
    {
        for governing in self.governing_accounts(account) {
            if let Some(list) = self.entries.get_mut(&governing) {
                for entry in list.iter_mut() {
                    f(entry);
                }
            }
        }
    }

    pub fn submit(&mut self, order: &OrderInfo) -> ComplianceResult<()> {
        let mut rejection = None;
        let mut reports = Vec::new();
        self.for_each_governing_entry(&order.fields.account, |entry| {
            if entry.meta.state == RuleState::Disabled || entry.meta.state == RuleState::Deleted {
                return;
            }
            if let Err(e) = entry.rule.submit(order) {
                match entry.meta.state {
                    RuleState::Active => {
                        reports.push(violation_report(order, &entry.meta, &e.to_string()));
                        if rejection.is_none() {
                            rejection = Some(e);
                        }
                    }
                    RuleState::Passive => {
                        warn!(account = %entry.meta.target, rule = %entry.meta.schema.name, error = %e, "passive compliance rule violated");
                        reports.push(violation_report(order, &entry.meta, &e.to_string()));
                    }
                    _ => {}
                }
            }
        });
        for report in reports {
            self.report_client.report(report);
        }
        match rejection {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn cancel(&mut self, order: &OrderInfo) -> ComplianceResult<()> {
        let mut rejection = None;
        let mut reports = Vec::new();
        self.for_each_governing_entry(&order.fields.account, |entry| {
            if entry.meta.state == RuleState::Disabled || entry.meta.state == RuleState::Deleted {
                return;
            }
            if let Err(e) = entry.rule.cancel(order) {
                match entry.meta.state {
                    RuleState::Active => {
                        reports.push(violation_report(order, &entry.meta, &e.to_string()));
                        if rejection.is_none() {
                            rejection = Some(e);
                        }
                    }
                    RuleState::Passive => {
                        warn!(account = %entry.meta.target, rule = %entry.meta.schema.name, error = %e, "passive compliance rule violated on cancel");
                        reports.push(violation_report(order, &entry.meta, &e.to_string()));
                    }
                    _ => {}
                }
            }
        });
        for report in reports {
            self.report_client.report(report);
        }
        match rejection {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn add_order(&mut self, order: &OrderInfo) {
        self.for_each_governing_entry(&order.fields.account, |entry| {
            if entry.meta.state != RuleState::Deleted {
                entry.rule.add(order);
            }
        });
    }

    pub fn report(&mut self, order: &OrderInfo, report: &ExecutionReport) {
        self.for_each_governing_entry(&order.fields.account, |entry| {
            if entry.meta.state != RuleState::Deleted {
                entry.rule.report(order, report);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::error::ComplianceCheckError;
    use crate::compliance::schema::ComplianceValue;
    use crate::domain::{CurrencyId, Destination, Money, OrderFields, OrderId, OrderType, Side, TimeInForce};
    use chrono::Utc;
    use std::collections::HashMap as Map;
    use std::sync::Mutex;

    struct RejectAll;
    impl ComplianceRule for RejectAll {
        fn submit(&mut self, _order: &OrderInfo) -> ComplianceResult<()> {
            Err(ComplianceCheckError::new("rejected"))
        }
    }

    #[derive(Default)]
    struct RecordingReportClient(Mutex<Vec<ComplianceReport>>);
    impl ComplianceReportClient for RecordingReportClient {
        fn report(&self, report: ComplianceReport) {
            self.0.lock().unwrap().push(report);
        }
    }

    fn order(account: &str) -> OrderInfo {
        OrderInfo {
            fields: OrderFields {
                account: AccountId(account.into()),
                security: crate::domain::Security::new("ABC", "NSDQ", "US"),
                currency: CurrencyId("USD".into()),
                order_type: OrderType::Limit,
                side: Side::Bid,
                destination: Destination("NSDQ".into()),
                quantity: 100,
                price: Money::ZERO,
                time_in_force: TimeInForce::Day,
                tags: Map::new(),
            },
            submission_account: AccountId(account.into()),
            order_id: OrderId(1),
            is_short: false,
            timestamp: Utc::now(),
        }
    }

    fn schema() -> ComplianceRuleSchema {
        let noop = crate::compliance::schema::ComplianceParameter { name: "noop".into(), value: ComplianceValue::Quantity(0) };
        ComplianceRuleSchema { name: "reject_all".into(), parameters: vec![noop] }
    }

    #[test]
    fn active_rule_rejects_submission() {
        let reports: Arc<RecordingReportClient> = Arc::default();
        let mut set = ComplianceRuleSet::new(Arc::new(|_| Vec::new()), reports.clone());
        set.register_builder("reject_all", |_schema| Ok(Box::new(RejectAll)));
        let id = set.add(AccountId("acct1".into()), schema(), RuleState::Active).unwrap();
        assert!(set.submit(&order("acct1")).is_err());

        let recorded = reports.0.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].rule_id, id);
        assert_eq!(recorded[0].submission_account, AccountId("acct1".into()));
    }

    #[test]
    fn passive_rule_reports_but_does_not_reject() {
        let reports: Arc<RecordingReportClient> = Arc::default();
        let mut set = ComplianceRuleSet::new(Arc::new(|_| Vec::new()), reports.clone());
        set.register_builder("reject_all", |_schema| Ok(Box::new(RejectAll)));
        set.add(AccountId("acct1".into()), schema(), RuleState::Passive).unwrap();
        assert!(set.submit(&order("acct1")).is_ok());
        assert_eq!(reports.0.lock().unwrap().len(), 1);
    }

    #[test]
    fn disabled_rule_is_skipped_entirely() {
        let reports: Arc<RecordingReportClient> = Arc::default();
        let mut set = ComplianceRuleSet::new(Arc::new(|_| Vec::new()), reports.clone());
        set.register_builder("reject_all", |_schema| Ok(Box::new(RejectAll)));
        set.add(AccountId("acct1".into()), schema(), RuleState::Disabled).unwrap();
        assert!(set.submit(&order("acct1")).is_ok());
        assert!(reports.0.lock().unwrap().is_empty());
    }

    #[test]
    fn group_rule_governs_member_account() {
        let ancestry: AncestryFn = Arc::new(|account| {
            if account.0 == "acct1" { vec![AccountId("group1".into())] } else { Vec::new() }
        });
        let reports: Arc<RecordingReportClient> = Arc::default();
        let mut set = ComplianceRuleSet::new(ancestry, reports);
        set.register_builder("reject_all", |_schema| Ok(Box::new(RejectAll)));
        set.add(AccountId("group1".into()), schema(), RuleState::Active).unwrap();
        assert!(set.submit(&order("acct1")).is_err());
    }
}
