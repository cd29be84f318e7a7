use super::error::ComplianceResult;
use crate::domain::{ExecutionReport, OrderInfo};

/// A single compliance check, composed via the decorators in
/// [`super::decorators`] and aggregated per-account by
/// [`super::rule_set::ComplianceRuleSet`].
///
/// `report` lets a rule observe execution reports for orders it has seen
/// via `add`/`submit` (the source system wires this through a per-order
/// publisher monitor; here the rule set dispatches reports explicitly).
pub trait ComplianceRule: Send + Sync {
    fn add(&mut self, _order: &OrderInfo) {}

    fn submit(&mut self, order: &OrderInfo) -> ComplianceResult<()>;

    fn cancel(&mut self, _order: &OrderInfo) -> ComplianceResult<()> {
        Ok(())
    }

    fn report(&mut self, _order: &OrderInfo, _report: &ExecutionReport) {}
}
