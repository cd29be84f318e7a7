use crate::domain::{AccountId, Money, OrderId, Security};
use chrono::Duration;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ComplianceValue {
    Securities(Vec<Security>),
    Duration(i64),
    Quantity(i64),
    Money(Money),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceParameter {
    pub name: String,
    pub value: ComplianceValue,
}

impl ComplianceParameter {
    pub fn as_duration(&self) -> Option<Duration> {
        match &self.value {
            ComplianceValue::Duration(seconds) => Some(Duration::seconds(*seconds)),
            _ => None,
        }
    }

    pub fn as_money(&self) -> Option<Money> {
        match &self.value {
            ComplianceValue::Money(m) => Some(*m),
            _ => None,
        }
    }

    pub fn as_securities(&self) -> Option<&[Security]> {
        match &self.value {
            ComplianceValue::Securities(s) => Some(s),
            _ => None,
        }
    }
}

/// Names a rule implementation and the typed parameters an installer binds
/// to it; a builder registered with [`super::rule_set::ComplianceRuleSet`]
/// turns a schema instance into a live [`super::rule::ComplianceRule`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceRuleSchema {
    pub name: String,
    pub parameters: Vec<ComplianceParameter>,
}

impl ComplianceRuleSchema {
    pub fn parameter(&self, name: &str) -> Option<&ComplianceParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleState {
    Active,
    Passive,
    Disabled,
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceRuleEntryId(pub u64);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceRuleEntry {
    pub id: ComplianceRuleEntryId,
    pub target: AccountId,
    pub schema: ComplianceRuleSchema,
    pub state: RuleState,
}

/// Dispatched to the compliance service whenever a rule rejects a
/// submission or cancel, whether or not the rejection was actually
/// enforced (an `Active` rule blocks the order; a `Passive` one only logs
/// and reports).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub submission_account: AccountId,
    pub order_id: OrderId,
    pub rule_id: ComplianceRuleEntryId,
    pub schema_name: String,
    pub message: String,
}
