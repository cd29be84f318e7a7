//! Pre-trade and cancel compliance checks: a composable [`rule::ComplianceRule`]
//! trait, concrete rules in [`rules`], scoping decorators in [`decorators`],
//! and per-account aggregation in [`rule_set::ComplianceRuleSet`].

pub mod decorators;
pub mod error;
pub mod rule;
pub mod rule_set;
pub mod rules;
pub mod schema;

pub use error::{ComplianceCheckError, ComplianceResult};
pub use rule::ComplianceRule;
pub use rule_set::{AncestryFn, ComplianceReportClient, ComplianceRuleSet};
pub use rules::{
    make_opposing_order_submission_rule, OpposingOrderSubmissionComplianceRule,
    SubmissionRestrictionPeriodComplianceRule,
};
pub use schema::{
    ComplianceParameter, ComplianceReport, ComplianceRuleEntry, ComplianceRuleEntryId, ComplianceRuleSchema, ComplianceValue, RuleState,
};
