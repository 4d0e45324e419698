// Debug trace types
//
// A preview evaluation records, for every candidate rule in the catalog,
// what happened at each pipeline stage and why. Traces are pure values
// assembled from a read-over-snapshot run; serializing the same inputs
// twice yields byte-identical output.

use crate::conditions::ConditionOutcome;
use crate::promo::PromoValidation;
use crate::types::RuleKind;
use crate::ApplicationResult;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

/// Per-rule record of a preview evaluation
#[derive(Debug, Clone, Serialize)]
pub struct RuleTrace {
    pub rule_id: Uuid,
    pub kind: RuleKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Eligibility verdict at evaluation time (active + validity window)
    pub eligible: bool,
    pub matched: bool,
    /// Match or skip rationale; for failed conditions, the first failure
    pub reason: String,
    /// Full condition outcome when conditions were evaluated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<ConditionOutcome>,
    /// Computed discount, present for matched rules with a valid config
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount: Option<Decimal>,
    pub survived_stacking: bool,
    /// Whether the rule is in the final applied set
    pub applied: bool,
    /// Why a matched rule fell out of the pipeline, if it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
}

/// Complete preview of an evaluation: every rule's journey, the promo
/// verdict, and the result that a normal-mode evaluation would produce
/// (minus any usage intent, since previews commit nothing)
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationTrace {
    pub rules: Vec<RuleTrace>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo: Option<PromoValidation>,
    pub result: ApplicationResult,
}
