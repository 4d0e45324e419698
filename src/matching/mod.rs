// Rule Matcher
//
// Applies the eligibility check before a rule's condition tree ever runs,
// then delegates to the condition evaluator. An ineligible rule is reported
// as skipped, never evaluated.

use crate::catalog::PricingRule;
use crate::conditions::{self, ConditionOutcome, EvalMode};
use crate::error::PricingResult;
use crate::order::OrderContext;
use chrono::{DateTime, Utc};

/// Verdict for one rule against one order
#[derive(Debug, Clone)]
pub struct MatchOutcome {
    /// Whether the rule passed the eligibility invariant (active and
    /// inside its validity window) at evaluation time
    pub eligible: bool,
    pub matched: bool,
    pub reason: String,
    /// Full condition outcome, present only when conditions were evaluated
    pub condition: Option<ConditionOutcome>,
}

impl MatchOutcome {
    fn skipped(eligible: bool, reason: &str) -> Self {
        Self {
            eligible,
            matched: false,
            reason: reason.to_string(),
            condition: None,
        }
    }
}

/// Match one rule against an order snapshot at instant `now`
pub fn match_rule(
    rule: &PricingRule,
    order: &OrderContext,
    now: DateTime<Utc>,
    mode: EvalMode,
) -> PricingResult<MatchOutcome> {
    if !rule.is_active {
        return Ok(MatchOutcome::skipped(false, "inactive"));
    }
    if !rule.is_eligible(now) {
        return Ok(MatchOutcome::skipped(false, "outside validity window"));
    }

    match &rule.conditions {
        None => Ok(MatchOutcome {
            eligible: true,
            matched: true,
            reason: "no conditions".to_string(),
            condition: None,
        }),
        Some(tree) => {
            let outcome = conditions::evaluate(tree, order, mode)?;
            Ok(MatchOutcome {
                eligible: true,
                matched: outcome.passed,
                reason: outcome.reason.clone(),
                condition: Some(outcome),
            })
        }
    }
}
