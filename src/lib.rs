// Pricing Rule Evaluation Engine
//
// A pure, stateless engine that decides which pricing rules apply to an
// order, resolves conflicts among simultaneously-matching rules, computes
// the resulting discounts, validates promo codes, and can explain every
// decision. It manages six core capabilities:
// - Condition evaluation: boolean condition trees over an order snapshot
// - Rule matching: eligibility plus conditions, with reasons
// - Discount calculation: per-kind monetary semantics in fixed-point decimal
// - Stacking: group-based combination limits
// - Conflict resolution: final-set selection per configured strategy
// - Promo validation: constraint checks resolving a code to its rule
//
// The engine performs no I/O and holds no state between invocations;
// callers own persistence, HTTP, and the atomic commit of promo usage.

pub mod catalog;
pub mod conditions;
pub mod conflict;
pub mod discount;
pub mod error;
pub mod matching;
pub mod order;
pub mod promo;
pub mod stacking;
pub mod trace;
pub mod types;


// Re-export commonly used types for convenience
pub use catalog::{
    BogoConfig, BundleConfig, CategoryConfig, DiscountTier, FixedConfig, FlashSaleConfig,
    HappyHourConfig, ItemPriceOverrideConfig, LoyaltyConfig, PercentageConfig, PriceOverride,
    PricingRule, PromoCode, StackingConfig, TieredConfig, TimeRange, EXCLUSIVE_STACK_GROUP,
};
pub use conditions::{Condition, ConditionOutcome, EvalMode, Operator, MAX_CONDITION_DEPTH};
pub use conflict::Resolution;
pub use error::{PricingError, PricingResult};
pub use matching::MatchOutcome;
pub use order::{CustomerProfile, LineItem, OrderContext};
pub use promo::{PromoUsageIntent, PromoValidation};
pub use stacking::{Candidate, DroppedRule, StackingOutcome};
pub use trace::{EvaluationTrace, RuleTrace};
pub use types::{ConflictStrategy, PromoRejection, RuleKind, SalesChannel};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

/// Everything one evaluation needs, supplied by the caller
///
/// `now` is part of the request so an evaluation is a pure function of
/// its inputs: identical requests produce identical results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRequest {
    /// Rule catalog, already scoped by the caller
    pub rules: Vec<PricingRule>,
    /// Promo code catalog; rules referenced here only participate when
    /// the matching code validates
    #[serde(default)]
    pub promo_codes: Vec<PromoCode>,
    pub order: OrderContext,
    pub strategy: ConflictStrategy,
    pub stacking: StackingConfig,
    pub now: chrono::DateTime<chrono::Utc>,
}

/// One rule in the final applied set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppliedRule {
    pub rule_id: Uuid,
    pub kind: RuleKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub discount_amount: Decimal,
    /// Why the rule matched
    pub rationale: String,
}

/// Result of one evaluation
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationResult {
    pub subtotal: Decimal,
    /// Final applied rules in priority-descending, id-ascending order
    pub applied_rules: Vec<AppliedRule>,
    /// Total discount, clamped so the post-discount total is never negative
    pub total_discount: Decimal,
    pub final_total: Decimal,
    /// True under the `manual` strategy: candidates are surfaced but no
    /// discount is committed
    pub requires_manual_selection: bool,
    /// Verdict for the submitted promo code, if one was submitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promo: Option<PromoValidation>,
    /// Present when a validated promo's rule was applied: the caller must
    /// commit this increment atomically with the order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_intent: Option<PromoUsageIntent>,
}

/// Pricing Rule Engine
///
/// Coordinates matching, discount calculation, stacking, conflict
/// resolution, and promo validation over caller-supplied data. Stateless
/// and safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct PricingEngine;

impl PricingEngine {
    /// Create a new PricingEngine
    pub fn new() -> Self {
        Self
    }

    /// Evaluate an order against the rule catalog
    ///
    /// Orchestrates the full pipeline:
    /// 1. Validate the submitted promo code, unlocking its rule if valid
    /// 2. Match each rule (eligibility, then conditions)
    /// 3. Compute discounts for matched rules
    /// 4. Enforce stacking limits
    /// 5. Resolve conflicts per the configured strategy
    pub fn evaluate(&self, request: &EvaluationRequest) -> PricingResult<ApplicationResult> {
        let (result, _) = self.run(request, EvalMode::ShortCircuit)?;
        Ok(result)
    }

    /// Preview an order without any side-effecting intent
    ///
    /// Runs the same pipeline exhaustively, recording every rule's journey
    /// through it. Never emits a usage intent; running a preview commits
    /// nothing anywhere.
    pub fn preview(&self, request: &EvaluationRequest) -> PricingResult<EvaluationTrace> {
        let (mut result, rules) = self.run(request, EvalMode::Exhaustive)?;
        result.usage_intent = None;
        Ok(EvaluationTrace {
            rules,
            promo: result.promo.clone(),
            result,
        })
    }

    fn run(
        &self,
        request: &EvaluationRequest,
        mode: EvalMode,
    ) -> PricingResult<(ApplicationResult, Vec<RuleTrace>)> {
        let order = &request.order;
        let subtotal = order.subtotal();

        let promo_validation = order
            .promo_code
            .as_deref()
            .map(|submitted| promo::validate(&request.promo_codes, submitted, order, request.now));
        let unlocked_rule = promo_validation
            .as_ref()
            .filter(|validation| validation.is_valid())
            .and_then(|validation| validation.rule_id);
        let promo_gated: HashSet<Uuid> = request
            .promo_codes
            .iter()
            .map(|code| code.rule_id)
            .collect();

        tracing::debug!(
            "evaluating {} rules against subtotal {} with strategy {}",
            request.rules.len(),
            subtotal,
            request.strategy
        );

        let mut traces: Vec<RuleTrace> = Vec::with_capacity(request.rules.len());
        let mut candidates: Vec<Candidate<'_>> = Vec::new();

        for rule in &request.rules {
            let locked = promo_gated.contains(&rule.id) && unlocked_rule != Some(rule.id);

            if locked && mode == EvalMode::ShortCircuit {
                traces.push(RuleTrace {
                    rule_id: rule.id,
                    kind: rule.kind,
                    description: rule.description.clone(),
                    eligible: rule.is_eligible(request.now),
                    matched: false,
                    reason: "requires promo code".to_string(),
                    condition: None,
                    discount: None,
                    survived_stacking: false,
                    applied: false,
                    skip_reason: Some("requires promo code".to_string()),
                });
                continue;
            }

            let outcome = matching::match_rule(rule, order, request.now, mode)?;
            let mut entry = RuleTrace {
                rule_id: rule.id,
                kind: rule.kind,
                description: rule.description.clone(),
                eligible: outcome.eligible,
                matched: outcome.matched,
                reason: outcome.reason.clone(),
                condition: outcome.condition,
                discount: None,
                survived_stacking: false,
                applied: false,
                skip_reason: None,
            };

            if locked {
                entry.skip_reason = Some("requires promo code".to_string());
                traces.push(entry);
                continue;
            }
            if !outcome.matched {
                traces.push(entry);
                continue;
            }

            let computed = catalog::validate_rule(rule).and_then(|_| discount::calculate(rule, order));
            match computed {
                Ok(amount) => {
                    entry.discount = Some(amount);
                    candidates.push(Candidate {
                        rule,
                        discount: amount,
                        rationale: outcome.reason,
                    });
                }
                Err(PricingError::InvalidRuleConfig { reason, .. }) => {
                    tracing::warn!("skipping rule {} with invalid configuration: {}", rule.id, reason);
                    entry.skip_reason = Some(format!("invalid configuration: {}", reason));
                }
                Err(other) => return Err(other),
            }
            traces.push(entry);
        }

        let mut index: HashMap<Uuid, usize> = HashMap::new();
        for (position, entry) in traces.iter().enumerate() {
            index.entry(entry.rule_id).or_insert(position);
        }

        let stacking_outcome = stacking::filter_for_stacking(candidates, &request.stacking, subtotal);
        for dropped in &stacking_outcome.dropped {
            if let Some(&position) = index.get(&dropped.rule_id) {
                traces[position].skip_reason = Some(dropped.reason.clone());
            }
        }
        for survivor in &stacking_outcome.survivors {
            if let Some(&position) = index.get(&survivor.rule.id) {
                traces[position].survived_stacking = true;
            }
        }

        let resolution = conflict::resolve(stacking_outcome.survivors, request.strategy);
        for dropped in &resolution.dropped {
            if let Some(&position) = index.get(&dropped.rule_id) {
                traces[position].skip_reason = Some(dropped.reason.clone());
            }
        }

        let applied_rules: Vec<AppliedRule> = resolution
            .winners
            .iter()
            .map(|winner| AppliedRule {
                rule_id: winner.rule.id,
                kind: winner.rule.kind,
                description: winner.rule.description.clone(),
                discount_amount: winner.discount,
                rationale: winner.rationale.clone(),
            })
            .collect();
        for applied in &applied_rules {
            if let Some(&position) = index.get(&applied.rule_id) {
                traces[position].applied = true;
            }
        }

        let requires_manual_selection = resolution.requires_manual_selection;
        // Under manual selection nothing is committed; the caller picks.
        let total_discount = if requires_manual_selection {
            Decimal::ZERO
        } else {
            applied_rules
                .iter()
                .map(|applied| applied.discount_amount)
                .sum::<Decimal>()
                .min(subtotal)
        };
        let final_total = subtotal - total_discount;

        let usage_intent = promo_validation
            .as_ref()
            .filter(|validation| validation.is_valid() && !requires_manual_selection)
            .and_then(|validation| {
                let rule_id = validation.rule_id?;
                let was_applied = applied_rules.iter().any(|applied| applied.rule_id == rule_id);
                if was_applied {
                    Some(PromoUsageIntent {
                        code: validation.code.clone(),
                        rule_id,
                        customer_id: order.customer.id,
                    })
                } else {
                    None
                }
            });

        tracing::debug!(
            "applied {} rules for a total discount of {}",
            applied_rules.len(),
            total_discount
        );

        let result = ApplicationResult {
            subtotal,
            applied_rules,
            total_discount,
            final_total,
            requires_manual_selection,
            promo: promo_validation,
            usage_intent,
        };
        Ok((result, traces))
    }
}
