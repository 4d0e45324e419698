// Stacking Engine
//
// Partitions matched rules by stack group and enforces combination limits.
// Candidates are considered in priority-descending, id-ascending order;
// when a bound would be exceeded, lower-priority rules are dropped first.

use crate::catalog::{PricingRule, StackingConfig};
use rust_decimal::Decimal;
use uuid::Uuid;

/// A matched rule with its computed discount, awaiting stacking and
/// conflict resolution
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub rule: &'a PricingRule,
    pub discount: Decimal,
    /// Why the rule matched, carried through to the final result
    pub rationale: String,
}

/// A rule dropped during stacking or conflict resolution, with the reason
#[derive(Debug, Clone)]
pub struct DroppedRule {
    pub rule_id: Uuid,
    pub reason: String,
}

/// Survivors of the stacking pass plus per-rule drop reasons
#[derive(Debug, Clone)]
pub struct StackingOutcome<'a> {
    pub survivors: Vec<Candidate<'a>>,
    pub dropped: Vec<DroppedRule>,
}

/// Sort candidates priority-descending, then id-ascending for
/// deterministic, stable selection
pub(crate) fn rank(candidates: &mut [Candidate<'_>]) {
    candidates.sort_by(|a, b| {
        b.rule
            .priority
            .cmp(&a.rule.priority)
            .then_with(|| a.rule.id.cmp(&b.rule.id))
    });
}

/// Filter matched rules down to a combinable set
pub fn filter_for_stacking<'a>(
    mut candidates: Vec<Candidate<'a>>,
    config: &StackingConfig,
    subtotal: Decimal,
) -> StackingOutcome<'a> {
    rank(&mut candidates);
    let mut dropped = Vec::new();

    if candidates.is_empty() {
        return StackingOutcome {
            survivors: candidates,
            dropped,
        };
    }

    if !config.allow_stacking {
        let mut survivors = candidates;
        for candidate in survivors.split_off(1) {
            dropped.push(DroppedRule {
                rule_id: candidate.rule.id,
                reason: "stacking disabled".to_string(),
            });
        }
        return StackingOutcome { survivors, dropped };
    }

    // The top-ranked candidate leads; only non-exclusive rules sharing its
    // stack group may join.
    let mut survivors: Vec<Candidate<'a>> = Vec::new();
    for candidate in candidates {
        if survivors.is_empty() {
            survivors.push(candidate);
            continue;
        }
        let leader = &survivors[0];
        if leader.rule.is_exclusive() {
            dropped.push(DroppedRule {
                rule_id: candidate.rule.id,
                reason: format!("excluded by exclusive rule {}", leader.rule.id),
            });
            continue;
        }
        if candidate.rule.is_exclusive() {
            dropped.push(DroppedRule {
                rule_id: candidate.rule.id,
                reason: "exclusive rule cannot combine".to_string(),
            });
            continue;
        }
        if candidate.rule.stack_group != leader.rule.stack_group {
            dropped.push(DroppedRule {
                rule_id: candidate.rule.id,
                reason: format!(
                    "not in stack group \"{}\"",
                    leader.rule.stack_group.as_deref().unwrap_or("")
                ),
            });
            continue;
        }
        if survivors.len() >= config.max_stack_count {
            dropped.push(DroppedRule {
                rule_id: candidate.rule.id,
                reason: "stack count limit reached".to_string(),
            });
            continue;
        }
        survivors.push(candidate);
    }

    // Combined discount may not exceed the configured share of the
    // subtotal; drop from the bottom until it fits. The last survivor
    // always stands (the result-level clamp still bounds the total).
    let cap = subtotal * config.max_total_discount_percentage / Decimal::ONE_HUNDRED;
    let mut combined: Decimal = survivors.iter().map(|candidate| candidate.discount).sum();
    while survivors.len() > 1 && combined > cap {
        if let Some(removed) = survivors.pop() {
            combined -= removed.discount;
            dropped.push(DroppedRule {
                rule_id: removed.rule.id,
                reason: "combined discount cap exceeded".to_string(),
            });
        }
    }

    StackingOutcome { survivors, dropped }
}
