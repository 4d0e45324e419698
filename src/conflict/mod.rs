// Conflict Resolver
//
// Selects the final applied set from the stacking survivors according to
// the configured strategy. All tie-breaks are by lowest rule id so
// resolution is deterministic and stable.

use crate::stacking::{rank, Candidate, DroppedRule};
use crate::types::ConflictStrategy;

/// Final selection plus per-rule drop reasons
#[derive(Debug, Clone)]
pub struct Resolution<'a> {
    pub winners: Vec<Candidate<'a>>,
    /// True only for the `manual` strategy: candidates are surfaced for
    /// external selection and nothing is committed
    pub requires_manual_selection: bool,
    pub dropped: Vec<DroppedRule>,
}

/// Resolve the survivor set under the given strategy
pub fn resolve(mut candidates: Vec<Candidate<'_>>, strategy: ConflictStrategy) -> Resolution<'_> {
    rank(&mut candidates);

    match strategy {
        ConflictStrategy::StackCompatible => Resolution {
            winners: candidates,
            requires_manual_selection: false,
            dropped: Vec::new(),
        },
        ConflictStrategy::Manual => Resolution {
            winners: candidates,
            requires_manual_selection: true,
            dropped: Vec::new(),
        },
        ConflictStrategy::HighestPriority | ConflictStrategy::FirstMatch => {
            // Ranked order already puts the max-priority, lowest-id rule
            // first, which is also the first match.
            keep_single(candidates, |winner| {
                format!("lost priority resolution to rule {}", winner.rule.id)
            })
        }
        ConflictStrategy::BestForCustomer => {
            let winner_index = best_discount_index(&candidates);
            match winner_index {
                Some(index) => {
                    let winner = candidates.remove(index);
                    let dropped = candidates
                        .into_iter()
                        .map(|candidate| DroppedRule {
                            rule_id: candidate.rule.id,
                            reason: format!(
                                "smaller discount than rule {} in best-for-customer resolution",
                                winner.rule.id
                            ),
                        })
                        .collect();
                    Resolution {
                        winners: vec![winner],
                        requires_manual_selection: false,
                        dropped,
                    }
                }
                None => Resolution {
                    winners: Vec::new(),
                    requires_manual_selection: false,
                    dropped: Vec::new(),
                },
            }
        }
    }
}

fn keep_single<'a, F>(candidates: Vec<Candidate<'a>>, drop_reason: F) -> Resolution<'a>
where
    F: Fn(&Candidate<'a>) -> String,
{
    let mut iter = candidates.into_iter();
    match iter.next() {
        Some(winner) => {
            let reason = drop_reason(&winner);
            let dropped = iter
                .map(|candidate| DroppedRule {
                    rule_id: candidate.rule.id,
                    reason: reason.clone(),
                })
                .collect();
            Resolution {
                winners: vec![winner],
                requires_manual_selection: false,
                dropped,
            }
        }
        None => Resolution {
            winners: Vec::new(),
            requires_manual_selection: false,
            dropped: Vec::new(),
        },
    }
}

/// Index of the maximum-discount candidate; ties go to the lowest rule id
fn best_discount_index(candidates: &[Candidate<'_>]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let better = match best {
            None => true,
            Some(current) => {
                candidate.discount > candidates[current].discount
                    || (candidate.discount == candidates[current].discount
                        && candidate.rule.id < candidates[current].rule.id)
            }
        };
        if better {
            best = Some(index);
        }
    }
    best
}
