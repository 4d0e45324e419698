// Promo Code Validator
//
// Validates a submitted code against temporal, usage, and channel
// constraints and resolves it to the rule it activates. Validation is a
// snapshot-in-time advisory: the engine never increments usage counters,
// it emits an intent for the caller's atomic commit.

use crate::catalog::PromoCode;
use crate::order::OrderContext;
use crate::types::PromoRejection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome of validating one submitted code
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoValidation {
    /// The code as submitted by the customer
    pub submitted: String,
    /// Canonical (trimmed, uppercased) form of the code
    pub code: String,
    /// The rule the code activates, present only when valid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<PromoRejection>,
}

impl PromoValidation {
    pub fn is_valid(&self) -> bool {
        self.rejection.is_none() && self.rule_id.is_some()
    }

    fn rejected(submitted: &str, rejection: PromoRejection) -> Self {
        Self {
            submitted: submitted.to_string(),
            code: canonical(submitted),
            rule_id: None,
            rejection: Some(rejection),
        }
    }
}

/// The engine's instruction to the caller: commit this usage increment
/// atomically together with the order, re-checking the caps there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromoUsageIntent {
    pub code: String,
    pub rule_id: Uuid,
    pub customer_id: i32,
}

fn canonical(submitted: &str) -> String {
    submitted.trim().to_uppercase()
}

/// Validate a submitted code against the promo catalog
///
/// Checks run in order and stop at the first failure so every rejection
/// carries the earliest applicable reason.
pub fn validate(
    codes: &[PromoCode],
    submitted: &str,
    order: &OrderContext,
    now: DateTime<Utc>,
) -> PromoValidation {
    let code = match codes.iter().find(|code| code.matches(submitted)) {
        Some(code) => code,
        None => return PromoValidation::rejected(submitted, PromoRejection::NotFound),
    };

    if let Some(from) = code.valid_from {
        if now < from {
            return PromoValidation::rejected(submitted, PromoRejection::NotYetActive);
        }
    }
    if let Some(until) = code.valid_until {
        if now > until {
            return PromoValidation::rejected(submitted, PromoRejection::Expired);
        }
    }
    if let Some(minimum) = code.minimum_order_value {
        if order.subtotal() < minimum {
            return PromoValidation::rejected(submitted, PromoRejection::BelowMinimum);
        }
    }
    if !code.allowed_channels.is_empty() && !code.allowed_channels.contains(&order.channel) {
        return PromoValidation::rejected(submitted, PromoRejection::ChannelMismatch);
    }
    if let Some(limit) = code.usage_limit {
        if code.current_usage_count >= limit {
            return PromoValidation::rejected(submitted, PromoRejection::UsageLimitExceeded);
        }
    }
    if let Some(limit) = code.usage_per_customer {
        if order.customer.promo_usage_for(&code.code) >= limit {
            return PromoValidation::rejected(submitted, PromoRejection::CustomerLimitExceeded);
        }
    }

    PromoValidation {
        submitted: submitted.to_string(),
        code: code.code.to_uppercase(),
        rule_id: Some(code.rule_id),
        rejection: None,
    }
}
