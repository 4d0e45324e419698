// Error types for the Pricing Rule Engine
// Distinguishes per-rule definition problems (reported as skip reasons)
// from hard failures that abort a whole evaluation.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for the Pricing Rule Engine
///
/// Business outcomes (a rule not matching, a promo code being rejected,
/// a discount being clamped) are values, never errors. Only definition
/// problems and data-integrity bugs surface here.
#[derive(Debug, Error)]
pub enum PricingError {
    /// A rule's config payload is missing, malformed, or out of range
    /// for its rule kind. Reported per-rule as a skip reason and never
    /// aborts evaluation of other rules.
    #[error("Invalid rule configuration for rule {rule_id}: {reason}")]
    InvalidRuleConfig { rule_id: Uuid, reason: String },

    /// A condition tree nests deeper than the engine allows.
    /// Indicates a data-integrity bug upstream, so the whole evaluation
    /// aborts rather than producing a partial result.
    #[error("Condition tree exceeds maximum depth of {max_depth}")]
    ConditionTreeTooDeep { max_depth: usize },

    /// Arithmetic that cannot proceed (overflow, unrepresentable value)
    #[error("Calculation error: {0}")]
    Calculation(String),
}

/// Result type alias for pricing engine operations
pub type PricingResult<T> = Result<T, PricingError>;
