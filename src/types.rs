// Domain type definitions for the Pricing Rule Engine
// Provides the closed enumerations shared across the engine components

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of pricing rule
///
/// Each kind carries its own typed config payload (see `catalog`), decoded
/// and dispatched through a single exhaustive match in the discount
/// calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Percentage off the full order subtotal
    PercentageDiscount,

    /// Fixed amount off the order subtotal
    FixedDiscount,

    /// Buy N, get M at a percentage off their unit price
    Bogo,

    /// A set of items sold together at a bundle price
    Bundle,

    /// Percentage off during a recurring time-of-day window
    HappyHour,

    /// Percentage off selected by the highest qualifying subtotal tier
    Tiered,

    /// Listed items sold at an overridden unit price
    ItemPriceOverride,

    /// Percentage off items in the configured categories
    CategoryDiscount,

    /// Percentage off derived from the customer's loyalty tier
    Loyalty,

    /// Percentage off the listed items for a short-lived sale
    FlashSale,
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleKind::PercentageDiscount => write!(f, "percentage_discount"),
            RuleKind::FixedDiscount => write!(f, "fixed_discount"),
            RuleKind::Bogo => write!(f, "bogo"),
            RuleKind::Bundle => write!(f, "bundle"),
            RuleKind::HappyHour => write!(f, "happy_hour"),
            RuleKind::Tiered => write!(f, "tiered"),
            RuleKind::ItemPriceOverride => write!(f, "item_price_override"),
            RuleKind::CategoryDiscount => write!(f, "category_discount"),
            RuleKind::Loyalty => write!(f, "loyalty"),
            RuleKind::FlashSale => write!(f, "flash_sale"),
        }
    }
}

impl std::str::FromStr for RuleKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage_discount" => Ok(RuleKind::PercentageDiscount),
            "fixed_discount" => Ok(RuleKind::FixedDiscount),
            "bogo" => Ok(RuleKind::Bogo),
            "bundle" => Ok(RuleKind::Bundle),
            "happy_hour" => Ok(RuleKind::HappyHour),
            "tiered" => Ok(RuleKind::Tiered),
            "item_price_override" => Ok(RuleKind::ItemPriceOverride),
            "category_discount" => Ok(RuleKind::CategoryDiscount),
            "loyalty" => Ok(RuleKind::Loyalty),
            "flash_sale" => Ok(RuleKind::FlashSale),
            _ => Err(format!("Invalid rule kind: {}", s)),
        }
    }
}

/// Strategy for selecting the final applied set from simultaneously
/// matching rules
///
/// Applied after the stacking engine has enforced combination limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictStrategy {
    /// Keep the rule with the maximum priority; ties broken by lowest rule id
    HighestPriority,

    /// Keep the single rule yielding the maximum discount; ties broken by
    /// lowest rule id
    BestForCustomer,

    /// Keep the first rule in priority-descending, then id-ascending order
    FirstMatch,

    /// Keep everything the stacking engine let through
    StackCompatible,

    /// Surface all matched rules unresolved for external selection
    Manual,
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictStrategy::HighestPriority => write!(f, "highest_priority"),
            ConflictStrategy::BestForCustomer => write!(f, "best_for_customer"),
            ConflictStrategy::FirstMatch => write!(f, "first_match"),
            ConflictStrategy::StackCompatible => write!(f, "stack_compatible"),
            ConflictStrategy::Manual => write!(f, "manual"),
        }
    }
}

impl Default for ConflictStrategy {
    fn default() -> Self {
        ConflictStrategy::StackCompatible
    }
}

/// Sales channel an order was placed through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SalesChannel {
    DineIn,
    Takeaway,
    Delivery,
    Online,
}

impl fmt::Display for SalesChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SalesChannel::DineIn => write!(f, "dine_in"),
            SalesChannel::Takeaway => write!(f, "takeaway"),
            SalesChannel::Delivery => write!(f, "delivery"),
            SalesChannel::Online => write!(f, "online"),
        }
    }
}

impl std::str::FromStr for SalesChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dine_in" => Ok(SalesChannel::DineIn),
            "takeaway" => Ok(SalesChannel::Takeaway),
            "delivery" => Ok(SalesChannel::Delivery),
            "online" => Ok(SalesChannel::Online),
            _ => Err(format!("Invalid sales channel: {}", s)),
        }
    }
}

/// Structured reason a promo code was rejected
///
/// Every rejection is a value, never an error; the caller renders it
/// into its own response format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoRejection {
    /// No code matched (case-insensitively)
    NotFound,

    /// The code's validity window has not opened yet
    NotYetActive,

    /// The code's validity window has closed
    Expired,

    /// The order subtotal is below the code's minimum order value
    BelowMinimum,

    /// The order's sales channel is not in the code's allowed set
    ChannelMismatch,

    /// The global usage cap is already reached
    UsageLimitExceeded,

    /// This customer's usage cap is already reached
    CustomerLimitExceeded,
}

impl fmt::Display for PromoRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromoRejection::NotFound => write!(f, "promo code not found"),
            PromoRejection::NotYetActive => write!(f, "promo code not yet active"),
            PromoRejection::Expired => write!(f, "promo code expired"),
            PromoRejection::BelowMinimum => write!(f, "order below minimum value for promo code"),
            PromoRejection::ChannelMismatch => write!(f, "promo code not valid for this channel"),
            PromoRejection::UsageLimitExceeded => write!(f, "promo code usage limit exceeded"),
            PromoRejection::CustomerLimitExceeded => {
                write!(f, "customer usage limit exceeded for promo code")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_rule_kind_display() {
        assert_eq!(RuleKind::PercentageDiscount.to_string(), "percentage_discount");
        assert_eq!(RuleKind::Bogo.to_string(), "bogo");
        assert_eq!(RuleKind::HappyHour.to_string(), "happy_hour");
        assert_eq!(RuleKind::ItemPriceOverride.to_string(), "item_price_override");
        assert_eq!(RuleKind::FlashSale.to_string(), "flash_sale");
    }

    #[test]
    fn test_rule_kind_from_str() {
        assert_eq!(RuleKind::from_str("bundle").unwrap(), RuleKind::Bundle);
        assert_eq!(RuleKind::from_str("tiered").unwrap(), RuleKind::Tiered);
        assert_eq!(RuleKind::from_str("loyalty").unwrap(), RuleKind::Loyalty);
        assert!(RuleKind::from_str("invalid").is_err());
    }

    #[test]
    fn test_rule_kind_round_trip() {
        let kinds = [
            RuleKind::PercentageDiscount,
            RuleKind::FixedDiscount,
            RuleKind::Bogo,
            RuleKind::Bundle,
            RuleKind::HappyHour,
            RuleKind::Tiered,
            RuleKind::ItemPriceOverride,
            RuleKind::CategoryDiscount,
            RuleKind::Loyalty,
            RuleKind::FlashSale,
        ];
        for kind in kinds {
            assert_eq!(RuleKind::from_str(&kind.to_string()).unwrap(), kind);
        }
    }

    #[test]
    fn test_conflict_strategy_display() {
        assert_eq!(ConflictStrategy::HighestPriority.to_string(), "highest_priority");
        assert_eq!(ConflictStrategy::BestForCustomer.to_string(), "best_for_customer");
        assert_eq!(ConflictStrategy::FirstMatch.to_string(), "first_match");
        assert_eq!(ConflictStrategy::StackCompatible.to_string(), "stack_compatible");
        assert_eq!(ConflictStrategy::Manual.to_string(), "manual");
    }

    #[test]
    fn test_conflict_strategy_default() {
        assert_eq!(ConflictStrategy::default(), ConflictStrategy::StackCompatible);
    }

    #[test]
    fn test_sales_channel_from_str() {
        assert_eq!(SalesChannel::from_str("dine_in").unwrap(), SalesChannel::DineIn);
        assert_eq!(SalesChannel::from_str("online").unwrap(), SalesChannel::Online);
        assert!(SalesChannel::from_str("fax").is_err());
    }

    #[test]
    fn test_promo_rejection_display() {
        assert_eq!(PromoRejection::NotFound.to_string(), "promo code not found");
        assert_eq!(
            PromoRejection::UsageLimitExceeded.to_string(),
            "promo code usage limit exceeded"
        );
    }

    #[test]
    fn test_serialization() {
        let kind = RuleKind::CategoryDiscount;
        let json = serde_json::to_string(&kind).unwrap();
        assert_eq!(json, "\"category_discount\"");

        let strategy = ConflictStrategy::BestForCustomer;
        let json = serde_json::to_string(&strategy).unwrap();
        assert_eq!(json, "\"best_for_customer\"");

        let channel = SalesChannel::Takeaway;
        let json = serde_json::to_string(&channel).unwrap();
        assert_eq!(json, "\"takeaway\"");
    }

    #[test]
    fn test_deserialization() {
        let kind: RuleKind = serde_json::from_str("\"happy_hour\"").unwrap();
        assert_eq!(kind, RuleKind::HappyHour);

        let strategy: ConflictStrategy = serde_json::from_str("\"manual\"").unwrap();
        assert_eq!(strategy, ConflictStrategy::Manual);

        let rejection: PromoRejection = serde_json::from_str("\"usage_limit_exceeded\"").unwrap();
        assert_eq!(rejection, PromoRejection::UsageLimitExceeded);
    }
}
