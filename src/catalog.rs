// Rule and promo code definitions
//
// Plain-data inputs supplied by the caller for a single evaluation pass.
// The engine only ever reads them; authoring and persistence live outside.

use crate::conditions::Condition;
use crate::error::{PricingError, PricingResult};
use crate::types::{RuleKind, SalesChannel};
use chrono::{DateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Stack group name that forbids combination with any other rule
pub const EXCLUSIVE_STACK_GROUP: &str = "exclusive";

/// A configurable pricing rule
///
/// The kind-specific payload lives in `rule_config` and is decoded per kind
/// with `decode_config`. A decode or range failure is that rule's skip
/// reason, never an abort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingRule {
    pub id: Uuid,
    pub kind: RuleKind,
    pub description: Option<String>,
    pub rule_config: serde_json::Value,
    pub conditions: Option<Condition>,
    pub priority: i32,
    pub stack_group: Option<String>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl PricingRule {
    /// A rule is eligible at `t` only if active and inside its validity window
    pub fn is_eligible(&self, t: DateTime<Utc>) -> bool {
        if !self.is_active {
            return false;
        }
        if let Some(from) = self.valid_from {
            if t < from {
                return false;
            }
        }
        if let Some(until) = self.valid_until {
            if t > until {
                return false;
            }
        }
        true
    }

    /// Exclusive rules never combine with anything, regardless of group
    pub fn is_exclusive(&self) -> bool {
        match &self.stack_group {
            None => true,
            Some(group) => group == EXCLUSIVE_STACK_GROUP,
        }
    }

    /// Decode the kind-specific config payload
    pub fn decode_config<T: DeserializeOwned>(&self) -> PricingResult<T> {
        serde_json::from_value(self.rule_config.clone()).map_err(|e| {
            PricingError::InvalidRuleConfig {
                rule_id: self.id,
                reason: e.to_string(),
            }
        })
    }
}

/// Time range in "HH:MM" wall-clock format
///
/// Ranges where start > end wrap midnight (e.g. 22:00 - 02:00).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: String, // Format: "HH:MM"
    pub end: String,   // Format: "HH:MM"
}

impl TimeRange {
    /// Parse both bounds; `None` if either is not valid "HH:MM"
    pub fn window(&self) -> Option<(NaiveTime, NaiveTime)> {
        let start = NaiveTime::parse_from_str(&self.start, "%H:%M").ok()?;
        let end = NaiveTime::parse_from_str(&self.end, "%H:%M").ok()?;
        Some((start, end))
    }

    /// Whether `t` falls inside the range; `None` if the range is malformed
    pub fn contains(&self, t: NaiveTime) -> Option<bool> {
        let (start, end) = self.window()?;
        if start <= end {
            // Normal range (e.g., 09:00 - 17:00)
            Some(t >= start && t <= end)
        } else {
            // Overnight range (e.g., 22:00 - 02:00)
            Some(t >= start || t <= end)
        }
    }
}

/// Percentage-off-subtotal rule payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PercentageConfig {
    pub percentage: Decimal,
}

/// Fixed-amount-off rule payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedConfig {
    pub amount: Decimal,
}

/// Buy-N-get-M rule payload
///
/// `item_ids`/`categories` scope which units count; both empty means every
/// item in the order counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BogoConfig {
    pub buy_quantity: u32,
    pub get_quantity: u32,
    pub get_percentage: Decimal,
    #[serde(default)]
    pub item_ids: Vec<i32>,
    #[serde(default)]
    pub categories: Vec<String>,
}

/// Bundle rule payload: one of each component at a combined price
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleConfig {
    pub component_item_ids: Vec<i32>,
    pub bundle_price: Decimal,
}

/// One tier of a tiered discount
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscountTier {
    pub min_value: Decimal,
    pub percentage: Decimal,
}

/// Tiered rule payload: the highest tier whose threshold is met applies
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TieredConfig {
    pub tiers: Vec<DiscountTier>,
}

/// Price override for a single menu item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceOverride {
    pub item_id: i32,
    pub override_price: Decimal,
}

/// Item-price-override rule payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemPriceOverrideConfig {
    pub overrides: Vec<PriceOverride>,
}

/// Category discount rule payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub categories: Vec<String>,
    pub percentage: Decimal,
}

/// Happy hour rule payload
///
/// `item_ids` empty means the whole order is in scope during the window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HappyHourConfig {
    pub window: TimeRange,
    pub percentage: Decimal,
    #[serde(default)]
    pub item_ids: Vec<i32>,
}

/// Loyalty rule payload: discount rate per loyalty tier name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoyaltyConfig {
    pub tier_percentages: HashMap<String, Decimal>,
}

/// Flash sale rule payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlashSaleConfig {
    pub percentage: Decimal,
    pub item_ids: Vec<i32>,
}

/// Limits on how matched rules may combine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackingConfig {
    pub allow_stacking: bool,
    pub max_stack_count: usize,
    pub max_total_discount_percentage: Decimal,
}

impl Default for StackingConfig {
    fn default() -> Self {
        Self {
            allow_stacking: true,
            max_stack_count: 3,
            max_total_discount_percentage: Decimal::ONE_HUNDRED,
        }
    }
}

/// A promotional code linking to the rule it activates
///
/// `current_usage_count` and the per-customer counts are read inputs
/// persisted elsewhere; the engine never increments them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoCode {
    pub code: String,
    pub rule_id: Uuid,
    pub usage_limit: Option<u32>,
    pub usage_per_customer: Option<u32>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub minimum_order_value: Option<Decimal>,
    /// Empty means the code is valid on every channel
    #[serde(default)]
    pub allowed_channels: Vec<SalesChannel>,
    pub current_usage_count: u32,
}

impl PromoCode {
    /// Codes match case-insensitively
    pub fn matches(&self, submitted: &str) -> bool {
        self.code.eq_ignore_ascii_case(submitted.trim())
    }
}

/// Validate a rule's config payload against its kind
///
/// Decodes the payload and checks value ranges. A failure becomes the
/// rule's skip reason during evaluation.
pub fn validate_rule(rule: &PricingRule) -> PricingResult<()> {
    match rule.kind {
        RuleKind::PercentageDiscount => {
            let config: PercentageConfig = rule.decode_config()?;
            validate_percentage(rule.id, config.percentage)
        }
        RuleKind::FixedDiscount => {
            let config: FixedConfig = rule.decode_config()?;
            validate_non_negative(rule.id, "amount", config.amount)
        }
        RuleKind::Bogo => {
            let config: BogoConfig = rule.decode_config()?;
            if config.buy_quantity == 0 || config.get_quantity == 0 {
                return Err(invalid(rule.id, "buy_quantity and get_quantity must be greater than 0"));
            }
            validate_percentage(rule.id, config.get_percentage)
        }
        RuleKind::Bundle => {
            let config: BundleConfig = rule.decode_config()?;
            if config.component_item_ids.is_empty() {
                return Err(invalid(rule.id, "bundle must list at least one component item"));
            }
            validate_non_negative(rule.id, "bundle_price", config.bundle_price)
        }
        RuleKind::HappyHour => {
            let config: HappyHourConfig = rule.decode_config()?;
            if config.window.window().is_none() {
                return Err(invalid(
                    rule.id,
                    &format!(
                        "invalid time window '{}'-'{}': expected HH:MM",
                        config.window.start, config.window.end
                    ),
                ));
            }
            validate_percentage(rule.id, config.percentage)
        }
        RuleKind::Tiered => {
            let config: TieredConfig = rule.decode_config()?;
            if config.tiers.is_empty() {
                return Err(invalid(rule.id, "tiered rule must define at least one tier"));
            }
            for pair in config.tiers.windows(2) {
                if pair[1].min_value <= pair[0].min_value {
                    return Err(invalid(rule.id, "tier min_value thresholds must be strictly increasing"));
                }
            }
            for tier in &config.tiers {
                validate_non_negative(rule.id, "min_value", tier.min_value)?;
                validate_percentage(rule.id, tier.percentage)?;
            }
            Ok(())
        }
        RuleKind::ItemPriceOverride => {
            let config: ItemPriceOverrideConfig = rule.decode_config()?;
            if config.overrides.is_empty() {
                return Err(invalid(rule.id, "item_price_override must list at least one item"));
            }
            for entry in &config.overrides {
                validate_non_negative(rule.id, "override_price", entry.override_price)?;
            }
            Ok(())
        }
        RuleKind::CategoryDiscount => {
            let config: CategoryConfig = rule.decode_config()?;
            if config.categories.is_empty() {
                return Err(invalid(rule.id, "category_discount must list at least one category"));
            }
            validate_percentage(rule.id, config.percentage)
        }
        RuleKind::Loyalty => {
            let config: LoyaltyConfig = rule.decode_config()?;
            if config.tier_percentages.is_empty() {
                return Err(invalid(rule.id, "loyalty rule must define at least one tier rate"));
            }
            for percentage in config.tier_percentages.values() {
                validate_percentage(rule.id, *percentage)?;
            }
            Ok(())
        }
        RuleKind::FlashSale => {
            let config: FlashSaleConfig = rule.decode_config()?;
            if config.item_ids.is_empty() {
                return Err(invalid(rule.id, "flash_sale must list at least one item"));
            }
            validate_percentage(rule.id, config.percentage)
        }
    }
}

fn invalid(rule_id: Uuid, reason: &str) -> PricingError {
    PricingError::InvalidRuleConfig {
        rule_id,
        reason: reason.to_string(),
    }
}

fn validate_percentage(rule_id: Uuid, value: Decimal) -> PricingResult<()> {
    if value < Decimal::ZERO {
        return Err(invalid(rule_id, "percentage must be non-negative"));
    }
    if value > Decimal::ONE_HUNDRED {
        return Err(invalid(rule_id, "percentage cannot exceed 100"));
    }
    Ok(())
}

fn validate_non_negative(rule_id: Uuid, field: &str, value: Decimal) -> PricingResult<()> {
    if value < Decimal::ZERO {
        return Err(invalid(rule_id, &format!("{} must be non-negative", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn rule_with(kind: RuleKind, config: serde_json::Value) -> PricingRule {
        PricingRule {
            id: Uuid::new_v4(),
            kind,
            description: None,
            rule_config: config,
            conditions: None,
            priority: 0,
            stack_group: Some("default".to_string()),
            valid_from: None,
            valid_until: None,
            is_active: true,
        }
    }

    #[test]
    fn test_eligibility_window() {
        let mut rule = rule_with(RuleKind::PercentageDiscount, json!({ "percentage": 10 }));
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        assert!(rule.is_eligible(now));

        rule.is_active = false;
        assert!(!rule.is_eligible(now));

        rule.is_active = true;
        rule.valid_from = Some(Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap());
        assert!(!rule.is_eligible(now));

        rule.valid_from = Some(Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap());
        rule.valid_until = Some(Utc.with_ymd_and_hms(2026, 2, 28, 0, 0, 0).unwrap());
        assert!(!rule.is_eligible(now));
    }

    #[test]
    fn test_exclusive_stack_group() {
        let mut rule = rule_with(RuleKind::PercentageDiscount, json!({ "percentage": 10 }));
        assert!(!rule.is_exclusive());

        rule.stack_group = None;
        assert!(rule.is_exclusive());

        rule.stack_group = Some(EXCLUSIVE_STACK_GROUP.to_string());
        assert!(rule.is_exclusive());
    }

    #[test]
    fn test_time_range_contains() {
        let range = TimeRange {
            start: "09:00".to_string(),
            end: "17:00".to_string(),
        };
        let t = |s| NaiveTime::parse_from_str(s, "%H:%M").unwrap();

        assert_eq!(range.contains(t("12:00")), Some(true));
        assert_eq!(range.contains(t("08:59")), Some(false));
        assert_eq!(range.contains(t("17:00")), Some(true));
    }

    #[test]
    fn test_time_range_overnight() {
        let range = TimeRange {
            start: "22:00".to_string(),
            end: "02:00".to_string(),
        };
        let t = |s| NaiveTime::parse_from_str(s, "%H:%M").unwrap();

        assert_eq!(range.contains(t("23:30")), Some(true));
        assert_eq!(range.contains(t("01:00")), Some(true));
        assert_eq!(range.contains(t("12:00")), Some(false));
    }

    #[test]
    fn test_time_range_malformed() {
        let range = TimeRange {
            start: "25:00".to_string(),
            end: "17:00".to_string(),
        };
        assert_eq!(range.contains(NaiveTime::MIN), None);
    }

    #[test]
    fn test_validate_percentage_rule() {
        let rule = rule_with(RuleKind::PercentageDiscount, json!({ "percentage": 10 }));
        assert!(validate_rule(&rule).is_ok());

        let rule = rule_with(RuleKind::PercentageDiscount, json!({ "percentage": 150 }));
        assert!(validate_rule(&rule).is_err());

        let rule = rule_with(RuleKind::PercentageDiscount, json!({}));
        assert!(validate_rule(&rule).is_err());
    }

    #[test]
    fn test_validate_bogo_rule() {
        let rule = rule_with(
            RuleKind::Bogo,
            json!({ "buy_quantity": 2, "get_quantity": 1, "get_percentage": 100 }),
        );
        assert!(validate_rule(&rule).is_ok());

        let rule = rule_with(
            RuleKind::Bogo,
            json!({ "buy_quantity": 0, "get_quantity": 1, "get_percentage": 100 }),
        );
        assert!(validate_rule(&rule).is_err());
    }

    #[test]
    fn test_validate_tiered_rule() {
        let rule = rule_with(
            RuleKind::Tiered,
            json!({ "tiers": [
                { "min_value": 20, "percentage": 5 },
                { "min_value": 50, "percentage": 10 }
            ]}),
        );
        assert!(validate_rule(&rule).is_ok());

        // Thresholds out of order
        let rule = rule_with(
            RuleKind::Tiered,
            json!({ "tiers": [
                { "min_value": 50, "percentage": 10 },
                { "min_value": 20, "percentage": 5 }
            ]}),
        );
        assert!(validate_rule(&rule).is_err());

        let rule = rule_with(RuleKind::Tiered, json!({ "tiers": [] }));
        assert!(validate_rule(&rule).is_err());
    }

    #[test]
    fn test_validate_happy_hour_window() {
        let rule = rule_with(
            RuleKind::HappyHour,
            json!({ "window": { "start": "16:00", "end": "18:00" }, "percentage": 20 }),
        );
        assert!(validate_rule(&rule).is_ok());

        let rule = rule_with(
            RuleKind::HappyHour,
            json!({ "window": { "start": "4pm", "end": "18:00" }, "percentage": 20 }),
        );
        assert!(validate_rule(&rule).is_err());
    }

    #[test]
    fn test_promo_code_case_insensitive_match() {
        let code = PromoCode {
            code: "SAVE10".to_string(),
            rule_id: Uuid::new_v4(),
            usage_limit: None,
            usage_per_customer: None,
            valid_from: None,
            valid_until: None,
            minimum_order_value: None,
            allowed_channels: vec![],
            current_usage_count: 0,
        };

        assert!(code.matches("save10"));
        assert!(code.matches(" Save10 "));
        assert!(!code.matches("save15"));
    }

    #[test]
    fn test_stacking_config_default() {
        let config = StackingConfig::default();
        assert!(config.allow_stacking);
        assert_eq!(config.max_stack_count, 3);
        assert_eq!(config.max_total_discount_percentage, Decimal::ONE_HUNDRED);
    }
}
