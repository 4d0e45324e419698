// Discount Calculator
//
// Turns a matched rule plus an order snapshot into a concrete monetary
// discount. One exhaustive match over the rule kind, each arm decoding its
// typed config payload. All arithmetic is fixed-point decimal; the result
// is rounded half-up to currency precision once, at the end, and is never
// negative or larger than the portion of the order it is scoped to.

use crate::catalog::{
    BogoConfig, BundleConfig, CategoryConfig, FixedConfig, FlashSaleConfig, HappyHourConfig,
    ItemPriceOverrideConfig, LoyaltyConfig, PercentageConfig, PricingRule, TieredConfig,
};
use crate::error::{PricingError, PricingResult};
use crate::order::{LineItem, OrderContext};
use crate::types::RuleKind;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;

/// Round a discount amount to currency minor-unit precision, half-up
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn percentage_of(amount: Decimal, percentage: Decimal) -> Decimal {
    amount * percentage / Decimal::ONE_HUNDRED
}

/// Compute the discount a matched rule yields for this order
pub fn calculate(rule: &PricingRule, order: &OrderContext) -> PricingResult<Decimal> {
    let subtotal = order.subtotal();

    let raw = match rule.kind {
        RuleKind::PercentageDiscount => {
            let config: PercentageConfig = rule.decode_config()?;
            percentage_of(subtotal, config.percentage)
        }
        RuleKind::FixedDiscount => {
            let config: FixedConfig = rule.decode_config()?;
            config.amount.min(subtotal)
        }
        RuleKind::Bogo => bogo_discount(rule, order)?,
        RuleKind::Bundle => bundle_discount(rule, order)?,
        RuleKind::Tiered => tiered_discount(rule, subtotal)?,
        RuleKind::ItemPriceOverride => override_discount(rule, order)?,
        RuleKind::CategoryDiscount => {
            let config: CategoryConfig = rule.decode_config()?;
            let scope = scope_total(order, |item| {
                config
                    .categories
                    .iter()
                    .any(|category| category.eq_ignore_ascii_case(&item.category))
            });
            percentage_of(scope, config.percentage)
        }
        RuleKind::HappyHour => happy_hour_discount(rule, order)?,
        RuleKind::FlashSale => {
            let config: FlashSaleConfig = rule.decode_config()?;
            let scope = scope_total(order, |item| config.item_ids.contains(&item.item_id));
            percentage_of(scope, config.percentage)
        }
        RuleKind::Loyalty => loyalty_discount(rule, order)?,
    };

    Ok(round_currency(raw.max(Decimal::ZERO)).min(subtotal.max(Decimal::ZERO)))
}

fn scope_total<F>(order: &OrderContext, in_scope: F) -> Decimal
where
    F: Fn(&LineItem) -> bool,
{
    order
        .items
        .iter()
        .filter(|item| in_scope(item))
        .map(LineItem::line_total)
        .sum()
}

/// Buy N get M: complete groups of `buy + get` matching units each earn
/// `get` units at `get_percentage` off. The cheapest matching units are
/// the discounted ones.
fn bogo_discount(rule: &PricingRule, order: &OrderContext) -> PricingResult<Decimal> {
    let config: BogoConfig = rule.decode_config()?;
    if config.buy_quantity == 0 || config.get_quantity == 0 {
        return Err(PricingError::InvalidRuleConfig {
            rule_id: rule.id,
            reason: "buy_quantity and get_quantity must be greater than 0".to_string(),
        });
    }

    let mut unit_prices: Vec<Decimal> = Vec::new();
    for item in &order.items {
        let scoped = (config.item_ids.is_empty() && config.categories.is_empty())
            || config.item_ids.contains(&item.item_id)
            || config
                .categories
                .iter()
                .any(|category| category.eq_ignore_ascii_case(&item.category));
        if scoped {
            for _ in 0..item.quantity {
                unit_prices.push(item.unit_price);
            }
        }
    }

    let group_size = (config.buy_quantity + config.get_quantity) as usize;
    let complete_groups = unit_prices.len() / group_size;
    let discounted_units = complete_groups * config.get_quantity as usize;
    if discounted_units == 0 {
        return Ok(Decimal::ZERO);
    }

    unit_prices.sort();
    let discount = unit_prices
        .iter()
        .take(discounted_units)
        .map(|price| percentage_of(*price, config.get_percentage))
        .sum();
    Ok(discount)
}

/// Bundle: each complete set of components is discounted down to the
/// bundle price. Greedy: as many whole bundles as quantities allow.
fn bundle_discount(rule: &PricingRule, order: &OrderContext) -> PricingResult<Decimal> {
    let config: BundleConfig = rule.decode_config()?;
    if config.component_item_ids.is_empty() {
        return Err(PricingError::InvalidRuleConfig {
            rule_id: rule.id,
            reason: "bundle must list at least one component item".to_string(),
        });
    }

    let mut available: HashMap<i32, u32> = HashMap::new();
    let mut unit_price: HashMap<i32, Decimal> = HashMap::new();
    for item in &order.items {
        *available.entry(item.item_id).or_insert(0) += item.quantity;
        unit_price.entry(item.item_id).or_insert(item.unit_price);
    }

    // A component listed twice needs two units per bundle
    let mut needed: HashMap<i32, u32> = HashMap::new();
    for component in &config.component_item_ids {
        *needed.entry(*component).or_insert(0) += 1;
    }

    let mut complete_bundles = u32::MAX;
    for (component, count) in &needed {
        let have = available.get(component).copied().unwrap_or(0);
        complete_bundles = complete_bundles.min(have / count);
    }
    if complete_bundles == 0 || complete_bundles == u32::MAX {
        return Ok(Decimal::ZERO);
    }

    let component_sum: Decimal = config
        .component_item_ids
        .iter()
        .map(|component| unit_price.get(component).copied().unwrap_or(Decimal::ZERO))
        .sum();
    let per_bundle = (component_sum - config.bundle_price).max(Decimal::ZERO);
    Ok(per_bundle * Decimal::from(complete_bundles))
}

/// Tiered: the highest tier whose threshold the subtotal meets applies
fn tiered_discount(rule: &PricingRule, subtotal: Decimal) -> PricingResult<Decimal> {
    let config: TieredConfig = rule.decode_config()?;

    let mut selected: Option<&crate::catalog::DiscountTier> = None;
    for tier in &config.tiers {
        if subtotal >= tier.min_value {
            let better = match selected {
                Some(current) => tier.min_value > current.min_value,
                None => true,
            };
            if better {
                selected = Some(tier);
            }
        }
    }

    match selected {
        Some(tier) => Ok(percentage_of(subtotal, tier.percentage)),
        None => Ok(Decimal::ZERO),
    }
}

/// Item price override: each listed line is discounted down to the
/// override price, floored at zero per unit
fn override_discount(rule: &PricingRule, order: &OrderContext) -> PricingResult<Decimal> {
    let config: ItemPriceOverrideConfig = rule.decode_config()?;

    let mut discount = Decimal::ZERO;
    for item in &order.items {
        let entry = config
            .overrides
            .iter()
            .find(|entry| entry.item_id == item.item_id);
        if let Some(entry) = entry {
            let per_unit = (item.unit_price - entry.override_price).max(Decimal::ZERO);
            discount += per_unit * Decimal::from(item.quantity);
        }
    }
    Ok(discount)
}

/// Happy hour: percentage off the scoped items, but only while the order's
/// local time falls inside the configured window
fn happy_hour_discount(rule: &PricingRule, order: &OrderContext) -> PricingResult<Decimal> {
    let config: HappyHourConfig = rule.decode_config()?;

    let in_window = match config.window.contains(order.local_time()) {
        Some(in_window) => in_window,
        None => {
            return Err(PricingError::InvalidRuleConfig {
                rule_id: rule.id,
                reason: format!(
                    "invalid time window '{}'-'{}': expected HH:MM",
                    config.window.start, config.window.end
                ),
            });
        }
    };
    if !in_window {
        return Ok(Decimal::ZERO);
    }

    let scope = scope_total(order, |item| {
        config.item_ids.is_empty() || config.item_ids.contains(&item.item_id)
    });
    Ok(percentage_of(scope, config.percentage))
}

/// Loyalty: the rate keyed by the customer's tier, over the full subtotal
fn loyalty_discount(rule: &PricingRule, order: &OrderContext) -> PricingResult<Decimal> {
    let config: LoyaltyConfig = rule.decode_config()?;

    let tier = match &order.customer.loyalty_tier {
        Some(tier) => tier,
        None => return Ok(Decimal::ZERO),
    };
    let rate = config
        .tier_percentages
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(tier))
        .map(|(_, rate)| *rate);

    match rate {
        Some(rate) => Ok(percentage_of(order.subtotal(), rate)),
        None => Ok(Decimal::ZERO),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::CustomerProfile;
    use crate::types::SalesChannel;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use serde_json::json;
    use uuid::Uuid;

    fn rule(kind: RuleKind, config: serde_json::Value) -> PricingRule {
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

    fn order_with(items: Vec<LineItem>) -> OrderContext {
        OrderContext {
            items,
            customer: CustomerProfile {
                id: 1,
                segments: vec![],
                order_count: 3,
                loyalty_tier: Some("gold".to_string()),
                promo_usage: Default::default(),
            },
            placed_at: Utc.with_ymd_and_hms(2026, 3, 7, 17, 0, 0).unwrap(),
            utc_offset_minutes: 0,
            channel: SalesChannel::DineIn,
            promo_code: None,
        }
    }

    fn item(item_id: i32, category: &str, unit_price: Decimal, quantity: u32) -> LineItem {
        LineItem {
            item_id,
            category: category.to_string(),
            unit_price,
            quantity,
        }
    }

    #[test]
    fn test_percentage_discount() {
        let order = order_with(vec![item(1, "coffee", dec!(50.00), 1)]);
        let rule = rule(RuleKind::PercentageDiscount, json!({ "percentage": 10 }));
        assert_eq!(calculate(&rule, &order).unwrap(), dec!(5.00));
    }

    #[test]
    fn test_percentage_discount_rounds_half_up() {
        // 10% of 12.25 = 1.225, rounds to 1.23
        let order = order_with(vec![item(1, "coffee", dec!(12.25), 1)]);
        let rule = rule(RuleKind::PercentageDiscount, json!({ "percentage": 10 }));
        assert_eq!(calculate(&rule, &order).unwrap(), dec!(1.23));
    }

    #[test]
    fn test_fixed_discount_capped_at_subtotal() {
        let order = order_with(vec![item(1, "coffee", dec!(8.00), 1)]);
        let rule = rule(RuleKind::FixedDiscount, json!({ "amount": 20.00 }));
        assert_eq!(calculate(&rule, &order).unwrap(), dec!(8.00));
    }

    #[test]
    fn test_bogo_buy_two_get_one_free() {
        // 3 matching units at $4: one complete group, one unit free
        let order = order_with(vec![item(1, "coffee", dec!(4.00), 3)]);
        let rule = rule(
            RuleKind::Bogo,
            json!({ "buy_quantity": 2, "get_quantity": 1, "get_percentage": 100 }),
        );
        assert_eq!(calculate(&rule, &order).unwrap(), dec!(4.00));
    }

    #[test]
    fn test_bogo_incomplete_group_earns_nothing() {
        let order = order_with(vec![item(1, "coffee", dec!(4.00), 2)]);
        let rule = rule(
            RuleKind::Bogo,
            json!({ "buy_quantity": 2, "get_quantity": 1, "get_percentage": 100 }),
        );
        assert_eq!(calculate(&rule, &order).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_bogo_discounts_cheapest_units() {
        // 6 units across two prices: two groups, two free units at the
        // cheapest price
        let order = order_with(vec![
            item(1, "coffee", dec!(3.00), 3),
            item(2, "coffee", dec!(5.00), 3),
        ]);
        let rule = rule(
            RuleKind::Bogo,
            json!({ "buy_quantity": 2, "get_quantity": 1, "get_percentage": 100, "categories": ["coffee"] }),
        );
        assert_eq!(calculate(&rule, &order).unwrap(), dec!(6.00));
    }

    #[test]
    fn test_bogo_scope_excludes_other_items() {
        let order = order_with(vec![
            item(1, "coffee", dec!(4.00), 3),
            item(9, "pastry", dec!(2.00), 3),
        ]);
        let rule = rule(
            RuleKind::Bogo,
            json!({ "buy_quantity": 2, "get_quantity": 1, "get_percentage": 100, "item_ids": [1] }),
        );
        // Only the 3 coffees count: one free coffee
        assert_eq!(calculate(&rule, &order).unwrap(), dec!(4.00));
    }

    #[test]
    fn test_bundle_discount() {
        // Components 1 + 2 cost 6.50 together, bundled at 5.00
        let order = order_with(vec![
            item(1, "coffee", dec!(4.00), 2),
            item(2, "pastry", dec!(2.50), 1),
        ]);
        let rule = rule(
            RuleKind::Bundle,
            json!({ "component_item_ids": [1, 2], "bundle_price": 5.00 }),
        );
        // Only one complete bundle (a single pastry)
        assert_eq!(calculate(&rule, &order).unwrap(), dec!(1.50));
    }

    #[test]
    fn test_bundle_multiple_and_missing_components() {
        let rule = rule(
            RuleKind::Bundle,
            json!({ "component_item_ids": [1, 2], "bundle_price": 5.00 }),
        );

        // Two complete bundles
        let order = order_with(vec![
            item(1, "coffee", dec!(4.00), 2),
            item(2, "pastry", dec!(2.50), 3),
        ]);
        assert_eq!(calculate(&rule, &order).unwrap(), dec!(3.00));

        // Component 2 missing entirely
        let order = order_with(vec![item(1, "coffee", dec!(4.00), 2)]);
        assert_eq!(calculate(&rule, &order).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_bundle_price_above_component_sum_floors_at_zero() {
        let order = order_with(vec![
            item(1, "coffee", dec!(2.00), 1),
            item(2, "pastry", dec!(1.00), 1),
        ]);
        let rule = rule(
            RuleKind::Bundle,
            json!({ "component_item_ids": [1, 2], "bundle_price": 10.00 }),
        );
        assert_eq!(calculate(&rule, &order).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_tiered_selects_highest_qualifying_tier() {
        let rule = rule(
            RuleKind::Tiered,
            json!({ "tiers": [
                { "min_value": 20, "percentage": 5 },
                { "min_value": 50, "percentage": 10 },
                { "min_value": 100, "percentage": 15 }
            ]}),
        );

        let order = order_with(vec![item(1, "coffee", dec!(60.00), 1)]);
        assert_eq!(calculate(&rule, &order).unwrap(), dec!(6.00));

        let order = order_with(vec![item(1, "coffee", dec!(10.00), 1)]);
        assert_eq!(calculate(&rule, &order).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_item_price_override() {
        let order = order_with(vec![
            item(1, "coffee", dec!(5.00), 2),
            item(2, "pastry", dec!(3.00), 1),
        ]);
        let rule = rule(
            RuleKind::ItemPriceOverride,
            json!({ "overrides": [{ "item_id": 1, "override_price": 3.50 }] }),
        );
        // (5.00 - 3.50) * 2
        assert_eq!(calculate(&rule, &order).unwrap(), dec!(3.00));
    }

    #[test]
    fn test_item_price_override_above_price_floors_at_zero() {
        let order = order_with(vec![item(1, "coffee", dec!(5.00), 2)]);
        let rule = rule(
            RuleKind::ItemPriceOverride,
            json!({ "overrides": [{ "item_id": 1, "override_price": 9.00 }] }),
        );
        assert_eq!(calculate(&rule, &order).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_category_discount_scoped_to_category() {
        let order = order_with(vec![
            item(1, "coffee", dec!(10.00), 2),
            item(2, "pastry", dec!(5.00), 2),
        ]);
        let rule = rule(
            RuleKind::CategoryDiscount,
            json!({ "categories": ["pastry"], "percentage": 50 }),
        );
        // 50% of the 10.00 pastry portion
        assert_eq!(calculate(&rule, &order).unwrap(), dec!(5.00));
    }

    #[test]
    fn test_happy_hour_inside_and_outside_window() {
        let rule = rule(
            RuleKind::HappyHour,
            json!({ "window": { "start": "16:00", "end": "18:00" }, "percentage": 20 }),
        );

        // order placed 17:00 local
        let order = order_with(vec![item(1, "coffee", dec!(10.00), 1)]);
        assert_eq!(calculate(&rule, &order).unwrap(), dec!(2.00));

        let mut late = order_with(vec![item(1, "coffee", dec!(10.00), 1)]);
        late.placed_at = Utc.with_ymd_and_hms(2026, 3, 7, 20, 0, 0).unwrap();
        assert_eq!(calculate(&rule, &late).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_flash_sale_scoped_to_listed_items() {
        let order = order_with(vec![
            item(1, "coffee", dec!(10.00), 1),
            item(2, "pastry", dec!(10.00), 1),
        ]);
        let rule = rule(
            RuleKind::FlashSale,
            json!({ "percentage": 30, "item_ids": [2] }),
        );
        assert_eq!(calculate(&rule, &order).unwrap(), dec!(3.00));
    }

    #[test]
    fn test_loyalty_rate_from_customer_tier() {
        let rule = rule(
            RuleKind::Loyalty,
            json!({ "tier_percentages": { "gold": 10, "silver": 5 } }),
        );

        let order = order_with(vec![item(1, "coffee", dec!(40.00), 1)]);
        assert_eq!(calculate(&rule, &order).unwrap(), dec!(4.00));

        let mut no_tier = order_with(vec![item(1, "coffee", dec!(40.00), 1)]);
        no_tier.customer.loyalty_tier = None;
        assert_eq!(calculate(&rule, &no_tier).unwrap(), Decimal::ZERO);

        let mut unknown_tier = order_with(vec![item(1, "coffee", dec!(40.00), 1)]);
        unknown_tier.customer.loyalty_tier = Some("platinum".to_string());
        assert_eq!(calculate(&rule, &unknown_tier).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_malformed_config_is_an_error_not_a_panic() {
        let order = order_with(vec![item(1, "coffee", dec!(10.00), 1)]);
        let rule = rule(RuleKind::PercentageDiscount, json!({ "wrong_field": 10 }));
        assert!(matches!(
            calculate(&rule, &order),
            Err(PricingError::InvalidRuleConfig { .. })
        ));
    }

    #[test]
    fn test_discount_never_exceeds_subtotal() {
        let order = order_with(vec![item(1, "coffee", dec!(10.00), 1)]);
        let rule = rule(RuleKind::PercentageDiscount, json!({ "percentage": 100 }));
        assert_eq!(calculate(&rule, &order).unwrap(), dec!(10.00));
    }
}
