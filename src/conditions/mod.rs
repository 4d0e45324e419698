// Condition Evaluator
//
// Evaluates a rule's recursive condition tree (leaf predicates combined
// with and/or nodes) against an order snapshot. Predicates fail closed:
// unknown fields, type mismatches, and malformed comparison values all
// evaluate false with a reason, never an error.

use crate::catalog::TimeRange;
use crate::error::{PricingError, PricingResult};
use crate::order::OrderContext;
use crate::types::SalesChannel;
use chrono::{NaiveDate, NaiveTime, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum condition tree nesting before evaluation aborts
///
/// An owned tree cannot cycle, but trees this deep indicate the same
/// upstream data-integrity bug and fail the whole evaluation fast.
pub const MAX_CONDITION_DEPTH: usize = 32;

/// Comparison operator for leaf predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operator {
    Eq,
    In,
    Gte,
    Lte,
    Gt,
    Lt,
    Between,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Eq => write!(f, "="),
            Operator::In => write!(f, "in"),
            Operator::Gte => write!(f, ">="),
            Operator::Lte => write!(f, "<="),
            Operator::Gt => write!(f, ">"),
            Operator::Lt => write!(f, "<"),
            Operator::Between => write!(f, "between"),
        }
    }
}

/// A rule's applicability condition
///
/// Either a leaf predicate over a named order field or an and/or
/// combinator over child conditions. An absent tree means "always true".
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Condition {
    /// Every child must pass
    All { conditions: Vec<Condition> },

    /// At least one child must pass
    Any { conditions: Vec<Condition> },

    /// Leaf predicate: field, operator, comparison value
    Predicate {
        field: String,
        op: Operator,
        value: serde_json::Value,
    },
}

/// How combinators treat children once the verdict is known
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalMode {
    /// Stop evaluating children once the combinator's verdict is fixed
    ShortCircuit,

    /// Evaluate every child unconditionally so the trace is complete
    Exhaustive,
}

/// Result of evaluating one condition node, with child outcomes nested
/// for explainability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionOutcome {
    pub passed: bool,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ConditionOutcome>,
}

impl ConditionOutcome {
    fn leaf(passed: bool, reason: String) -> Self {
        Self {
            passed,
            reason,
            children: Vec::new(),
        }
    }
}

/// The closed set of order fields a predicate may reference
///
/// Field names outside this schema fail the predicate closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConditionField {
    Subtotal,
    TotalQuantity,
    DayOfWeek,
    TimeOfDay,
    Date,
    MenuItemId,
    Category,
    Channel,
    CustomerSegment,
    CustomerOrderCount,
    LoyaltyTier,
}

impl FromStr for ConditionField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "subtotal" | "min_order_value" => Ok(ConditionField::Subtotal),
            "total_quantity" => Ok(ConditionField::TotalQuantity),
            "day_of_week" => Ok(ConditionField::DayOfWeek),
            "time_of_day" => Ok(ConditionField::TimeOfDay),
            "date" => Ok(ConditionField::Date),
            "menu_item_id" => Ok(ConditionField::MenuItemId),
            "category" => Ok(ConditionField::Category),
            "channel" => Ok(ConditionField::Channel),
            "customer_segment" => Ok(ConditionField::CustomerSegment),
            "customer_order_count" => Ok(ConditionField::CustomerOrderCount),
            "loyalty_tier" => Ok(ConditionField::LoyaltyTier),
            _ => Err(format!("Unknown condition field: {}", s)),
        }
    }
}

/// Evaluate a condition tree against an order snapshot
pub fn evaluate(
    condition: &Condition,
    order: &OrderContext,
    mode: EvalMode,
) -> PricingResult<ConditionOutcome> {
    evaluate_at_depth(condition, order, mode, 0)
}

fn evaluate_at_depth(
    condition: &Condition,
    order: &OrderContext,
    mode: EvalMode,
    depth: usize,
) -> PricingResult<ConditionOutcome> {
    if depth >= MAX_CONDITION_DEPTH {
        return Err(PricingError::ConditionTreeTooDeep {
            max_depth: MAX_CONDITION_DEPTH,
        });
    }

    match condition {
        Condition::All { conditions } => {
            let mut children = Vec::with_capacity(conditions.len());
            let mut passed = true;
            for child in conditions {
                if !passed && mode == EvalMode::ShortCircuit {
                    break;
                }
                let outcome = evaluate_at_depth(child, order, mode, depth + 1)?;
                passed = passed && outcome.passed;
                children.push(outcome);
            }
            let reason = if passed {
                "all conditions met".to_string()
            } else {
                children
                    .iter()
                    .find(|c| !c.passed)
                    .map(|c| c.reason.clone())
                    .unwrap_or_else(|| "condition failed".to_string())
            };
            Ok(ConditionOutcome {
                passed,
                reason,
                children,
            })
        }
        Condition::Any { conditions } => {
            let mut children = Vec::with_capacity(conditions.len());
            let mut passed = false;
            for child in conditions {
                if passed && mode == EvalMode::ShortCircuit {
                    break;
                }
                let outcome = evaluate_at_depth(child, order, mode, depth + 1)?;
                passed = passed || outcome.passed;
                children.push(outcome);
            }
            let reason = if passed {
                children
                    .iter()
                    .find(|c| c.passed)
                    .map(|c| c.reason.clone())
                    .unwrap_or_else(|| "condition met".to_string())
            } else {
                "no condition met".to_string()
            };
            Ok(ConditionOutcome {
                passed,
                reason,
                children,
            })
        }
        Condition::Predicate { field, op, value } => {
            Ok(evaluate_predicate(field, *op, value, order))
        }
    }
}

fn evaluate_predicate(
    field_raw: &str,
    op: Operator,
    value: &serde_json::Value,
    order: &OrderContext,
) -> ConditionOutcome {
    let field = match ConditionField::from_str(field_raw) {
        Ok(field) => field,
        Err(_) => {
            return ConditionOutcome::leaf(false, format!("unknown field \"{}\"", field_raw));
        }
    };

    match field {
        ConditionField::Subtotal => compare_numeric("subtotal", order.subtotal(), op, value),
        ConditionField::TotalQuantity => compare_numeric(
            "total_quantity",
            Decimal::from(order.total_quantity()),
            op,
            value,
        ),
        ConditionField::CustomerOrderCount => compare_numeric(
            "customer_order_count",
            Decimal::from(order.customer.order_count),
            op,
            value,
        ),
        ConditionField::DayOfWeek => day_of_week_predicate(order.weekday(), op, value),
        ConditionField::TimeOfDay => time_of_day_predicate(order.local_time(), op, value),
        ConditionField::Date => date_predicate(order.local_date(), op, value),
        ConditionField::MenuItemId => menu_item_predicate(order, op, value),
        ConditionField::Category => category_predicate(order, op, value),
        ConditionField::Channel => channel_predicate(order.channel, op, value),
        ConditionField::CustomerSegment => segment_predicate(order, op, value),
        ConditionField::LoyaltyTier => loyalty_tier_predicate(order, op, value),
    }
}

fn compare_numeric(
    name: &str,
    actual: Decimal,
    op: Operator,
    value: &serde_json::Value,
) -> ConditionOutcome {
    let expected = match decimal_from_json(value) {
        Some(expected) => expected,
        None => {
            return ConditionOutcome::leaf(
                false,
                format!("{}: expected a numeric comparison value", name),
            );
        }
    };
    let passed = match op {
        Operator::Eq => actual == expected,
        Operator::Gte => actual >= expected,
        Operator::Lte => actual <= expected,
        Operator::Gt => actual > expected,
        Operator::Lt => actual < expected,
        Operator::In | Operator::Between => return unsupported(name, op),
    };
    ConditionOutcome::leaf(
        passed,
        format!("{} {} {} (actual {})", name, op, expected, actual),
    )
}

fn day_of_week_predicate(actual: Weekday, op: Operator, value: &serde_json::Value) -> ConditionOutcome {
    if !matches!(op, Operator::Eq | Operator::In) {
        return unsupported("day_of_week", op);
    }
    let names = strings_from_json(value);
    if names.is_empty() {
        return ConditionOutcome::leaf(false, "day_of_week: expected day name(s)".to_string());
    }
    let mut expected = Vec::with_capacity(names.len());
    for name in &names {
        match Weekday::from_str(name) {
            Ok(day) => expected.push(day),
            Err(_) => {
                return ConditionOutcome::leaf(
                    false,
                    format!("day_of_week: unknown day \"{}\"", name),
                );
            }
        }
    }
    let passed = expected.contains(&actual);
    ConditionOutcome::leaf(
        passed,
        format!("day_of_week {} {:?} (order placed {})", op, names, actual),
    )
}

fn time_of_day_predicate(actual: NaiveTime, op: Operator, value: &serde_json::Value) -> ConditionOutcome {
    if op != Operator::Between {
        return unsupported("time_of_day", op);
    }
    let range: TimeRange = match serde_json::from_value(value.clone()) {
        Ok(range) => range,
        Err(_) => {
            return ConditionOutcome::leaf(
                false,
                "time_of_day: expected a {start, end} window".to_string(),
            );
        }
    };
    match range.contains(actual) {
        Some(passed) => ConditionOutcome::leaf(
            passed,
            format!(
                "time_of_day between {}-{} (local time {})",
                range.start,
                range.end,
                actual.format("%H:%M")
            ),
        ),
        None => ConditionOutcome::leaf(
            false,
            format!(
                "time_of_day: malformed window '{}'-'{}'",
                range.start, range.end
            ),
        ),
    }
}

#[derive(Debug, Deserialize)]
struct DateRange {
    start: String, // Format: "YYYY-MM-DD"
    end: String,   // Format: "YYYY-MM-DD"
}

fn date_predicate(actual: NaiveDate, op: Operator, value: &serde_json::Value) -> ConditionOutcome {
    if op != Operator::Between {
        return unsupported("date", op);
    }
    let range: DateRange = match serde_json::from_value(value.clone()) {
        Ok(range) => range,
        Err(_) => {
            return ConditionOutcome::leaf(
                false,
                "date: expected a {start, end} interval".to_string(),
            );
        }
    };
    let bounds = (
        NaiveDate::parse_from_str(&range.start, "%Y-%m-%d"),
        NaiveDate::parse_from_str(&range.end, "%Y-%m-%d"),
    );
    match bounds {
        (Ok(start), Ok(end)) => {
            let passed = actual >= start && actual <= end;
            ConditionOutcome::leaf(
                passed,
                format!(
                    "date between {}-{} (order date {})",
                    range.start, range.end, actual
                ),
            )
        }
        _ => ConditionOutcome::leaf(
            false,
            format!("date: malformed interval '{}'-'{}'", range.start, range.end),
        ),
    }
}

fn menu_item_predicate(order: &OrderContext, op: Operator, value: &serde_json::Value) -> ConditionOutcome {
    if !matches!(op, Operator::Eq | Operator::In) {
        return unsupported("menu_item_id", op);
    }
    let expected = ids_from_json(value);
    if expected.is_empty() {
        return ConditionOutcome::leaf(false, "menu_item_id: expected item id(s)".to_string());
    }
    let passed = order
        .items
        .iter()
        .any(|item| expected.contains(&item.item_id));
    ConditionOutcome::leaf(
        passed,
        format!("menu_item_id {} {:?} (order contains match: {})", op, expected, passed),
    )
}

fn category_predicate(order: &OrderContext, op: Operator, value: &serde_json::Value) -> ConditionOutcome {
    if !matches!(op, Operator::Eq | Operator::In) {
        return unsupported("category", op);
    }
    let expected = strings_from_json(value);
    if expected.is_empty() {
        return ConditionOutcome::leaf(false, "category: expected category name(s)".to_string());
    }
    let passed = order.items.iter().any(|item| {
        expected
            .iter()
            .any(|category| category.eq_ignore_ascii_case(&item.category))
    });
    ConditionOutcome::leaf(
        passed,
        format!("category {} {:?} (order contains match: {})", op, expected, passed),
    )
}

fn channel_predicate(actual: SalesChannel, op: Operator, value: &serde_json::Value) -> ConditionOutcome {
    if !matches!(op, Operator::Eq | Operator::In) {
        return unsupported("channel", op);
    }
    let names = strings_from_json(value);
    if names.is_empty() {
        return ConditionOutcome::leaf(false, "channel: expected channel name(s)".to_string());
    }
    let mut expected = Vec::with_capacity(names.len());
    for name in &names {
        match SalesChannel::from_str(name) {
            Ok(channel) => expected.push(channel),
            Err(_) => {
                return ConditionOutcome::leaf(
                    false,
                    format!("channel: unknown channel \"{}\"", name),
                );
            }
        }
    }
    let passed = expected.contains(&actual);
    ConditionOutcome::leaf(
        passed,
        format!("channel {} {:?} (order channel {})", op, names, actual),
    )
}

fn segment_predicate(order: &OrderContext, op: Operator, value: &serde_json::Value) -> ConditionOutcome {
    if !matches!(op, Operator::Eq | Operator::In) {
        return unsupported("customer_segment", op);
    }
    let expected = strings_from_json(value);
    if expected.is_empty() {
        return ConditionOutcome::leaf(
            false,
            "customer_segment: expected segment name(s)".to_string(),
        );
    }
    let passed = order.customer.segments.iter().any(|segment| {
        expected
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(segment))
    });
    ConditionOutcome::leaf(
        passed,
        format!("customer_segment {} {:?} (customer match: {})", op, expected, passed),
    )
}

fn loyalty_tier_predicate(order: &OrderContext, op: Operator, value: &serde_json::Value) -> ConditionOutcome {
    if !matches!(op, Operator::Eq | Operator::In) {
        return unsupported("loyalty_tier", op);
    }
    let expected = strings_from_json(value);
    if expected.is_empty() {
        return ConditionOutcome::leaf(false, "loyalty_tier: expected tier name(s)".to_string());
    }
    match &order.customer.loyalty_tier {
        Some(tier) => {
            let passed = expected
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(tier));
            ConditionOutcome::leaf(
                passed,
                format!("loyalty_tier {} {:?} (customer tier {})", op, expected, tier),
            )
        }
        None => ConditionOutcome::leaf(false, "customer has no loyalty tier".to_string()),
    }
}

fn unsupported(name: &str, op: Operator) -> ConditionOutcome {
    ConditionOutcome::leaf(false, format!("{}: operator {} not supported", name, op))
}

fn decimal_from_json(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string()).ok(),
        serde_json::Value::String(s) => Decimal::from_str(s).ok(),
        _ => None,
    }
}

fn strings_from_json(value: &serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::String(s) => vec![s.clone()],
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn ids_from_json(value: &serde_json::Value) -> Vec<i32> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().map(|id| id as i32).into_iter().collect(),
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_i64().map(|id| id as i32))
            .collect(),
        _ => Vec::new(),
    }
}
