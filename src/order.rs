// Order snapshot types
//
// An immutable view of the order and customer at evaluation time. The
// engine never mutates it; every evaluation is a pure read over this data.

use crate::types::SalesChannel;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single order line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    pub item_id: i32,
    pub category: String,
    pub unit_price: Decimal,
    pub quantity: u32,
}

impl LineItem {
    /// Line total: unit price times quantity
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// Customer attributes at evaluation time
///
/// `promo_usage` carries this customer's redemption counts per promo code
/// (uppercase key), supplied by the caller since the engine has no storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub id: i32,
    #[serde(default)]
    pub segments: Vec<String>,
    pub order_count: u32,
    pub loyalty_tier: Option<String>,
    #[serde(default)]
    pub promo_usage: HashMap<String, u32>,
}

impl CustomerProfile {
    /// How many times this customer has redeemed `code` (case-insensitive)
    pub fn promo_usage_for(&self, code: &str) -> u32 {
        self.promo_usage
            .get(&code.trim().to_uppercase())
            .copied()
            .unwrap_or(0)
    }
}

/// Immutable order snapshot supplied by the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderContext {
    pub items: Vec<LineItem>,
    pub customer: CustomerProfile,
    /// Instant the order was placed
    pub placed_at: DateTime<Utc>,
    /// The operating location's UTC offset in minutes, supplied by the
    /// caller so no timezone database is needed here
    pub utc_offset_minutes: i32,
    pub channel: SalesChannel,
    pub promo_code: Option<String>,
}

impl OrderContext {
    /// Order subtotal: sum of line totals
    pub fn subtotal(&self) -> Decimal {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Total unit count across all lines
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Wall-clock datetime at the operating location
    pub fn local_datetime(&self) -> NaiveDateTime {
        (self.placed_at + Duration::minutes(i64::from(self.utc_offset_minutes))).naive_utc()
    }

    /// Local time of day the order was placed
    pub fn local_time(&self) -> NaiveTime {
        self.local_datetime().time()
    }

    /// Local calendar date the order was placed
    pub fn local_date(&self) -> NaiveDate {
        self.local_datetime().date()
    }

    /// Local day of week the order was placed
    pub fn weekday(&self) -> Weekday {
        self.local_date().weekday()
    }
}
