use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: i64,
    pub user_id: i64,
    pub status: String,
    pub total_cents: i64,
    pub created_at: NaiveDateTime,
}

/// Line item as stored, with the unit price snapshotted at placement time.
#[derive(Debug, Clone, Serialize)]
pub struct OrderItem {
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

/// Requested line item, before pricing.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderLine {
    pub product_id: i64,
    pub quantity: i64,
}
