use chrono::NaiveDateTime;
use serde::Serialize;

/// Authoritative quantity-on-hand for one product. `quantity` never goes
/// negative; `min_quantity` is the reorder threshold.
#[derive(Debug, Clone, Serialize)]
pub struct StockRecord {
    pub product_id: i64,
    pub quantity: i64,
    pub min_quantity: i64,
}

/// One immutable audit row per quantity change. Current quantity lives on
/// the stock row, not in a sum over these entries.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub product_id: i64,
    pub delta: i64,
    pub quantity_after: i64,
    pub reason: String,
    pub actor_id: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerOrder {
    NewestFirst,
    OldestFirst,
}
