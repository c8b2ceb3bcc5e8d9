use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{
    order::OrderLine,
    stock::{LedgerEntry, LedgerOrder, StockRecord},
};

#[derive(Debug, Error)]
pub enum StockRepositoryError {
    #[error("no stock record for product {0}")]
    NotFound(i64),
    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: i64,
        requested: i64,
        available: i64,
    },
    #[error("database return error: {0}")]
    DbError(#[from] sqlx::Error),
}

/// Guarded quantity mutation. Every mutation records a ledger entry in the
/// same transaction that changes the stock row, and the conditional update
/// keeps `quantity` non-negative under concurrent decrements.
#[async_trait]
pub trait StockRepository: Send + Sync {
    async fn get(&self, product_id: i64) -> Result<Option<StockRecord>, StockRepositoryError>;

    /// Adds `amount`, lazily seeding a record when none exists. Returns the
    /// quantity after the change.
    async fn increment(
        &self,
        product_id: i64,
        amount: i64,
        reason: &str,
        actor_id: i64,
    ) -> Result<i64, StockRepositoryError>;

    /// Subtracts `amount` unless that would drive the quantity negative.
    async fn decrement(
        &self,
        product_id: i64,
        amount: i64,
        reason: &str,
        actor_id: i64,
    ) -> Result<i64, StockRepositoryError>;

    async fn set_quantity(
        &self,
        product_id: i64,
        value: i64,
        reason: &str,
        actor_id: i64,
    ) -> Result<i64, StockRepositoryError>;

    async fn set_min_quantity(
        &self,
        product_id: i64,
        value: i64,
        reason: &str,
        actor_id: i64,
    ) -> Result<i64, StockRepositoryError>;

    /// Applies one decrement per line item inside a single transaction. The
    /// first failing item rolls the whole batch back.
    async fn decrement_batch(
        &self,
        items: &[OrderLine],
        reason: &str,
        actor_id: i64,
    ) -> Result<(), StockRepositoryError>;

    async fn history(
        &self,
        product_id: i64,
        order: LedgerOrder,
    ) -> Result<Vec<LedgerEntry>, StockRepositoryError>;
}
