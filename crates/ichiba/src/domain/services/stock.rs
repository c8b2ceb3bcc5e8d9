use thiserror::Error;

use crate::domain::{
    entities::{
        order::OrderLine,
        stock::{LedgerEntry, LedgerOrder, StockRecord},
    },
    repositories::stock::{StockRepository, StockRepositoryError},
};

#[derive(Debug, Error)]
pub enum StockError {
    #[error("amount must be positive")]
    NonPositiveAmount,
    #[error("quantity must not be negative")]
    NegativeQuantity,
    #[error("order has no line items")]
    EmptyBatch,
    #[error("repository error: {0}")]
    RepositoryError(#[from] StockRepositoryError),
}

#[derive(Clone)]
pub struct StockService<R>
where
    R: StockRepository,
{
    repo: R,
}

impl<R> StockService<R>
where
    R: StockRepository,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub async fn fetch_record(&self, product_id: i64) -> Result<Option<StockRecord>, StockError> {
        Ok(self.repo.get(product_id).await?)
    }

    pub async fn fetch_quantity(&self, product_id: i64) -> Result<Option<i64>, StockError> {
        Ok(self.repo.get(product_id).await?.map(|record| record.quantity))
    }

    pub async fn increment(
        &self,
        product_id: i64,
        amount: i64,
        reason: &str,
        actor_id: i64,
    ) -> Result<i64, StockError> {
        if amount <= 0 {
            return Err(StockError::NonPositiveAmount);
        }

        Ok(self.repo.increment(product_id, amount, reason, actor_id).await?)
    }

    pub async fn decrement(
        &self,
        product_id: i64,
        amount: i64,
        reason: &str,
        actor_id: i64,
    ) -> Result<i64, StockError> {
        if amount <= 0 {
            return Err(StockError::NonPositiveAmount);
        }

        Ok(self.repo.decrement(product_id, amount, reason, actor_id).await?)
    }

    pub async fn set_quantity(
        &self,
        product_id: i64,
        value: i64,
        reason: &str,
        actor_id: i64,
    ) -> Result<i64, StockError> {
        if value < 0 {
            return Err(StockError::NegativeQuantity);
        }

        Ok(self.repo.set_quantity(product_id, value, reason, actor_id).await?)
    }

    pub async fn set_min_quantity(
        &self,
        product_id: i64,
        value: i64,
        reason: &str,
        actor_id: i64,
    ) -> Result<i64, StockError> {
        if value < 0 {
            return Err(StockError::NegativeQuantity);
        }

        Ok(self.repo.set_min_quantity(product_id, value, reason, actor_id).await?)
    }

    pub async fn decrement_batch(
        &self,
        items: &[OrderLine],
        reason: &str,
        actor_id: i64,
    ) -> Result<(), StockError> {
        if items.is_empty() {
            return Err(StockError::EmptyBatch);
        }
        if items.iter().any(|item| item.quantity <= 0) {
            return Err(StockError::NonPositiveAmount);
        }

        Ok(self.repo.decrement_batch(items, reason, actor_id).await?)
    }

    pub async fn fetch_history(
        &self,
        product_id: i64,
        order: LedgerOrder,
    ) -> Result<Vec<LedgerEntry>, StockError> {
        Ok(self.repo.history(product_id, order).await?)
    }
}
