use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{
    entities::order::{Order, OrderItem, OrderLine},
    repositories::stock::StockRepositoryError,
};

#[derive(Debug, Error)]
pub enum OrderRepositoryError {
    #[error("query return nothing")]
    NotFound,
    #[error("unknown product {0}")]
    UnknownProduct(i64),
    #[error(transparent)]
    Stock(#[from] StockRepositoryError),
    #[error("database return error: {0}")]
    DbError(#[from] sqlx::Error),
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Creates the order row, its items and the matching stock decrements in
    /// one all-or-nothing transaction. Insufficient stock for any line item
    /// rolls back everything, including the order row itself.
    async fn create_order(
        &self,
        user_id: i64,
        items: &[OrderLine],
    ) -> Result<Order, OrderRepositoryError>;

    async fn get_order(&self, id: i64) -> Result<Order, OrderRepositoryError>;

    async fn get_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderRepositoryError>;

    async fn get_orders_by_user(&self, user_id: i64) -> Result<Vec<Order>, OrderRepositoryError>;

    async fn get_orders(&self) -> Result<Vec<Order>, OrderRepositoryError>;
}
