use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::product::{NewProduct, Product};

#[derive(Debug, Error)]
pub enum ProductRepositoryError {
    #[error("query return nothing")]
    NotFound,
    #[error("database return error: {0}")]
    DbError(#[from] sqlx::Error),
}

#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Inserts the product and seeds its stock row in the same transaction.
    async fn insert_product(&self, product: NewProduct) -> Result<Product, ProductRepositoryError>;

    async fn update_product(
        &self,
        id: i64,
        product: NewProduct,
    ) -> Result<Product, ProductRepositoryError>;

    async fn delete_product(&self, id: i64) -> Result<(), ProductRepositoryError>;

    async fn get_product(&self, id: i64) -> Result<Product, ProductRepositoryError>;

    async fn get_products(&self) -> Result<Vec<Product>, ProductRepositoryError>;
}
