use thiserror::Error;

use crate::domain::{
    entities::product::{NewProduct, Product},
    repositories::product::{ProductRepository, ProductRepositoryError},
};

#[derive(Debug, Error)]
pub enum ProductError {
    #[error("product not found")]
    ProductNotFound,
    #[error("price must not be negative")]
    NegativePrice,
    #[error("product name must not be empty")]
    EmptyName,
    #[error("repository error: {0}")]
    RepositoryError(#[from] ProductRepositoryError),
}

#[derive(Clone)]
pub struct ProductService<R>
where
    R: ProductRepository,
{
    repo: R,
}

impl<R> ProductService<R>
where
    R: ProductRepository,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    fn validate(product: &NewProduct) -> Result<(), ProductError> {
        if product.name.trim().is_empty() {
            return Err(ProductError::EmptyName);
        }
        if product.price_cents < 0 {
            return Err(ProductError::NegativePrice);
        }
        Ok(())
    }

    pub async fn create_product(&self, product: NewProduct) -> Result<Product, ProductError> {
        Self::validate(&product)?;

        Ok(self.repo.insert_product(product).await?)
    }

    pub async fn update_product(
        &self,
        id: i64,
        product: NewProduct,
    ) -> Result<Product, ProductError> {
        Self::validate(&product)?;

        self.repo.update_product(id, product).await.map_err(|e| match e {
            ProductRepositoryError::NotFound => ProductError::ProductNotFound,
            other => ProductError::RepositoryError(other),
        })
    }

    pub async fn delete_product(&self, id: i64) -> Result<(), ProductError> {
        self.repo.delete_product(id).await.map_err(|e| match e {
            ProductRepositoryError::NotFound => ProductError::ProductNotFound,
            other => ProductError::RepositoryError(other),
        })
    }

    pub async fn fetch_product(&self, id: i64) -> Result<Product, ProductError> {
        self.repo.get_product(id).await.map_err(|e| match e {
            ProductRepositoryError::NotFound => ProductError::ProductNotFound,
            other => ProductError::RepositoryError(other),
        })
    }

    pub async fn fetch_products(&self) -> Result<Vec<Product>, ProductError> {
        Ok(self.repo.get_products().await?)
    }
}
