use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::{
    domain::{
        entities::product::{NewProduct, Product},
        repositories::product::{ProductRepository, ProductRepositoryError},
    },
    infrastructure::{
        database::{retry_on_busy, Pool},
        domain::repositories::stock::MIN_QUANTITY_SEED,
    },
};

#[derive(Clone)]
pub struct ProductRepositoryImpl {
    pool: Pool,
}

impl ProductRepositoryImpl {
    pub fn new<P: Into<Pool>>(pool: P) -> Self {
        Self { pool: pool.into() }
    }

    async fn try_insert_product(
        &self,
        product: &NewProduct,
    ) -> Result<Product, ProductRepositoryError> {
        let now = Utc::now().naive_utc();

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            r#"INSERT INTO product(
                name,
                description,
                price_cents,
                created_at,
                updated_at
            ) VALUES (?, ?, ?, ?, ?)
            RETURNING {PRODUCT_COLUMNS}"#
        ))
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let product = map_product(&row);

        // Every product gets its stock row up front so checkout never races
        // a lazy seed.
        sqlx::query(r#"INSERT INTO stock(product_id, quantity, min_quantity) VALUES (?, 0, ?)"#)
            .bind(product.id)
            .bind(MIN_QUANTITY_SEED)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(product)
    }

    async fn try_update_product(
        &self,
        id: i64,
        product: &NewProduct,
    ) -> Result<Product, ProductRepositoryError> {
        let row = sqlx::query(&format!(
            r#"UPDATE product
                SET name = ?, description = ?, price_cents = ?, updated_at = ?
                WHERE id = ?
                RETURNING {PRODUCT_COLUMNS}"#
        ))
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price_cents)
        .bind(Utc::now().naive_utc())
        .bind(id)
        .fetch_optional(&self.pool as &SqlitePool)
        .await?
        .ok_or(ProductRepositoryError::NotFound)?;

        Ok(map_product(&row))
    }

    async fn try_delete_product(&self, id: i64) -> Result<(), ProductRepositoryError> {
        let rows_affected = sqlx::query(r#"DELETE FROM product WHERE id = ?"#)
            .bind(id)
            .execute(&self.pool as &SqlitePool)
            .await?
            .rows_affected();

        if rows_affected == 0 {
            return Err(ProductRepositoryError::NotFound);
        }

        Ok(())
    }
}

fn map_product(row: &sqlx::sqlite::SqliteRow) -> Product {
    Product {
        id: row.get(0),
        name: row.get(1),
        description: row.get(2),
        price_cents: row.get(3),
        created_at: row.get(4),
        updated_at: row.get(5),
    }
}

const PRODUCT_COLUMNS: &str = r#"id, name, description, price_cents, created_at, updated_at"#;

#[async_trait]
impl ProductRepository for ProductRepositoryImpl {
    async fn insert_product(&self, product: NewProduct) -> Result<Product, ProductRepositoryError> {
        retry_on_busy(|| self.try_insert_product(&product)).await
    }

    async fn update_product(
        &self,
        id: i64,
        product: NewProduct,
    ) -> Result<Product, ProductRepositoryError> {
        retry_on_busy(|| self.try_update_product(id, &product)).await
    }

    async fn delete_product(&self, id: i64) -> Result<(), ProductRepositoryError> {
        retry_on_busy(|| self.try_delete_product(id)).await
    }

    async fn get_product(&self, id: i64) -> Result<Product, ProductRepositoryError> {
        let row = sqlx::query(&format!(r#"SELECT {PRODUCT_COLUMNS} FROM product WHERE id = ?"#))
            .bind(id)
            .fetch_optional(&self.pool as &SqlitePool)
            .await?
            .ok_or(ProductRepositoryError::NotFound)?;

        Ok(map_product(&row))
    }

    async fn get_products(&self) -> Result<Vec<Product>, ProductRepositoryError> {
        let products = sqlx::query(&format!(
            r#"SELECT {PRODUCT_COLUMNS} FROM product ORDER BY name"#
        ))
        .fetch_all(&self.pool as &SqlitePool)
        .await?
        .iter()
        .map(map_product)
        .collect();

        Ok(products)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::domain::repositories::stock::StockRepository;
    use crate::infrastructure::database::test_support::memory_pool;
    use crate::infrastructure::domain::repositories::stock::StockRepositoryImpl;

    fn sample_product() -> NewProduct {
        NewProduct {
            name: "Sencha".to_string(),
            description: "Loose leaf green tea".to_string(),
            price_cents: 1250,
        }
    }

    #[tokio::test]
    async fn test_insert_product_seeds_stock_row() {
        let pool = memory_pool().await;
        let repo = ProductRepositoryImpl::new(pool.clone());
        let stock = StockRepositoryImpl::new(pool);

        let product = repo.insert_product(sample_product()).await.unwrap();
        assert!(product.id > 0);

        let record = stock.get(product.id).await.unwrap().unwrap();
        assert_eq!(record.quantity, 0);
        assert_eq!(record.min_quantity, MIN_QUANTITY_SEED);
    }

    #[tokio::test]
    async fn test_update_and_delete_product() {
        let pool = memory_pool().await;
        let repo = ProductRepositoryImpl::new(pool);

        let product = repo.insert_product(sample_product()).await.unwrap();

        let updated = repo
            .update_product(
                product.id,
                NewProduct {
                    name: "Sencha".to_string(),
                    description: "Loose leaf green tea".to_string(),
                    price_cents: 1400,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price_cents, 1400);

        repo.delete_product(product.id).await.unwrap();

        let err = repo.get_product(product.id).await.unwrap_err();
        assert!(matches!(err, ProductRepositoryError::NotFound));

        let err = repo.delete_product(product.id).await.unwrap_err();
        assert!(matches!(err, ProductRepositoryError::NotFound));
    }
}
