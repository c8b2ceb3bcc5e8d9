use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::{
    domain::{
        entities::order::{Order, OrderItem, OrderLine},
        repositories::order::{OrderRepository, OrderRepositoryError},
    },
    infrastructure::{
        database::{retry_on_busy, Pool},
        domain::repositories::stock::decrement_in_tx,
    },
};

#[derive(Clone)]
pub struct OrderRepositoryImpl {
    pool: Pool,
}

impl OrderRepositoryImpl {
    pub fn new<P: Into<Pool>>(pool: P) -> Self {
        Self { pool: pool.into() }
    }

    async fn try_create_order(
        &self,
        user_id: i64,
        items: &[OrderLine],
    ) -> Result<Order, OrderRepositoryError> {
        let now = Utc::now().naive_utc();

        let mut tx = self.pool.begin().await?;

        // Snapshot unit prices first so the stored items and the total can
        // never drift from what was charged.
        let mut priced = Vec::with_capacity(items.len());
        let mut total_cents = 0;
        for item in items {
            let unit_price_cents: i64 =
                sqlx::query(r#"SELECT price_cents FROM product WHERE id = ?"#)
                    .bind(item.product_id)
                    .fetch_optional(&mut *tx)
                    .await?
                    .map(|row| row.get(0))
                    .ok_or(OrderRepositoryError::UnknownProduct(item.product_id))?;

            total_cents += unit_price_cents * item.quantity;
            priced.push((item.product_id, item.quantity, unit_price_cents));
        }

        let order_id: i64 = sqlx::query(
            r#"INSERT INTO orders(user_id, status, total_cents, created_at)
                VALUES (?, 'placed', ?, ?)
                RETURNING id"#,
        )
        .bind(user_id)
        .bind(total_cents)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?
        .get(0);

        for (product_id, quantity, unit_price_cents) in &priced {
            sqlx::query(
                r#"INSERT INTO order_item(order_id, product_id, quantity, unit_price_cents)
                    VALUES (?, ?, ?, ?)"#,
            )
            .bind(order_id)
            .bind(product_id)
            .bind(quantity)
            .bind(unit_price_cents)
            .execute(&mut *tx)
            .await?;
        }

        // Any insufficient line item aborts here, taking the order row and
        // its items away with the rollback.
        let reason = format!("order #{order_id}");
        for (product_id, quantity, _) in &priced {
            decrement_in_tx(&mut tx, *product_id, *quantity, &reason, user_id).await?;
        }

        tx.commit().await?;

        Ok(Order {
            id: order_id,
            user_id,
            status: "placed".to_string(),
            total_cents,
            created_at: now,
        })
    }
}

fn map_order(row: &sqlx::sqlite::SqliteRow) -> Order {
    Order {
        id: row.get(0),
        user_id: row.get(1),
        status: row.get(2),
        total_cents: row.get(3),
        created_at: row.get(4),
    }
}

const ORDER_COLUMNS: &str = r#"id, user_id, status, total_cents, created_at"#;

#[async_trait]
impl OrderRepository for OrderRepositoryImpl {
    async fn create_order(
        &self,
        user_id: i64,
        items: &[OrderLine],
    ) -> Result<Order, OrderRepositoryError> {
        retry_on_busy(|| self.try_create_order(user_id, items)).await
    }

    async fn get_order(&self, id: i64) -> Result<Order, OrderRepositoryError> {
        let row = sqlx::query(&format!(r#"SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?"#))
            .bind(id)
            .fetch_optional(&self.pool as &SqlitePool)
            .await?
            .ok_or(OrderRepositoryError::NotFound)?;

        Ok(map_order(&row))
    }

    async fn get_order_items(&self, order_id: i64) -> Result<Vec<OrderItem>, OrderRepositoryError> {
        let items = sqlx::query(
            r#"SELECT
                product_id,
                quantity,
                unit_price_cents
            FROM order_item
            WHERE order_id = ?
            ORDER BY id"#,
        )
        .bind(order_id)
        .fetch_all(&self.pool as &SqlitePool)
        .await?
        .into_iter()
        .map(|row| OrderItem {
            product_id: row.get(0),
            quantity: row.get(1),
            unit_price_cents: row.get(2),
        })
        .collect();

        Ok(items)
    }

    async fn get_orders_by_user(&self, user_id: i64) -> Result<Vec<Order>, OrderRepositoryError> {
        let orders = sqlx::query(&format!(
            r#"SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = ? ORDER BY id DESC"#
        ))
        .bind(user_id)
        .fetch_all(&self.pool as &SqlitePool)
        .await?
        .iter()
        .map(map_order)
        .collect();

        Ok(orders)
    }

    async fn get_orders(&self) -> Result<Vec<Order>, OrderRepositoryError> {
        let orders = sqlx::query(&format!(
            r#"SELECT {ORDER_COLUMNS} FROM orders ORDER BY id DESC"#
        ))
        .fetch_all(&self.pool as &SqlitePool)
        .await?
        .iter()
        .map(map_order)
        .collect();

        Ok(orders)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::domain::repositories::stock::{StockRepository, StockRepositoryError};
    use crate::infrastructure::database::test_support::{
        memory_pool, seed_product_with_stock, seed_user,
    };
    use crate::infrastructure::domain::repositories::stock::StockRepositoryImpl;

    #[tokio::test]
    async fn test_create_order_decrements_stock_and_prices_items() {
        let pool = memory_pool().await;
        seed_user(&pool, 1).await;
        seed_product_with_stock(&pool, 10, 8).await;
        seed_product_with_stock(&pool, 11, 2).await;
        let repo = OrderRepositoryImpl::new(pool.clone());
        let stock = StockRepositoryImpl::new(pool);

        let items = [
            OrderLine { product_id: 10, quantity: 3 },
            OrderLine { product_id: 11, quantity: 2 },
        ];

        let order = repo.create_order(1, &items).await.unwrap();
        assert_eq!(order.user_id, 1);
        assert_eq!(order.status, "placed");
        assert_eq!(order.total_cents, 5 * 1000);

        let stored = repo.get_order_items(order.id).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].unit_price_cents, 1000);

        assert_eq!(stock.get(10).await.unwrap().unwrap().quantity, 5);
        assert_eq!(stock.get(11).await.unwrap().unwrap().quantity, 0);

        let entries = stock
            .history(10, crate::domain::entities::stock::LedgerOrder::NewestFirst)
            .await
            .unwrap();
        assert_eq!(entries[0].reason, format!("order #{}", order.id));
        assert_eq!(entries[0].actor_id, 1);
    }

    #[tokio::test]
    async fn test_insufficient_stock_rolls_back_order_row() {
        let pool = memory_pool().await;
        seed_user(&pool, 1).await;
        seed_product_with_stock(&pool, 10, 8).await;
        seed_product_with_stock(&pool, 11, 2).await;
        let repo = OrderRepositoryImpl::new(pool.clone());
        let stock = StockRepositoryImpl::new(pool.clone());

        let items = [
            OrderLine { product_id: 10, quantity: 3 },
            OrderLine { product_id: 11, quantity: 5 },
        ];

        let err = repo.create_order(1, &items).await.unwrap_err();
        match err {
            OrderRepositoryError::Stock(StockRepositoryError::InsufficientStock {
                product_id,
                requested,
                available,
            }) => {
                assert_eq!(product_id, 11);
                assert_eq!(requested, 5);
                assert_eq!(available, 2);
            }
            other => panic!("unexpected error: {other}"),
        }

        // Order row, items and the first decrement all rolled back.
        let order_count: i64 = sqlx::query(r#"SELECT COUNT(1) FROM orders"#)
            .fetch_one(&pool as &SqlitePool)
            .await
            .unwrap()
            .get(0);
        assert_eq!(order_count, 0);

        let item_count: i64 = sqlx::query(r#"SELECT COUNT(1) FROM order_item"#)
            .fetch_one(&pool as &SqlitePool)
            .await
            .unwrap()
            .get(0);
        assert_eq!(item_count, 0);

        assert_eq!(stock.get(10).await.unwrap().unwrap().quantity, 8);
    }

    #[tokio::test]
    async fn test_unknown_product_fails_placement() {
        let pool = memory_pool().await;
        seed_user(&pool, 1).await;
        let repo = OrderRepositoryImpl::new(pool);

        let items = [OrderLine { product_id: 404, quantity: 1 }];

        let err = repo.create_order(1, &items).await.unwrap_err();
        assert!(matches!(err, OrderRepositoryError::UnknownProduct(404)));
    }

    #[tokio::test]
    async fn test_order_listing_is_scoped_by_user() {
        let pool = memory_pool().await;
        seed_user(&pool, 1).await;
        seed_user(&pool, 2).await;
        seed_product_with_stock(&pool, 10, 8).await;
        let repo = OrderRepositoryImpl::new(pool);

        let items = [OrderLine { product_id: 10, quantity: 1 }];
        repo.create_order(1, &items).await.unwrap();
        repo.create_order(2, &items).await.unwrap();

        assert_eq!(repo.get_orders_by_user(1).await.unwrap().len(), 1);
        assert_eq!(repo.get_orders().await.unwrap().len(), 2);
    }
}
