use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::{
    domain::{
        entities::{
            order::OrderLine,
            stock::{LedgerEntry, LedgerOrder, StockRecord},
        },
        repositories::stock::{StockRepository, StockRepositoryError},
    },
    infrastructure::database::{retry_on_busy, Pool},
};

/// Reorder threshold given to lazily created stock rows.
pub const MIN_QUANTITY_SEED: i64 = 5;

#[derive(Clone)]
pub struct StockRepositoryImpl {
    pool: Pool,
}

impl StockRepositoryImpl {
    pub fn new<P: Into<Pool>>(pool: P) -> Self {
        Self { pool: pool.into() }
    }
}

async fn insert_ledger_entry(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: i64,
    delta: i64,
    quantity_after: i64,
    reason: &str,
    actor_id: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"INSERT INTO stock_ledger(
            product_id,
            delta,
            quantity_after,
            reason,
            actor_id,
            created_at
        ) VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(product_id)
    .bind(delta)
    .bind(quantity_after)
    .bind(reason)
    .bind(actor_id)
    .bind(Utc::now().naive_utc())
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// One guarded decrement inside an open transaction. The `quantity >= ?`
/// predicate is what keeps concurrent decrements from jointly driving the
/// quantity negative; zero updated rows then splits into "record missing"
/// and "not enough stock".
pub(in crate::infrastructure) async fn decrement_in_tx(
    tx: &mut Transaction<'_, Sqlite>,
    product_id: i64,
    amount: i64,
    reason: &str,
    actor_id: i64,
) -> Result<i64, StockRepositoryError> {
    let updated = sqlx::query(
        r#"UPDATE stock
            SET quantity = quantity - ?
            WHERE product_id = ? AND quantity >= ?
            RETURNING quantity"#,
    )
    .bind(amount)
    .bind(product_id)
    .bind(amount)
    .fetch_optional(&mut **tx)
    .await?;

    let quantity_after = match updated {
        Some(row) => row.get(0),
        None => {
            let available = sqlx::query(r#"SELECT quantity FROM stock WHERE product_id = ?"#)
                .bind(product_id)
                .fetch_optional(&mut **tx)
                .await?
                .map(|row| row.get(0));

            return Err(match available {
                Some(available) => StockRepositoryError::InsufficientStock {
                    product_id,
                    requested: amount,
                    available,
                },
                None => StockRepositoryError::NotFound(product_id),
            });
        }
    };

    insert_ledger_entry(tx, product_id, -amount, quantity_after, reason, actor_id).await?;

    Ok(quantity_after)
}

impl StockRepositoryImpl {
    async fn try_increment(
        &self,
        product_id: i64,
        amount: i64,
        reason: &str,
        actor_id: i64,
    ) -> Result<i64, StockRepositoryError> {
        let mut tx = self.pool.begin().await?;

        let quantity_after = sqlx::query(
            r#"INSERT INTO stock(product_id, quantity, min_quantity)
                VALUES (?, ?, ?)
                ON CONFLICT(product_id) DO UPDATE SET quantity = stock.quantity + excluded.quantity
                RETURNING quantity"#,
        )
        .bind(product_id)
        .bind(amount)
        .bind(MIN_QUANTITY_SEED)
        .fetch_one(&mut *tx)
        .await?
        .get(0);

        insert_ledger_entry(&mut tx, product_id, amount, quantity_after, reason, actor_id).await?;

        tx.commit().await?;

        Ok(quantity_after)
    }

    async fn try_decrement(
        &self,
        product_id: i64,
        amount: i64,
        reason: &str,
        actor_id: i64,
    ) -> Result<i64, StockRepositoryError> {
        let mut tx = self.pool.begin().await?;

        let quantity_after = decrement_in_tx(&mut tx, product_id, amount, reason, actor_id).await?;

        tx.commit().await?;

        Ok(quantity_after)
    }

    async fn try_set_quantity(
        &self,
        product_id: i64,
        value: i64,
        reason: &str,
        actor_id: i64,
    ) -> Result<i64, StockRepositoryError> {
        let mut tx = self.pool.begin().await?;

        let old = sqlx::query(r#"SELECT quantity FROM stock WHERE product_id = ?"#)
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?
            .map(|row| row.get::<i64, _>(0))
            .unwrap_or(0);

        sqlx::query(
            r#"INSERT INTO stock(product_id, quantity, min_quantity)
                VALUES (?, ?, ?)
                ON CONFLICT(product_id) DO UPDATE SET quantity = excluded.quantity"#,
        )
        .bind(product_id)
        .bind(value)
        .bind(MIN_QUANTITY_SEED)
        .execute(&mut *tx)
        .await?;

        insert_ledger_entry(&mut tx, product_id, value - old, value, reason, actor_id).await?;

        tx.commit().await?;

        Ok(value)
    }

    async fn try_set_min_quantity(
        &self,
        product_id: i64,
        value: i64,
        reason: &str,
        actor_id: i64,
    ) -> Result<i64, StockRepositoryError> {
        let mut tx = self.pool.begin().await?;

        let old_min = sqlx::query(r#"SELECT min_quantity FROM stock WHERE product_id = ?"#)
            .bind(product_id)
            .fetch_optional(&mut *tx)
            .await?
            .map(|row| row.get::<i64, _>(0))
            .unwrap_or(0);

        let quantity = sqlx::query(
            r#"INSERT INTO stock(product_id, quantity, min_quantity)
                VALUES (?, 0, ?)
                ON CONFLICT(product_id) DO UPDATE SET min_quantity = excluded.min_quantity
                RETURNING quantity"#,
        )
        .bind(product_id)
        .bind(value)
        .fetch_one(&mut *tx)
        .await?
        .get(0);

        // quantity_after reports the unchanged on-hand quantity; the delta
        // tracks the threshold move.
        insert_ledger_entry(&mut tx, product_id, value - old_min, quantity, reason, actor_id)
            .await?;

        tx.commit().await?;

        Ok(value)
    }

    async fn try_decrement_batch(
        &self,
        items: &[OrderLine],
        reason: &str,
        actor_id: i64,
    ) -> Result<(), StockRepositoryError> {
        let mut tx = self.pool.begin().await?;

        for item in items {
            decrement_in_tx(&mut tx, item.product_id, item.quantity, reason, actor_id).await?;
        }

        tx.commit().await?;

        Ok(())
    }
}

#[async_trait]
impl StockRepository for StockRepositoryImpl {
    async fn get(&self, product_id: i64) -> Result<Option<StockRecord>, StockRepositoryError> {
        let record = sqlx::query(
            r#"SELECT
                product_id,
                quantity,
                min_quantity
            FROM stock
            WHERE product_id = ?"#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool as &SqlitePool)
        .await?
        .map(|row| StockRecord {
            product_id: row.get(0),
            quantity: row.get(1),
            min_quantity: row.get(2),
        });

        Ok(record)
    }

    async fn increment(
        &self,
        product_id: i64,
        amount: i64,
        reason: &str,
        actor_id: i64,
    ) -> Result<i64, StockRepositoryError> {
        retry_on_busy(|| self.try_increment(product_id, amount, reason, actor_id)).await
    }

    async fn decrement(
        &self,
        product_id: i64,
        amount: i64,
        reason: &str,
        actor_id: i64,
    ) -> Result<i64, StockRepositoryError> {
        retry_on_busy(|| self.try_decrement(product_id, amount, reason, actor_id)).await
    }

    async fn set_quantity(
        &self,
        product_id: i64,
        value: i64,
        reason: &str,
        actor_id: i64,
    ) -> Result<i64, StockRepositoryError> {
        retry_on_busy(|| self.try_set_quantity(product_id, value, reason, actor_id)).await
    }

    async fn set_min_quantity(
        &self,
        product_id: i64,
        value: i64,
        reason: &str,
        actor_id: i64,
    ) -> Result<i64, StockRepositoryError> {
        retry_on_busy(|| self.try_set_min_quantity(product_id, value, reason, actor_id)).await
    }

    async fn decrement_batch(
        &self,
        items: &[OrderLine],
        reason: &str,
        actor_id: i64,
    ) -> Result<(), StockRepositoryError> {
        retry_on_busy(|| self.try_decrement_batch(items, reason, actor_id)).await
    }

    async fn history(
        &self,
        product_id: i64,
        order: LedgerOrder,
    ) -> Result<Vec<LedgerEntry>, StockRepositoryError> {
        let query = match order {
            LedgerOrder::NewestFirst => {
                r#"SELECT
                    id,
                    product_id,
                    delta,
                    quantity_after,
                    reason,
                    actor_id,
                    created_at
                FROM stock_ledger
                WHERE product_id = ?
                ORDER BY id DESC"#
            }
            LedgerOrder::OldestFirst => {
                r#"SELECT
                    id,
                    product_id,
                    delta,
                    quantity_after,
                    reason,
                    actor_id,
                    created_at
                FROM stock_ledger
                WHERE product_id = ?
                ORDER BY id ASC"#
            }
        };

        let entries = sqlx::query(query)
            .bind(product_id)
            .fetch_all(&self.pool as &SqlitePool)
            .await?
            .into_iter()
            .map(|row| LedgerEntry {
                id: row.get(0),
                product_id: row.get(1),
                delta: row.get(2),
                quantity_after: row.get(3),
                reason: row.get(4),
                actor_id: row.get(5),
                created_at: row.get(6),
            })
            .collect();

        Ok(entries)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::infrastructure::database::test_support::{memory_pool, seed_product, seed_product_with_stock};

    #[tokio::test]
    async fn test_decrement_writes_ledger_and_guards_floor() {
        let pool = memory_pool().await;
        seed_product_with_stock(&pool, 27, 10).await;
        let repo = StockRepositoryImpl::new(pool);

        let after = repo.decrement(27, 4, "sale", 1).await.unwrap();
        assert_eq!(after, 6);

        let entries = repo.history(27, LedgerOrder::NewestFirst).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].delta, -4);
        assert_eq!(entries[0].quantity_after, 6);
        assert_eq!(entries[0].reason, "sale");
        assert_eq!(entries[0].actor_id, 1);

        let err = repo.decrement(27, 10, "sale", 1).await.unwrap_err();
        match err {
            StockRepositoryError::InsufficientStock {
                product_id,
                requested,
                available,
            } => {
                assert_eq!(product_id, 27);
                assert_eq!(requested, 10);
                assert_eq!(available, 6);
            }
            other => panic!("unexpected error: {other}"),
        }

        // Failed decrement mutated nothing, and reads are stable.
        assert_eq!(repo.get(27).await.unwrap().unwrap().quantity, 6);
        assert_eq!(repo.get(27).await.unwrap().unwrap().quantity, 6);
        assert_eq!(repo.history(27, LedgerOrder::NewestFirst).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_decrement_without_record_is_not_found() {
        let pool = memory_pool().await;
        seed_product(&pool, 1).await;
        let repo = StockRepositoryImpl::new(pool);

        let err = repo.decrement(1, 1, "sale", 1).await.unwrap_err();
        assert!(matches!(err, StockRepositoryError::NotFound(1)));
    }

    #[tokio::test]
    async fn test_increment_seeds_missing_record() {
        let pool = memory_pool().await;
        seed_product(&pool, 3).await;
        let repo = StockRepositoryImpl::new(pool);

        let after = repo.increment(3, 7, "restock", 2).await.unwrap();
        assert_eq!(after, 7);

        let record = repo.get(3).await.unwrap().unwrap();
        assert_eq!(record.quantity, 7);
        assert_eq!(record.min_quantity, MIN_QUANTITY_SEED);

        let entries = repo.history(3, LedgerOrder::OldestFirst).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].delta, 7);
    }

    #[tokio::test]
    async fn test_set_quantity_records_signed_delta() {
        let pool = memory_pool().await;
        seed_product_with_stock(&pool, 5, 10).await;
        let repo = StockRepositoryImpl::new(pool);

        let after = repo.set_quantity(5, 4, "stocktake", 1).await.unwrap();
        assert_eq!(after, 4);

        let entries = repo.history(5, LedgerOrder::NewestFirst).await.unwrap();
        assert_eq!(entries[0].delta, -6);
        assert_eq!(entries[0].quantity_after, 4);
    }

    #[tokio::test]
    async fn test_set_min_quantity_keeps_quantity() {
        let pool = memory_pool().await;
        seed_product_with_stock(&pool, 6, 9).await;
        let repo = StockRepositoryImpl::new(pool);

        repo.set_min_quantity(6, 2, "threshold", 1).await.unwrap();

        let record = repo.get(6).await.unwrap().unwrap();
        assert_eq!(record.quantity, 9);
        assert_eq!(record.min_quantity, 2);

        let entries = repo.history(6, LedgerOrder::NewestFirst).await.unwrap();
        assert_eq!(entries[0].delta, -3);
        assert_eq!(entries[0].quantity_after, 9);
    }

    #[tokio::test]
    async fn test_batch_rolls_back_on_first_failure() {
        let pool = memory_pool().await;
        seed_product_with_stock(&pool, 1, 10).await;
        seed_product_with_stock(&pool, 2, 3).await;
        let repo = StockRepositoryImpl::new(pool);

        let items = [
            OrderLine { product_id: 1, quantity: 5 },
            OrderLine { product_id: 2, quantity: 999_999 },
        ];

        let err = repo.decrement_batch(&items, "sale", 1).await.unwrap_err();
        match err {
            StockRepositoryError::InsufficientStock { product_id, available, .. } => {
                assert_eq!(product_id, 2);
                assert_eq!(available, 3);
            }
            other => panic!("unexpected error: {other}"),
        }

        // The already-applied decrement of product 1 was rolled back.
        assert_eq!(repo.get(1).await.unwrap().unwrap().quantity, 10);
        assert_eq!(repo.get(2).await.unwrap().unwrap().quantity, 3);
        assert!(repo.history(1, LedgerOrder::NewestFirst).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_decrements_never_go_negative() {
        let pool = memory_pool().await;
        seed_product_with_stock(&pool, 9, 5).await;
        let repo = StockRepositoryImpl::new(pool);

        let mut handles = Vec::new();
        for _ in 0..8 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.decrement(9, 1, "sale", 1).await.is_ok()
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }

        assert_eq!(successes, 5);
        assert_eq!(repo.get(9).await.unwrap().unwrap().quantity, 0);
    }
}
