use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::time::Duration;

use sqlx::{
    migrate::MigrateError,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions},
};

use crate::domain::repositories::{
    order::OrderRepositoryError, product::ProductRepositoryError, stock::StockRepositoryError,
    user::UserRepositoryError,
};

#[derive(Clone)]
pub struct Pool(SqlitePool);

impl From<SqlitePool> for Pool {
    fn from(pool: SqlitePool) -> Self {
        Self(pool)
    }
}

impl Deref for Pool {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for Pool {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

pub async fn establish_connection(
    database_path: &str,
    create: bool,
) -> Result<Pool, anyhow::Error> {
    let opts = SqliteConnectOptions::new()
        .create_if_missing(create)
        .filename(database_path)
        .journal_mode(SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .idle_timeout(Duration::from_secs(60))
        .max_lifetime(Duration::from_secs(3 * 60))
        .connect_with(opts)
        .await?;

    match sqlx::migrate!("./migrations").run(&pool).await {
        Err(MigrateError::VersionMismatch(version)) => {
            warn!("migration {version} was previously applied but has been modified")
        }
        Err(e) => {
            return Err(e.into());
        }
        _ => {}
    }

    Ok(Pool(pool))
}

const BUSY_RETRIES: u32 = 3;
const BUSY_RETRY_DELAY: Duration = Duration::from_millis(50);

/// SQLITE_BUSY / SQLITE_LOCKED family, including the extended codes. These
/// are transient lock contention, not data errors.
fn is_busy_code(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            matches!(db.code().as_deref(), Some("5" | "6" | "261" | "517"))
        }
        _ => false,
    }
}

/// Errors worth one more attempt. Implemented by every repository error that
/// wraps `sqlx::Error` so contended writes share one retry policy.
pub(crate) trait Retryable {
    fn is_busy(&self) -> bool;
}

impl Retryable for StockRepositoryError {
    fn is_busy(&self) -> bool {
        matches!(self, Self::DbError(e) if is_busy_code(e))
    }
}

impl Retryable for UserRepositoryError {
    fn is_busy(&self) -> bool {
        matches!(self, Self::DbError(e) if is_busy_code(e))
    }
}

impl Retryable for ProductRepositoryError {
    fn is_busy(&self) -> bool {
        matches!(self, Self::DbError(e) if is_busy_code(e))
    }
}

impl Retryable for OrderRepositoryError {
    fn is_busy(&self) -> bool {
        match self {
            Self::DbError(e) => is_busy_code(e),
            Self::Stock(e) => e.is_busy(),
            _ => false,
        }
    }
}

/// Runs `op`, retrying a bounded number of times with a short delay while the
/// store reports lock contention. Anything else surfaces immediately.
pub(crate) async fn retry_on_busy<T, E, F, Fut>(mut op: F) -> Result<T, E>
where
    E: Retryable,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(e) if e.is_busy() && attempt < BUSY_RETRIES => {
                attempt += 1;
                debug!("store busy, retrying (attempt {attempt})");
                tokio::time::sleep(BUSY_RETRY_DELAY).await;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Pool;
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    /// Fresh in-memory database with all migrations applied. One connection,
    /// so every handle sees the same database.
    pub(crate) async fn memory_pool() -> Pool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        sqlx::migrate!("./migrations").run(&pool).await.unwrap();

        Pool::from(pool)
    }

    pub(crate) async fn seed_user(pool: &Pool, id: i64) {
        sqlx::query(
            r#"INSERT INTO user(id, name, email, password, role)
                VALUES (?, ?, ?, 'not-a-real-hash', 'customer')"#,
        )
        .bind(id)
        .bind(format!("user {id}"))
        .bind(format!("user{id}@example.com"))
        .execute(pool as &SqlitePool)
        .await
        .unwrap();
    }

    pub(crate) async fn seed_product(pool: &Pool, id: i64) {
        sqlx::query(
            r#"INSERT INTO product(id, name, description, price_cents)
                VALUES (?, ?, '', 1000)"#,
        )
        .bind(id)
        .bind(format!("product {id}"))
        .execute(pool as &SqlitePool)
        .await
        .unwrap();
    }

    pub(crate) async fn seed_product_with_stock(pool: &Pool, id: i64, quantity: i64) {
        seed_product(pool, id).await;

        sqlx::query(r#"INSERT INTO stock(product_id, quantity, min_quantity) VALUES (?, ?, 5)"#)
            .bind(id)
            .bind(quantity)
            .execute(pool as &SqlitePool)
            .await
            .unwrap();
    }
}
