use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::{
    domain::{
        entities::user::{NewUser, Role, User},
        repositories::user::{UserRepository, UserRepositoryError},
    },
    infrastructure::database::{retry_on_busy, Pool},
};

#[derive(Clone)]
pub struct UserRepositoryImpl {
    pool: Pool,
}

impl UserRepositoryImpl {
    pub fn new<P: Into<Pool>>(pool: P) -> Self {
        Self { pool: pool.into() }
    }

    async fn try_update_password(
        &self,
        id: i64,
        password: &str,
    ) -> Result<u64, UserRepositoryError> {
        let rows_affected = sqlx::query(
            r#"UPDATE user
                SET password = ?, updated_at = ?
                WHERE id = ?"#,
        )
        .bind(password)
        .bind(Utc::now().naive_utc())
        .bind(id)
        .execute(&self.pool as &SqlitePool)
        .await?
        .rows_affected();

        Ok(rows_affected)
    }
}

fn map_user(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get(0),
        name: row.get(1),
        email: row.get(2),
        password: row.get(3),
        role: Role::from_db(row.get::<&str, _>(4)),
        created_at: row.get(5),
        updated_at: row.get(6),
    }
}

const USER_COLUMNS: &str = r#"id, name, email, password, role, created_at, updated_at"#;

#[async_trait]
impl UserRepository for UserRepositoryImpl {
    async fn insert_user(&self, user: NewUser) -> Result<i64, UserRepositoryError> {
        let now = Utc::now().naive_utc();

        let result = sqlx::query(
            r#"INSERT INTO user(
                name,
                email,
                password,
                role,
                created_at,
                updated_at
            ) VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password)
        .bind(user.role.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool as &SqlitePool)
        .await;

        match result {
            Ok(done) => Ok(done.last_insert_rowid()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(UserRepositoryError::EmailTaken)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Credential updates contend with checkout traffic, so this write goes
    /// through the shared busy-retry policy.
    async fn update_password(&self, id: i64, password: String) -> Result<u64, UserRepositoryError> {
        retry_on_busy(|| self.try_update_password(id, &password)).await
    }

    async fn get_user_by_id(&self, id: i64) -> Result<User, UserRepositoryError> {
        let row = sqlx::query(&format!(r#"SELECT {USER_COLUMNS} FROM user WHERE id = ?"#))
            .bind(id)
            .fetch_optional(&self.pool as &SqlitePool)
            .await?
            .ok_or(UserRepositoryError::NotFound)?;

        Ok(map_user(&row))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, UserRepositoryError> {
        let row = sqlx::query(&format!(r#"SELECT {USER_COLUMNS} FROM user WHERE email = ?"#))
            .bind(email)
            .fetch_optional(&self.pool as &SqlitePool)
            .await?
            .ok_or(UserRepositoryError::NotFound)?;

        Ok(map_user(&row))
    }

    async fn get_users_count(&self) -> Result<i64, UserRepositoryError> {
        let row = sqlx::query(r#"SELECT COUNT(1) FROM user"#)
            .fetch_one(&self.pool as &SqlitePool)
            .await?;

        Ok(row.get(0))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::domain::services::user::{UserError, UserService};
    use crate::infrastructure::database::test_support::memory_pool;

    #[tokio::test]
    async fn test_first_registration_becomes_admin() {
        let pool = memory_pool().await;
        let svc = UserService::new(UserRepositoryImpl::new(pool));

        let first = svc.register("Mei", "mei@example.com", "correct horse").await.unwrap();
        assert_eq!(first.role, Role::Admin);

        let second = svc.register("Ren", "ren@example.com", "battery staple").await.unwrap();
        assert_eq!(second.role, Role::Customer);
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected() {
        let pool = memory_pool().await;
        let svc = UserService::new(UserRepositoryImpl::new(pool));

        svc.register("Mei", "mei@example.com", "correct horse").await.unwrap();

        let err = svc
            .register("Imposter", "mei@example.com", "correct horse")
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::EmailTaken));
    }

    #[tokio::test]
    async fn test_authenticate_checks_password() {
        let pool = memory_pool().await;
        let svc = UserService::new(UserRepositoryImpl::new(pool));

        svc.register("Mei", "mei@example.com", "correct horse").await.unwrap();

        let user = svc.authenticate("mei@example.com", "correct horse").await.unwrap();
        assert_eq!(user.email, "mei@example.com");

        let err = svc.authenticate("mei@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, UserError::WrongPassword));

        let err = svc.authenticate("nobody@example.com", "correct horse").await.unwrap_err();
        assert!(matches!(err, UserError::UserNotFound));
    }

    #[tokio::test]
    async fn test_short_password_is_rejected() {
        let pool = memory_pool().await;
        let svc = UserService::new(UserRepositoryImpl::new(pool));

        let err = svc.register("Mei", "mei@example.com", "short").await.unwrap_err();
        assert!(matches!(err, UserError::InsufficientPasswordLength));
    }

    #[tokio::test]
    async fn test_change_password() {
        let pool = memory_pool().await;
        let svc = UserService::new(UserRepositoryImpl::new(pool));

        let user = svc.register("Mei", "mei@example.com", "correct horse").await.unwrap();

        svc.change_password(user.id, "correct horse", "battery staple").await.unwrap();

        assert!(svc.authenticate("mei@example.com", "battery staple").await.is_ok());
        assert!(svc.authenticate("mei@example.com", "correct horse").await.is_err());
    }

    #[tokio::test]
    async fn test_legacy_role_spelling_reads_as_customer() {
        let pool = memory_pool().await;
        let repo = UserRepositoryImpl::new(pool.clone());

        sqlx::query(
            r#"INSERT INTO user(name, email, password, role)
                VALUES ('Old Timer', 'old@example.com', 'hash', 'user')"#,
        )
        .execute(&pool as &SqlitePool)
        .await
        .unwrap();

        let user = repo.get_user_by_email("old@example.com").await.unwrap();
        assert_eq!(user.role, Role::Customer);
    }
}
