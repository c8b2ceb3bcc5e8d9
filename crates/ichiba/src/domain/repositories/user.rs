use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::user::{NewUser, User};

#[derive(Debug, Error)]
pub enum UserRepositoryError {
    #[error("query return nothing")]
    NotFound,
    #[error("email already registered")]
    EmailTaken,
    #[error("database return error: {0}")]
    DbError(#[from] sqlx::Error),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert_user(&self, user: NewUser) -> Result<i64, UserRepositoryError>;

    async fn update_password(&self, id: i64, password: String) -> Result<u64, UserRepositoryError>;

    async fn get_user_by_id(&self, id: i64) -> Result<User, UserRepositoryError>;

    async fn get_user_by_email(&self, email: &str) -> Result<User, UserRepositoryError>;

    async fn get_users_count(&self) -> Result<i64, UserRepositoryError>;
}
