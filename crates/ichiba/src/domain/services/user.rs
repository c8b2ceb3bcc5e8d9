use rand::RngCore;
use thiserror::Error;

use crate::domain::{
    entities::user::{NewUser, Role, User},
    repositories::user::{UserRepository, UserRepositoryError},
};

#[derive(Debug, Error)]
pub enum UserError {
    #[error("user not found")]
    UserNotFound,
    #[error("incorrect password")]
    WrongPassword,
    #[error("email already registered")]
    EmailTaken,
    #[error("insufficient password length")]
    InsufficientPasswordLength,
    #[error("repository error: {0}")]
    RepositoryError(#[from] UserRepositoryError),
    #[error("other: {0}")]
    Other(String),
}

#[derive(Clone)]
pub struct UserService<R>
where
    R: UserRepository,
{
    repo: R,
}

impl<R> UserService<R>
where
    R: UserRepository,
{
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    fn hash_password(password: &str) -> Result<String, UserError> {
        let mut salt: [u8; 32] = [0; 32];
        rand::rng().fill_bytes(&mut salt);

        let config = argon2::Config::default();
        argon2::hash_encoded(password.as_bytes(), &salt, &config)
            .map_err(|e| UserError::Other(format!("{e}")))
    }

    /// Self-service registration. The first account of a fresh install
    /// becomes the admin; everyone after that is a customer.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, UserError> {
        let role = if self.repo.get_users_count().await? == 0 {
            Role::Admin
        } else {
            Role::Customer
        };

        self.create_user(name, email, password, role).await
    }

    pub async fn create_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
        role: Role,
    ) -> Result<User, UserError> {
        if password.len() < 8 {
            return Err(UserError::InsufficientPasswordLength);
        }

        let hash = Self::hash_password(password)?;

        let user = NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password: hash,
            role,
        };

        let id = self.repo.insert_user(user).await.map_err(|e| match e {
            UserRepositoryError::EmailTaken => UserError::EmailTaken,
            other => UserError::RepositoryError(other),
        })?;

        Ok(self.repo.get_user_by_id(id).await?)
    }

    /// Checks credentials and returns the matching user.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, UserError> {
        let user = self.repo.get_user_by_email(email).await.map_err(|e| match e {
            UserRepositoryError::NotFound => UserError::UserNotFound,
            other => UserError::RepositoryError(other),
        })?;

        if !argon2::verify_encoded(&user.password, password.as_bytes())
            .map_err(|e| UserError::Other(format!("{e}")))?
        {
            return Err(UserError::WrongPassword);
        }

        Ok(user)
    }

    pub async fn change_password(
        &self,
        user_id: i64,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), UserError> {
        let user = self.repo.get_user_by_id(user_id).await.map_err(|e| match e {
            UserRepositoryError::NotFound => UserError::UserNotFound,
            other => UserError::RepositoryError(other),
        })?;

        if !argon2::verify_encoded(&user.password, old_password.as_bytes())
            .map_err(|e| UserError::Other(format!("{e}")))?
        {
            return Err(UserError::WrongPassword);
        }

        if new_password.len() < 8 {
            return Err(UserError::InsufficientPasswordLength);
        }

        let hash = Self::hash_password(new_password)?;

        self.repo.update_password(user.id, hash).await?;

        Ok(())
    }

    pub async fn fetch_user_by_id(&self, user_id: i64) -> Result<User, UserError> {
        self.repo.get_user_by_id(user_id).await.map_err(|e| match e {
            UserRepositoryError::NotFound => UserError::UserNotFound,
            other => UserError::RepositoryError(other),
        })
    }
}
