use axum::{extract::Extension, Json};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::{
    domain::{
        entities::user::{Role, User},
        services::user::{UserError, UserService},
    },
    infrastructure::{
        auth::{self, Claims},
        config::Config,
        domain::repositories::user::UserRepositoryImpl,
    },
    presentation::token::AuthUser,
};

#[derive(Deserialize)]
pub struct RegisterRequest {
    name: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    old_password: String,
    new_password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    token: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    id: i64,
    name: String,
    email: String,
    role: Role,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            role: user.role,
        }
    }
}

pub async fn register(
    Extension(user_svc): Extension<UserService<UserRepositoryImpl>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = user_svc.register(&req.name, &req.email, &req.password).await?;

    Ok(Json(user.into()))
}

pub async fn login(
    Extension(config): Extension<Config>,
    Extension(user_svc): Extension<UserService<UserRepositoryImpl>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = user_svc
        .authenticate(&req.email, &req.password)
        .await
        .map_err(|err| match err {
            // One answer for both, so login can't be used to probe accounts.
            UserError::UserNotFound | UserError::WrongPassword => {
                ApiError::unauthorized("invalid credentials")
            }
            other => other.into(),
        })?;

    let claims = Claims::new(&user, config.token_ttl_seconds);
    let token = auth::encode_token(&config.secret, &claims).map_err(|_| ApiError::internal())?;

    Ok(Json(TokenResponse { token }))
}

pub async fn me(
    AuthUser(claims): AuthUser,
    Extension(user_svc): Extension<UserService<UserRepositoryImpl>>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = user_svc.fetch_user_by_id(claims.id).await?;

    Ok(Json(user.into()))
}

pub async fn change_password(
    AuthUser(claims): AuthUser,
    Extension(user_svc): Extension<UserService<UserRepositoryImpl>>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    user_svc
        .change_password(claims.id, &req.old_password, &req.new_password)
        .await?;

    let user = user_svc.fetch_user_by_id(claims.id).await?;

    Ok(Json(user.into()))
}
