pub mod auth;
pub mod health;
pub mod inventory;
pub mod orders;
pub mod products;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::domain::{
    repositories::{
        order::OrderRepositoryError, product::ProductRepositoryError, stock::StockRepositoryError,
        user::UserRepositoryError,
    },
    services::{
        order::OrderError, product::ProductError, stock::StockError, user::UserError,
    },
};

/// JSON error response. Storage failures are logged and surfaced as an
/// opaque 500 so internals never leak into a response body.
pub struct ApiError {
    status: StatusCode,
    body: Value,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden")
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
    }

    fn storage(err: impl std::fmt::Display) -> Self {
        error!("storage failure: {err}");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "storage failure")
    }

    fn insufficient_stock(product_id: i64, requested: i64, available: i64) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            body: json!({
                "error": format!(
                    "insufficient stock for product {product_id}: requested {requested}, available {available}"
                ),
                "product_id": product_id,
                "requested": requested,
                "available": available,
            }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<StockRepositoryError> for ApiError {
    fn from(err: StockRepositoryError) -> Self {
        match err {
            StockRepositoryError::NotFound(id) => {
                Self::new(StatusCode::NOT_FOUND, format!("no stock record for product {id}"))
            }
            StockRepositoryError::InsufficientStock {
                product_id,
                requested,
                available,
            } => Self::insufficient_stock(product_id, requested, available),
            StockRepositoryError::DbError(e) => Self::storage(e),
        }
    }
}

impl From<StockError> for ApiError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::NonPositiveAmount
            | StockError::NegativeQuantity
            | StockError::EmptyBatch => Self::new(StatusCode::BAD_REQUEST, err.to_string()),
            StockError::RepositoryError(repo) => repo.into(),
        }
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::UserNotFound => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            UserError::WrongPassword => Self::unauthorized(err.to_string()),
            UserError::EmailTaken => Self::new(StatusCode::CONFLICT, err.to_string()),
            UserError::InsufficientPasswordLength => {
                Self::new(StatusCode::BAD_REQUEST, err.to_string())
            }
            UserError::RepositoryError(UserRepositoryError::NotFound) => {
                Self::new(StatusCode::NOT_FOUND, "user not found")
            }
            UserError::RepositoryError(UserRepositoryError::EmailTaken) => {
                Self::new(StatusCode::CONFLICT, "email already registered")
            }
            UserError::RepositoryError(UserRepositoryError::DbError(e)) => Self::storage(e),
            UserError::Other(e) => {
                error!("user service failure: {e}");
                Self::internal()
            }
        }
    }
}

impl From<ProductError> for ApiError {
    fn from(err: ProductError) -> Self {
        match err {
            ProductError::ProductNotFound => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            ProductError::NegativePrice | ProductError::EmptyName => {
                Self::new(StatusCode::BAD_REQUEST, err.to_string())
            }
            ProductError::RepositoryError(ProductRepositoryError::NotFound) => {
                Self::new(StatusCode::NOT_FOUND, "product not found")
            }
            ProductError::RepositoryError(ProductRepositoryError::DbError(e)) => Self::storage(e),
        }
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::EmptyOrder | OrderError::NonPositiveQuantity => {
                Self::new(StatusCode::BAD_REQUEST, err.to_string())
            }
            OrderError::OrderNotFound => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            OrderError::Forbidden => Self::forbidden(),
            OrderError::RepositoryError(repo) => match repo {
                OrderRepositoryError::NotFound => {
                    Self::new(StatusCode::NOT_FOUND, "order not found")
                }
                OrderRepositoryError::UnknownProduct(id) => {
                    Self::new(StatusCode::BAD_REQUEST, format!("unknown product {id}"))
                }
                OrderRepositoryError::Stock(stock) => stock.into(),
                OrderRepositoryError::DbError(e) => Self::storage(e),
            },
        }
    }
}
