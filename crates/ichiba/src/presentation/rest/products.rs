use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use super::ApiError;
use crate::{
    domain::{
        entities::product::{NewProduct, Product},
        services::product::ProductService,
    },
    infrastructure::domain::repositories::product::ProductRepositoryImpl,
    presentation::token::AdminUser,
};

#[derive(Deserialize)]
pub struct ProductPayload {
    name: String,
    #[serde(default)]
    description: String,
    price_cents: i64,
}

impl From<ProductPayload> for NewProduct {
    fn from(payload: ProductPayload) -> Self {
        Self {
            name: payload.name,
            description: payload.description,
            price_cents: payload.price_cents,
        }
    }
}

pub async fn list(
    Extension(product_svc): Extension<ProductService<ProductRepositoryImpl>>,
) -> Result<Json<Vec<Product>>, ApiError> {
    Ok(Json(product_svc.fetch_products().await?))
}

pub async fn get(
    Path(id): Path<i64>,
    Extension(product_svc): Extension<ProductService<ProductRepositoryImpl>>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(product_svc.fetch_product(id).await?))
}

pub async fn create(
    _admin: AdminUser,
    Extension(product_svc): Extension<ProductService<ProductRepositoryImpl>>,
    Json(payload): Json<ProductPayload>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    let product = product_svc.create_product(payload.into()).await?;

    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update(
    _admin: AdminUser,
    Path(id): Path<i64>,
    Extension(product_svc): Extension<ProductService<ProductRepositoryImpl>>,
    Json(payload): Json<ProductPayload>,
) -> Result<Json<Product>, ApiError> {
    Ok(Json(product_svc.update_product(id, payload.into()).await?))
}

pub async fn remove(
    _admin: AdminUser,
    Path(id): Path<i64>,
    Extension(product_svc): Extension<ProductService<ProductRepositoryImpl>>,
) -> Result<StatusCode, ApiError> {
    product_svc.delete_product(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
