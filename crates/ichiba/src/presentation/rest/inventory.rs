use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::{
    domain::{
        entities::{
            order::OrderLine,
            stock::{LedgerEntry, LedgerOrder, StockRecord},
        },
        services::stock::StockService,
    },
    infrastructure::domain::repositories::stock::StockRepositoryImpl,
    presentation::token::AdminUser,
};

fn default_reason() -> String {
    "manual adjustment".to_string()
}

#[derive(Deserialize)]
pub struct AdjustmentRequest {
    amount: i64,
    #[serde(default = "default_reason")]
    reason: String,
}

#[derive(Deserialize)]
pub struct SetValueRequest {
    value: i64,
    #[serde(default = "default_reason")]
    reason: String,
}

#[derive(Deserialize)]
pub struct BatchDecrementRequest {
    items: Vec<OrderLine>,
    #[serde(default = "default_reason")]
    reason: String,
}

#[derive(Deserialize, Default, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum LedgerOrderParam {
    Asc,
    #[default]
    Desc,
}

impl From<LedgerOrderParam> for LedgerOrder {
    fn from(param: LedgerOrderParam) -> Self {
        match param {
            LedgerOrderParam::Asc => Self::OldestFirst,
            LedgerOrderParam::Desc => Self::NewestFirst,
        }
    }
}

#[derive(Deserialize, Default)]
pub struct LedgerParams {
    #[serde(default)]
    order: LedgerOrderParam,
}

#[derive(Serialize)]
pub struct QuantityResponse {
    product_id: i64,
    quantity: i64,
}

#[derive(Serialize)]
pub struct MinQuantityResponse {
    product_id: i64,
    min_quantity: i64,
}

pub async fn get_stock(
    _admin: AdminUser,
    Path(product_id): Path<i64>,
    Extension(stock_svc): Extension<StockService<StockRepositoryImpl>>,
) -> Result<Json<StockRecord>, ApiError> {
    let record = stock_svc
        .fetch_record(product_id)
        .await?
        .ok_or_else(|| {
            ApiError::new(
                StatusCode::NOT_FOUND,
                format!("no stock record for product {product_id}"),
            )
        })?;

    Ok(Json(record))
}

pub async fn increment(
    AdminUser(claims): AdminUser,
    Path(product_id): Path<i64>,
    Extension(stock_svc): Extension<StockService<StockRepositoryImpl>>,
    Json(req): Json<AdjustmentRequest>,
) -> Result<Json<QuantityResponse>, ApiError> {
    let quantity = stock_svc
        .increment(product_id, req.amount, &req.reason, claims.id)
        .await?;

    Ok(Json(QuantityResponse { product_id, quantity }))
}

pub async fn decrement(
    AdminUser(claims): AdminUser,
    Path(product_id): Path<i64>,
    Extension(stock_svc): Extension<StockService<StockRepositoryImpl>>,
    Json(req): Json<AdjustmentRequest>,
) -> Result<Json<QuantityResponse>, ApiError> {
    let quantity = stock_svc
        .decrement(product_id, req.amount, &req.reason, claims.id)
        .await?;

    Ok(Json(QuantityResponse { product_id, quantity }))
}

pub async fn set_quantity(
    AdminUser(claims): AdminUser,
    Path(product_id): Path<i64>,
    Extension(stock_svc): Extension<StockService<StockRepositoryImpl>>,
    Json(req): Json<SetValueRequest>,
) -> Result<Json<QuantityResponse>, ApiError> {
    let quantity = stock_svc
        .set_quantity(product_id, req.value, &req.reason, claims.id)
        .await?;

    Ok(Json(QuantityResponse { product_id, quantity }))
}

pub async fn set_min_quantity(
    AdminUser(claims): AdminUser,
    Path(product_id): Path<i64>,
    Extension(stock_svc): Extension<StockService<StockRepositoryImpl>>,
    Json(req): Json<SetValueRequest>,
) -> Result<Json<MinQuantityResponse>, ApiError> {
    let min_quantity = stock_svc
        .set_min_quantity(product_id, req.value, &req.reason, claims.id)
        .await?;

    Ok(Json(MinQuantityResponse {
        product_id,
        min_quantity,
    }))
}

pub async fn decrement_batch(
    AdminUser(claims): AdminUser,
    Extension(stock_svc): Extension<StockService<StockRepositoryImpl>>,
    Json(req): Json<BatchDecrementRequest>,
) -> Result<StatusCode, ApiError> {
    stock_svc
        .decrement_batch(&req.items, &req.reason, claims.id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn ledger(
    _admin: AdminUser,
    Path(product_id): Path<i64>,
    Query(params): Query<LedgerParams>,
    Extension(stock_svc): Extension<StockService<StockRepositoryImpl>>,
) -> Result<Json<Vec<LedgerEntry>>, ApiError> {
    let entries = stock_svc.fetch_history(product_id, params.order.into()).await?;

    Ok(Json(entries))
}
