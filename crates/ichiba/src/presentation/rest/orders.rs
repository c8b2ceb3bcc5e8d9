use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::{
    domain::{
        entities::order::{Order, OrderItem, OrderLine},
        services::order::OrderService,
    },
    infrastructure::domain::repositories::order::OrderRepositoryImpl,
    presentation::token::AuthUser,
};

#[derive(Deserialize)]
pub struct PlaceOrderRequest {
    items: Vec<OrderLine>,
}

#[derive(Serialize)]
pub struct OrderResponse {
    #[serde(flatten)]
    order: Order,
    items: Vec<OrderItem>,
}

pub async fn place(
    AuthUser(claims): AuthUser,
    Extension(order_svc): Extension<OrderService<OrderRepositoryImpl>>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let (order, items) = order_svc.place_order(claims.id, &req.items).await?;

    Ok((StatusCode::CREATED, Json(OrderResponse { order, items })))
}

pub async fn list(
    AuthUser(claims): AuthUser,
    Extension(order_svc): Extension<OrderService<OrderRepositoryImpl>>,
) -> Result<Json<Vec<Order>>, ApiError> {
    let orders = order_svc.fetch_orders_for(claims.id, claims.is_admin()).await?;

    Ok(Json(orders))
}

pub async fn get(
    AuthUser(claims): AuthUser,
    Path(id): Path<i64>,
    Extension(order_svc): Extension<OrderService<OrderRepositoryImpl>>,
) -> Result<Json<OrderResponse>, ApiError> {
    let (order, items) = order_svc.fetch_order(id, claims.id, claims.is_admin()).await?;

    Ok(Json(OrderResponse { order, items }))
}
