pub mod rest;
pub mod token;

use anyhow::anyhow;
use axum::{
    extract::Extension,
    routing::{get, post, put},
    Router,
};
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};

use crate::{
    domain::services::{
        order::OrderService, product::ProductService, stock::StockService, user::UserService,
    },
    infrastructure::{
        config::Config,
        domain::repositories::{
            order::OrderRepositoryImpl, product::ProductRepositoryImpl,
            stock::StockRepositoryImpl, user::UserRepositoryImpl,
        },
    },
};
use self::rest::{auth, health::health_check, inventory, orders, products};

pub struct ServerBuilder {
    config: Option<Config>,
    user_svc: Option<UserService<UserRepositoryImpl>>,
    product_svc: Option<ProductService<ProductRepositoryImpl>>,
    stock_svc: Option<StockService<StockRepositoryImpl>>,
    order_svc: Option<OrderService<OrderRepositoryImpl>>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            user_svc: None,
            product_svc: None,
            stock_svc: None,
            order_svc: None,
        }
    }

    pub fn with_config(self, config: Config) -> Self {
        Self {
            config: Some(config),
            ..self
        }
    }

    pub fn with_user_svc(self, user_svc: UserService<UserRepositoryImpl>) -> Self {
        Self {
            user_svc: Some(user_svc),
            ..self
        }
    }

    pub fn with_product_svc(self, product_svc: ProductService<ProductRepositoryImpl>) -> Self {
        Self {
            product_svc: Some(product_svc),
            ..self
        }
    }

    pub fn with_stock_svc(self, stock_svc: StockService<StockRepositoryImpl>) -> Self {
        Self {
            stock_svc: Some(stock_svc),
            ..self
        }
    }

    pub fn with_order_svc(self, order_svc: OrderService<OrderRepositoryImpl>) -> Self {
        Self {
            order_svc: Some(order_svc),
            ..self
        }
    }

    pub fn build(self) -> Result<Server, anyhow::Error> {
        let config = self.config.ok_or_else(|| anyhow!("no config"))?;
        let user_svc = self.user_svc.ok_or_else(|| anyhow!("no user service"))?;
        let product_svc = self.product_svc.ok_or_else(|| anyhow!("no product service"))?;
        let stock_svc = self.stock_svc.ok_or_else(|| anyhow!("no stock service"))?;
        let order_svc = self.order_svc.ok_or_else(|| anyhow!("no order service"))?;

        Ok(Server::new(config, user_svc, product_svc, stock_svc, order_svc))
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Server {
    router: Router,
}

impl Server {
    pub fn new(
        config: Config,
        user_svc: UserService<UserRepositoryImpl>,
        product_svc: ProductService<ProductRepositoryImpl>,
        stock_svc: StockService<StockRepositoryImpl>,
        order_svc: OrderService<OrderRepositoryImpl>,
    ) -> Self {
        let router = Router::new()
            .route("/health", get(health_check))
            .route("/api/auth/register", post(auth::register))
            .route("/api/auth/login", post(auth::login))
            .route("/api/auth/me", get(auth::me))
            .route("/api/auth/password", put(auth::change_password))
            .route("/api/products", get(products::list).post(products::create))
            .route(
                "/api/products/{id}",
                get(products::get).put(products::update).delete(products::remove),
            )
            .route("/api/inventory/decrements", post(inventory::decrement_batch))
            .route("/api/inventory/{product_id}", get(inventory::get_stock))
            .route("/api/inventory/{product_id}/increment", post(inventory::increment))
            .route("/api/inventory/{product_id}/decrement", post(inventory::decrement))
            .route("/api/inventory/{product_id}/quantity", put(inventory::set_quantity))
            .route(
                "/api/inventory/{product_id}/min-quantity",
                put(inventory::set_min_quantity),
            )
            .route("/api/inventory/{product_id}/ledger", get(inventory::ledger))
            .route("/api/orders", get(orders::list).post(orders::place))
            .route("/api/orders/{id}", get(orders::get))
            .layer(Extension(config))
            .layer(Extension(user_svc))
            .layer(Extension(product_svc))
            .layer(Extension(stock_svc))
            .layer(Extension(order_svc))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );

        Self { router }
    }

    pub async fn serve<A: Into<SocketAddr>>(self, addr: A) -> Result<(), anyhow::Error> {
        axum_server::bind(addr.into())
            .serve(self.router.into_make_service())
            .await?;

        Ok(())
    }
}
