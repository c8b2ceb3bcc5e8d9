#[macro_use]
extern crate log;

use clap::Parser;
use ichiba::{
    domain::services::{
        order::OrderService, product::ProductService, stock::StockService, user::UserService,
    },
    infrastructure::{
        config::Config,
        database,
        domain::repositories::{
            order::OrderRepositoryImpl, product::ProductRepositoryImpl,
            stock::StockRepositoryImpl, user::UserRepositoryImpl,
        },
    },
    presentation::ServerBuilder,
};

#[derive(Parser)]
struct Opts {
    /// Path to config file
    #[clap(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    env_logger::init_from_env(env_logger::Env::new().filter_or("ICHIBA_LOG", "info"));

    let opts: Opts = Opts::parse();
    let config = Config::open(opts.config)?;

    debug!("config: {:?}", config);

    let pool = database::establish_connection(&config.database_path, config.create_database).await?;

    let user_svc = UserService::new(UserRepositoryImpl::new(pool.clone()));
    let product_svc = ProductService::new(ProductRepositoryImpl::new(pool.clone()));
    let stock_svc = StockService::new(StockRepositoryImpl::new(pool.clone()));
    let order_svc = OrderService::new(OrderRepositoryImpl::new(pool.clone()));

    let server = ServerBuilder::new()
        .with_config(config.clone())
        .with_user_svc(user_svc)
        .with_product_svc(product_svc)
        .with_stock_svc(stock_svc)
        .with_order_svc(order_svc)
        .build()?;

    let server_fut = server.serve(([0, 0, 0, 0], config.port));

    tokio::select! {
        res = server_fut => {
            if let Err(e) = res {
                error!("server error: {e}");
            }
            info!("server shutdown");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("ctrl+c signal");
        }
    }

    info!("closing database...");
    pool.close().await;

    Ok(())
}
