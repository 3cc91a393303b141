use std::io;
use std::sync::Arc;

use dotenvy::dotenv;
use payment_bridge::config::AppConfig;
use payment_bridge::infrastructure::order_repo::DieselOrderRepository;
use payment_bridge::infrastructure::paytm::PaytmGateway;
use payment_bridge::infrastructure::price_repo::DieselPriceAuthority;
use payment_bridge::infrastructure::user_repo::DieselUserRepository;
use payment_bridge::{build_server, create_pool, run_migrations, AppState, Ports};

fn startup_error(context: &str, e: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, e))
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| startup_error("Invalid configuration", e))?;

    let pool = create_pool(&config.database_url)
        .map_err(|e| startup_error("Failed to create DB pool", e))?;
    run_migrations(&pool).map_err(|e| startup_error("Failed to run database migrations", e))?;

    let gateway = PaytmGateway::new(&config.gateway)
        .map_err(|e| startup_error("Failed to build gateway client", e))?;

    let state = AppState::new(
        Ports {
            prices: Arc::new(DieselPriceAuthority::new(pool.clone())),
            orders: Arc::new(DieselOrderRepository::new(pool.clone())),
            users: Arc::new(DieselUserRepository::new(pool)),
            gateway: Arc::new(gateway),
        },
        config.gateway.merchant_key.clone(),
        config.transition_policy,
        config.redirects.clone(),
    );

    log::info!(
        "Starting server at http://{}:{} (transition policy {:?})",
        config.host,
        config.port,
        config.transition_policy
    );

    build_server(state, &config.host, config.port)?.await?;

    log::info!("Server stopped");
    Ok(())
}
