use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::prelude::*;

use rustfolio::application::{PortfolioService, PriceUpdater};
use rustfolio::config::{Config, DbDriver};
use rustfolio::infrastructure::marketdata;
use rustfolio::infrastructure::persistence::{
    Database, Dialect, MySqlDialect, PostgresDialect, SqlPortfolioRepository,
};
use rustfolio::interfaces::http::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = Config::from_env().context("failed to load configuration")?;

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .with(stdout_layer)
        .init();

    info!("Rustfolio {} starting...", env!("CARGO_PKG_VERSION"));

    let market_data = marketdata::create_provider(&config);
    info!(provider = ?config.market_data_provider, "Using market data provider");

    let dialect: Arc<dyn Dialect> = match config.db_driver {
        DbDriver::Postgres => Arc::new(PostgresDialect),
        DbDriver::MySql => Arc::new(MySqlDialect),
    };
    let database = Database::connect(&config.db_dsn, dialect)
        .await
        .context("failed to connect database")?;
    database.migrate().await.context("failed to migrate database")?;

    let repo = Arc::new(SqlPortfolioRepository::new(database));
    let service = Arc::new(
        PortfolioService::new(repo, market_data)
            .await
            .context("failed to create portfolio service")?,
    );

    let updater = PriceUpdater::new(Arc::clone(&service), config.price_refresh_interval).start();

    let state = Arc::new(AppState { service });
    let router = http::router(state);

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    updater.stop().await;
    info!("Server exited gracefully");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Received shutdown signal");
}
