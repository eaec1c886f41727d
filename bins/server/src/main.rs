//! Claimflow API Server
//!
//! Main entry point for the expense approval service.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use claimflow_api::{AppState, create_router, services::ExchangeRateClient};
use claimflow_db::{DbAuditSink, connect_with_pool};
use claimflow_shared::{AppConfig, JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "claimflow=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;

    let db = connect_with_pool(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;
    info!(
        max_connections = config.database.max_connections,
        "Connected to database"
    );

    let jwt_service = JwtService::new(JwtConfig::from(&config.jwt));

    let currency = ExchangeRateClient::new(
        &config.currency.api_base_url,
        Duration::from_secs(config.currency.timeout_secs),
        Duration::from_secs(config.currency.cache_ttl_secs),
    );
    info!(
        api_base_url = %config.currency.api_base_url,
        cache_ttl_secs = config.currency.cache_ttl_secs,
        "Exchange rate client configured"
    );

    let state = AppState {
        audit: Arc::new(DbAuditSink::new(db.clone())),
        db: Arc::new(db),
        jwt_service: Arc::new(jwt_service),
        currency: Arc::new(currency),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
