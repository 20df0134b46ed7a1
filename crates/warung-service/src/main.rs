//! Storefront service binary.
//!
//! Wires the RocksDB ledger, the QRIS gateway client, and the notifier
//! into the axum router and serves it.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use warung_service::{create_router, AppState, ServiceConfig};
use warung_store::RocksStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,warung=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServiceConfig::from_env();
    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        gateway_configured = %config.gateway_base_url.is_some(),
        bot_configured = %config.bot_token.is_some(),
        "Starting warung storefront service"
    );

    let store = Arc::new(RocksStore::open(&config.data_dir)?);
    let state = AppState::new(store, config.clone());
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(listen_addr = %config.listen_addr, "Listening");
    axum::serve(listener, app).await?;

    Ok(())
}
