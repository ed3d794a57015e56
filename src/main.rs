use std::net::SocketAddr;
use std::sync::Arc;

use storefront_backend::api::{self, AppState};
use storefront_backend::config::AppConfig;
use storefront_backend::fulfillment::FulfillmentDispatcher;
use storefront_backend::gateway::{ChecksumSigner, PhonePeClient};
use storefront_backend::health::HealthChecker;
use storefront_backend::ledger::{init_pool_from_config, PgOrderStore, PgProductStore};
use storefront_backend::logging::init_tracing;
use storefront_backend::middleware::logging::{request_logging_middleware, UuidRequestId};
use storefront_backend::notify::{OneSignalPusher, SendGridMailer};
use storefront_backend::reconcile::ReconciliationEngine;

use tokio::signal;
use tower::ServiceBuilder;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tracing::{error, info};

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env()?;
    config.validate()?;

    init_tracing(&config.logging);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting storefront backend service"
    );

    let db_pool = init_pool_from_config(&config.database).await.map_err(|e| {
        error!("Failed to initialize database pool: {}", e);
        anyhow::anyhow!(e)
    })?;

    let orders = Arc::new(PgOrderStore::new(db_pool.clone()));
    let products = Arc::new(PgProductStore::new(db_pool.clone()));

    let gateway =
        Arc::new(PhonePeClient::new(config.gateway.clone()).map_err(|e| anyhow::anyhow!(e))?);
    let mailer = Arc::new(SendGridMailer::new(&config.notify).map_err(|e| anyhow::anyhow!(e))?);
    let pusher = Arc::new(OneSignalPusher::new(&config.notify).map_err(|e| anyhow::anyhow!(e))?);

    let fulfillment = Arc::new(FulfillmentDispatcher::new(products, mailer, pusher));

    let callback_signer = if config.gateway.verify_callbacks {
        Some(
            ChecksumSigner::new(
                config.gateway.salt_key.clone(),
                config.gateway.salt_index.clone(),
            )
            .map_err(|e| anyhow::anyhow!(e))?,
        )
    } else {
        None
    };

    let engine = Arc::new(ReconciliationEngine::new(
        orders,
        gateway,
        fulfillment,
        callback_signer,
    ));

    let state = AppState {
        engine,
        health: HealthChecker::new(db_pool),
    };

    let app = api::router(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
            .layer(axum::middleware::from_fn(request_logging_middleware))
            .layer(PropagateRequestIdLayer::x_request_id()),
    );

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!("Failed to bind {}: {}", addr, e);
        anyhow::anyhow!(e)
    })?;

    info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
