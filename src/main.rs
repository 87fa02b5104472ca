use std::net::SocketAddr;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use logedin_backend::{
    app_config::AppConfig,
    build_router, initialize_app_state,
    middleware::{dynamic_cors_middleware, CorsPolicy},
    services::initialize_background_tasks,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    let config = AppConfig::from_env().context("Failed to load configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.server.rust_log.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        environment = %config.environment,
        "Starting Loged.in purchase backend"
    );

    let state = initialize_app_state(&config)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to initialize application state: {}", e))?;

    let _sweep = initialize_background_tasks(state.backfill_service.clone(), &config.reconciliation);

    let cors_policy = CorsPolicy::new(config.cors_allowed_origins.clone(), config.is_production());
    let app = build_router(state).layer(axum::middleware::from_fn_with_state(
        cors_policy,
        dynamic_cors_middleware,
    ));

    let addr: SocketAddr = config
        .server
        .bind_address
        .parse()
        .context("Invalid BIND_ADDRESS")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
