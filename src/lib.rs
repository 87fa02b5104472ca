// Library exports for the Loged.in purchase backend
// This file exposes modules and functions for the binary and integration tests

pub mod app;
pub mod app_config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod migrations;
pub mod models;
pub mod schema;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use app::{AppState, ServiceSettings};
pub use app_config::AppConfig;
pub use db::{DieselPool, EntitlementStore, InMemoryEntitlementStore, PostgresEntitlementStore};
pub use models::{EntitlementStatus, Purchase};
pub use services::{PaymentProvider, StripeClient};
pub use utils::PurchaseError;

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use tower_http::trace::TraceLayer;

// Library initialization: pool, migrations, Stripe client, services
pub async fn initialize_app_state(
    config: &AppConfig,
) -> Result<AppState, Box<dyn std::error::Error + Send + Sync>> {
    use tracing::info;

    info!("Initializing database pool...");
    let db_config = db::DieselDatabaseConfig::from_app_config(config);
    let diesel_pool = db::create_diesel_pool(db_config).await?;

    if migrations::should_run_migrations(config) {
        info!("Running embedded migrations...");
        migrations::run_migrations(&config.database.url)
            .await
            .map_err(|e| format!("Migration failed: {}", e))?;
    }

    let store: Arc<dyn EntitlementStore> = Arc::new(PostgresEntitlementStore::new(diesel_pool));
    let provider: Arc<dyn PaymentProvider> = Arc::new(StripeClient::new(&config.stripe)?);

    Ok(AppState::new(
        store,
        provider,
        ServiceSettings::from_config(config),
    ))
}

/// All routes with request tracing; CORS is layered on by the binary
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/docs/openapi.json", get(handlers::docs::serve_openapi_spec))
        .merge(handlers::purchase_routes())
        .merge(handlers::entitlement_routes())
        .merge(handlers::account_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Health check handler
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let timestamp = chrono::Utc::now().to_rfc3339();

    let (healthy, store_health) = match state.store.health_check().await {
        Ok(()) => (
            true,
            serde_json::json!({ "status": "healthy", "error": null }),
        ),
        Err(e) => {
            tracing::error!("Entitlement store health check failed: {}", e);
            (
                false,
                serde_json::json!({ "status": "unhealthy", "error": "store unavailable" }),
            )
        },
    };

    let response = serde_json::json!({
        "status": if healthy { "healthy" } else { "degraded" },
        "service": "logedin-backend",
        "timestamp": timestamp,
        "components": {
            "entitlement_store": store_health
        }
    });

    if healthy {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}
