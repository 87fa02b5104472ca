// Migration orchestrator
// Diesel migrations are embedded in the binary for distroless container compatibility

pub mod diesel;

use crate::app_config::AppConfig;
use std::error::Error;
use tracing::{error, info};

/// Whether embedded migrations should run at startup
pub fn should_run_migrations(config: &AppConfig) -> bool {
    if config.disable_embedded_migrations {
        info!("[MIGRATIONS] Embedded migrations disabled by DISABLE_EMBEDDED_MIGRATIONS");
        return false;
    }
    true
}

/// Apply pending PostgreSQL migrations
pub async fn run_migrations(database_url: &str) -> Result<usize, Box<dyn Error + Send + Sync>> {
    info!("[MIGRATIONS] Running Diesel (PostgreSQL) migrations...");
    match diesel::run_migrations(database_url.to_string()).await {
        Ok(applied_count) => {
            if applied_count > 0 {
                info!("[MIGRATIONS] Applied {} Diesel migrations", applied_count);
            } else {
                info!("[MIGRATIONS] Diesel migrations up to date");
            }
            Ok(applied_count)
        },
        Err(e) => {
            error!("[MIGRATIONS] Diesel migration failed: {}", e);
            Err(format!("Diesel migration failed: {}", e).into())
        },
    }
}
