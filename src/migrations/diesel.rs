// Diesel migration runner for PostgreSQL
// diesel_migrations requires a sync connection, so it runs on the blocking pool

use crate::db::diesel_pool::MIGRATIONS;
use diesel::Connection;
use diesel::PgConnection;
use diesel_migrations::MigrationHarness;
use std::error::Error;
use tracing::{debug, info};

/// Run all pending Diesel migrations
/// Returns the number of migrations applied
pub async fn run_migrations(database_url: String) -> Result<usize, Box<dyn Error + Send + Sync>> {
    tokio::task::spawn_blocking(move || -> Result<usize, Box<dyn Error + Send + Sync>> {
        let mut conn = PgConnection::establish(&database_url)
            .map_err(|e| format!("Failed to establish sync connection: {}", e))?;

        let pending_count = conn
            .pending_migrations(MIGRATIONS)
            .map_err(|e| format!("Failed to check pending migrations: {}", e))?
            .len();

        if pending_count == 0 {
            debug!("[DIESEL] No pending migrations found");
            return Ok(0);
        }

        info!("[DIESEL] Found {} pending migrations", pending_count);

        let applied = conn
            .run_pending_migrations(MIGRATIONS)
            .map_err(|e| format!("Failed to run migrations: {}", e))?;

        for migration in &applied {
            debug!("[DIESEL] Applied migration: {}", migration);
        }

        Ok(applied.len())
    })
    .await
    .map_err(|e| format!("Migration task panicked: {}", e))?
}
