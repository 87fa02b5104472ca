// Background task scheduler
// Runs the periodic reconciliation sweep that catches missed webhooks

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::app_config::ReconciliationConfig;
use crate::services::backfill::BackfillService;

const DEFAULT_LOOKBACK_HOURS: i64 = 48;

/// Background task manager for reconciliation
pub struct BackgroundTaskManager {
    backfill: Arc<BackfillService>,
    interval: Duration,
    lookback: chrono::Duration,
}

impl BackgroundTaskManager {
    pub fn new(backfill: Arc<BackfillService>, config: &ReconciliationConfig) -> Self {
        Self {
            backfill,
            interval: Duration::from_secs(config.sweep_interval_secs),
            lookback: config.lookback().unwrap_or_else(|| {
                warn!(
                    lookback_hours = config.lookback_hours,
                    "Sweep lookback out of range, using {} hours", DEFAULT_LOOKBACK_HOURS
                );
                chrono::Duration::hours(DEFAULT_LOOKBACK_HOURS)
            }),
        }
    }

    /// Start the sweep loop; `None` when the interval is zero
    pub fn start_all_tasks(self) -> Option<JoinHandle<()>> {
        if self.interval.is_zero() {
            info!("Reconciliation sweep disabled");
            return None;
        }

        info!(
            interval_secs = self.interval.as_secs(),
            lookback_hours = self.lookback.num_hours(),
            "Starting reconciliation sweep"
        );

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick fires immediately; let startup settle
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if let Err(e) = self.backfill.sweep(self.lookback).await {
                    error!(error = %e, "Reconciliation sweep failed");
                }
            }
        }))
    }
}

/// Initialize background tasks (call this in main.rs)
pub fn initialize_background_tasks(
    backfill: Arc<BackfillService>,
    config: &ReconciliationConfig,
) -> Option<JoinHandle<()>> {
    BackgroundTaskManager::new(backfill, config).start_all_tasks()
}
