// Entitlement reads for the client: one-shot queries and a live watcher

use std::sync::Arc;

use tracing::{debug, error};
use uuid::Uuid;

use crate::db::{EntitlementStore, StoreError};
use crate::models::EntitlementStatus;
use crate::services::notifier::{EntitlementNotifier, EntitlementSubscription, SubscriptionEvent};

#[derive(Clone)]
pub struct EntitlementReader {
    store: Arc<dyn EntitlementStore>,
    notifier: EntitlementNotifier,
}

impl EntitlementReader {
    pub fn new(store: Arc<dyn EntitlementStore>, notifier: EntitlementNotifier) -> Self {
        Self { store, notifier }
    }

    /// Strict read; store failures surface to the caller
    pub async fn fetch(&self, user_id: Uuid) -> Result<EntitlementStatus, StoreError> {
        let record = self.store.find_active_for_user(user_id).await?;
        Ok(EntitlementStatus::from_record(record))
    }

    /// Fail-safe read: any store failure reads as "not entitled"
    pub async fn status(&self, user_id: Uuid) -> EntitlementStatus {
        match self.fetch(user_id).await {
            Ok(status) => status,
            Err(e) => {
                error!(%user_id, error = %e, "Entitlement lookup failed, reporting inactive");
                EntitlementStatus::none()
            },
        }
    }

    pub fn subscribe(&self, user_id: Uuid) -> EntitlementSubscription {
        self.notifier.subscribe(user_id)
    }

    /// Subscribes before the first read so no change can slip between them
    pub fn watch(&self, user_id: Uuid) -> EntitlementWatcher {
        EntitlementWatcher {
            user_id,
            subscription: self.subscribe(user_id),
            reader: self.clone(),
            last_known: None,
        }
    }
}

/// Keeps the last known entitlement for one user and refreshes it when the
/// store reports a change.
pub struct EntitlementWatcher {
    user_id: Uuid,
    reader: EntitlementReader,
    subscription: EntitlementSubscription,
    last_known: Option<EntitlementStatus>,
}

impl EntitlementWatcher {
    pub fn last_known(&self) -> Option<&EntitlementStatus> {
        self.last_known.as_ref()
    }

    /// Forget the cached value; the next `current` call re-reads
    pub fn invalidate(&mut self) {
        self.last_known = None;
    }

    pub async fn current(&mut self) -> EntitlementStatus {
        match &self.last_known {
            Some(status) => status.clone(),
            None => self.refresh().await,
        }
    }

    pub async fn refresh(&mut self) -> EntitlementStatus {
        let status = self.reader.status(self.user_id).await;
        self.last_known = Some(status.clone());
        status
    }

    /// Wait for the next change that alters the visible entitlement.
    /// Returns `None` when the change feed closes.
    pub async fn next_change(&mut self) -> Option<EntitlementStatus> {
        loop {
            let previous = self.last_known.clone();
            match self.subscription.next().await? {
                SubscriptionEvent::Changed(change) => {
                    debug!(user_id = %self.user_id, kind = ?change.kind, "Entitlement changed");
                },
                SubscriptionEvent::Resync => {
                    debug!(user_id = %self.user_id, "Entitlement feed lagged, re-reading");
                },
            }

            let status = self.refresh().await;
            if previous.as_ref() != Some(&status) {
                return Some(status);
            }
        }
    }
}
