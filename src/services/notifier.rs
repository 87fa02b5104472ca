// In-process change feed for entitlement rows
// Every write path publishes here; subscribers filter by user id.

use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::Purchase;

const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Inserted,
    Updated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntitlementChange {
    pub user_id: Uuid,
    pub kind: ChangeKind,
    pub record: Purchase,
}

impl EntitlementChange {
    pub fn inserted(record: Purchase) -> Self {
        Self {
            user_id: record.user_id,
            kind: ChangeKind::Inserted,
            record,
        }
    }

    pub fn updated(record: Purchase) -> Self {
        Self {
            user_id: record.user_id,
            kind: ChangeKind::Updated,
            record,
        }
    }
}

#[derive(Debug, Clone)]
pub struct EntitlementNotifier {
    sender: broadcast::Sender<EntitlementChange>,
}

impl Default for EntitlementNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl EntitlementNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Fan a change out to current subscribers. No subscribers is not an error.
    pub fn publish(&self, change: EntitlementChange) {
        let user_id = change.user_id;
        let kind = change.kind;
        match self.sender.send(change) {
            Ok(receivers) => debug!(%user_id, ?kind, receivers, "Entitlement change published"),
            Err(_) => debug!(%user_id, ?kind, "Entitlement change published with no subscribers"),
        }
    }

    pub fn subscribe(&self, user_id: Uuid) -> EntitlementSubscription {
        EntitlementSubscription {
            user_id,
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubscriptionEvent {
    Changed(EntitlementChange),
    /// Changes were dropped; the subscriber must re-read from the store
    Resync,
}

/// Change feed scoped to one user. Dropping it releases the subscription.
#[derive(Debug)]
pub struct EntitlementSubscription {
    user_id: Uuid,
    receiver: broadcast::Receiver<EntitlementChange>,
}

impl EntitlementSubscription {
    /// Next event for this user, or `None` once the notifier is gone
    pub async fn next(&mut self) -> Option<SubscriptionEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(change) if change.user_id == self.user_id => {
                    return Some(SubscriptionEvent::Changed(change));
                },
                Ok(_) => continue,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(user_id = %self.user_id, skipped, "Entitlement subscriber lagged");
                    return Some(SubscriptionEvent::Resync);
                },
                Err(RecvError::Closed) => return None,
            }
        }
    }
}
