// Account deletion support: soft revocation of entitlements
// Rows stay for accounting; only their status flips to inactive.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::db::EntitlementStore;
use crate::models::Purchase;
use crate::services::notifier::{EntitlementChange, EntitlementNotifier};
use crate::utils::audit_logger::{AuditAction, AuditLogger};
use crate::utils::purchase_errors::PurchaseError;

pub struct AccountService {
    store: Arc<dyn EntitlementStore>,
    notifier: EntitlementNotifier,
}

impl AccountService {
    pub fn new(store: Arc<dyn EntitlementStore>, notifier: EntitlementNotifier) -> Self {
        Self { store, notifier }
    }

    /// Deactivate every active entitlement the user holds
    pub async fn revoke_entitlements(&self, user_id: Uuid) -> Result<Vec<Purchase>, PurchaseError> {
        let revoked = self.store.deactivate_for_user(user_id).await?;

        for purchase in &revoked {
            AuditLogger::log_entitlement_action(
                AuditAction::EntitlementRevoked,
                Some(user_id),
                Some(&purchase.payment_reference),
                Some("account deleted".to_string()),
            );
            self.notifier.publish(EntitlementChange::updated(purchase.clone()));
        }

        info!(%user_id, revoked = revoked.len(), "Entitlements revoked for deleted account");
        Ok(revoked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryEntitlementStore;
    use crate::models::NewPurchase;
    use crate::services::notifier::{ChangeKind, SubscriptionEvent};

    #[tokio::test]
    async fn test_revocation_is_soft_and_notified() {
        let store = Arc::new(InMemoryEntitlementStore::new());
        let notifier = EntitlementNotifier::default();
        let service = AccountService::new(store.clone(), notifier.clone());
        let user_id = Uuid::new_v4();

        store
            .insert_if_absent(NewPurchase::lifetime_pro(
                user_id,
                "pi_1".into(),
                None,
                3900,
                "usd".into(),
                None,
            ))
            .await
            .unwrap();
        let mut feed = notifier.subscribe(user_id);

        let revoked = service.revoke_entitlements(user_id).await.unwrap();
        assert_eq!(revoked.len(), 1);

        // Row survives, just inactive
        assert_eq!(store.len().await, 1);
        assert!(store.find_active_for_user(user_id).await.unwrap().is_none());

        match feed.next().await {
            Some(SubscriptionEvent::Changed(change)) => assert_eq!(change.kind, ChangeKind::Updated),
            other => panic!("unexpected event: {:?}", other),
        }

        // Second deletion has nothing left to revoke
        assert!(service.revoke_entitlements(user_id).await.unwrap().is_empty());
    }
}
