use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::db::entitlement_store::{EntitlementStore, InsertOutcome, StoreError};
use crate::models::{NewPurchase, Purchase, PurchaseStatus};

/// In-process entitlement store keyed by payment reference.
/// A single lock covers check-and-insert, mirroring the unique index.
#[derive(Default)]
pub struct InMemoryEntitlementStore {
    rows: Mutex<HashMap<String, Purchase>>,
}

impl InMemoryEntitlementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

#[async_trait]
impl EntitlementStore for InMemoryEntitlementStore {
    async fn find_by_payment_reference(
        &self,
        payment_reference: &str,
    ) -> Result<Option<Purchase>, StoreError> {
        Ok(self.rows.lock().await.get(payment_reference).cloned())
    }

    async fn insert_if_absent(
        &self,
        new_purchase: NewPurchase,
    ) -> Result<InsertOutcome, StoreError> {
        let mut rows = self.rows.lock().await;
        if rows.contains_key(&new_purchase.payment_reference) {
            return Ok(InsertOutcome::AlreadyExists);
        }

        let purchase = new_purchase.into_purchase();
        rows.insert(purchase.payment_reference.clone(), purchase.clone());
        Ok(InsertOutcome::Inserted(purchase))
    }

    async fn find_active_for_user(&self, user_id: Uuid) -> Result<Option<Purchase>, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .values()
            .filter(|p| p.user_id == user_id && p.grants_lifetime_access())
            .max_by_key(|p| p.purchased_at)
            .cloned())
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Purchase>, StoreError> {
        let rows = self.rows.lock().await;
        let mut purchases: Vec<Purchase> =
            rows.values().filter(|p| p.user_id == user_id).cloned().collect();
        purchases.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(purchases)
    }

    async fn deactivate_for_user(&self, user_id: Uuid) -> Result<Vec<Purchase>, StoreError> {
        let mut rows = self.rows.lock().await;
        let now = Utc::now();
        let mut revoked = Vec::new();

        for purchase in rows.values_mut() {
            if purchase.user_id == user_id && purchase.status == PurchaseStatus::Active.as_str() {
                purchase.status = PurchaseStatus::Inactive.as_str().to_string();
                purchase.updated_at = now;
                revoked.push(purchase.clone());
            }
        }

        Ok(revoked)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn purchase_for(user_id: Uuid, reference: &str) -> NewPurchase {
        NewPurchase::lifetime_pro(user_id, reference.to_string(), None, 3900, "usd".to_string(), None)
    }

    #[tokio::test]
    async fn test_insert_if_absent_is_idempotent() {
        let store = InMemoryEntitlementStore::new();
        let user_id = Uuid::new_v4();

        let first = store.insert_if_absent(purchase_for(user_id, "pi_1")).await.unwrap();
        let second = store.insert_if_absent(purchase_for(user_id, "pi_1")).await.unwrap();

        assert!(matches!(first, InsertOutcome::Inserted(_)));
        assert_eq!(second, InsertOutcome::AlreadyExists);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_inserts_yield_single_row() {
        let store = Arc::new(InMemoryEntitlementStore::new());
        let user_id = Uuid::new_v4();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.insert_if_absent(purchase_for(user_id, "pi_race")).await })
            })
            .collect();

        let mut inserted = 0;
        for handle in handles {
            if let InsertOutcome::Inserted(_) = handle.await.unwrap().unwrap() {
                inserted += 1;
            }
        }

        assert_eq!(inserted, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_deactivate_keeps_rows() {
        let store = InMemoryEntitlementStore::new();
        let user_id = Uuid::new_v4();
        store.insert_if_absent(purchase_for(user_id, "pi_2")).await.unwrap();

        let revoked = store.deactivate_for_user(user_id).await.unwrap();
        assert_eq!(revoked.len(), 1);
        assert_eq!(revoked[0].status, "inactive");

        assert!(store.find_active_for_user(user_id).await.unwrap().is_none());
        let remaining = store.find_by_user(user_id).await.unwrap();
        assert_eq!(remaining.len(), 1);

        // Already inactive rows are not revoked twice
        assert!(store.deactivate_for_user(user_id).await.unwrap().is_empty());
    }
}
