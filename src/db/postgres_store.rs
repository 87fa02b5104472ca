use async_trait::async_trait;
use uuid::Uuid;

use crate::db::{
    entitlement_store::{EntitlementStore, InsertOutcome, StoreError},
    DieselPool,
};
use crate::models::{NewPurchase, Purchase};

/// Entitlement store backed by the `purchases` table
#[derive(Clone)]
pub struct PostgresEntitlementStore {
    pool: DieselPool,
}

impl PostgresEntitlementStore {
    pub fn new(pool: DieselPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntitlementStore for PostgresEntitlementStore {
    async fn find_by_payment_reference(
        &self,
        payment_reference: &str,
    ) -> Result<Option<Purchase>, StoreError> {
        let mut conn = self.pool.get().await?;
        Ok(Purchase::find_by_payment_reference(&mut conn, payment_reference).await?)
    }

    async fn insert_if_absent(
        &self,
        new_purchase: NewPurchase,
    ) -> Result<InsertOutcome, StoreError> {
        let mut conn = self.pool.get().await?;

        // ON CONFLICT DO NOTHING on the unique payment_reference index is the
        // actual guard against concurrent duplicate deliveries
        match Purchase::insert_if_absent(&mut conn, &new_purchase).await? {
            Some(purchase) => Ok(InsertOutcome::Inserted(purchase)),
            None => Ok(InsertOutcome::AlreadyExists),
        }
    }

    async fn find_active_for_user(&self, user_id: Uuid) -> Result<Option<Purchase>, StoreError> {
        let mut conn = self.pool.get().await?;
        Ok(Purchase::find_active_for_user(&mut conn, user_id).await?)
    }

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Purchase>, StoreError> {
        let mut conn = self.pool.get().await?;
        Ok(Purchase::find_by_user_id(&mut conn, user_id).await?)
    }

    async fn deactivate_for_user(&self, user_id: Uuid) -> Result<Vec<Purchase>, StoreError> {
        let mut conn = self.pool.get().await?;
        Ok(Purchase::deactivate_for_user(&mut conn, user_id).await?)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        // Simple health check - just getting a connection is enough
        let conn = self.pool.get().await?;
        drop(conn);
        Ok(())
    }
}
