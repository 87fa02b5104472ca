// Storage seam for entitlement rows
// Handlers and services only talk to this trait; Postgres in production,
// the in-memory store for tests and local runs without a database.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{NewPurchase, Purchase};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(#[from] diesel::result::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl<E: std::error::Error + 'static> From<bb8::RunError<E>> for StoreError {
    fn from(err: bb8::RunError<E>) -> Self {
        StoreError::Pool(err.to_string())
    }
}

/// Result of an atomic insert-if-absent keyed by payment reference
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted(Purchase),
    AlreadyExists,
}

#[async_trait]
pub trait EntitlementStore: Send + Sync {
    async fn find_by_payment_reference(
        &self,
        payment_reference: &str,
    ) -> Result<Option<Purchase>, StoreError>;

    /// Must be atomic with respect to concurrent callers using the same
    /// payment reference: exactly one of them observes `Inserted`.
    async fn insert_if_absent(&self, new_purchase: NewPurchase)
        -> Result<InsertOutcome, StoreError>;

    async fn find_active_for_user(&self, user_id: Uuid) -> Result<Option<Purchase>, StoreError>;

    async fn find_by_user(&self, user_id: Uuid) -> Result<Vec<Purchase>, StoreError>;

    async fn deactivate_for_user(&self, user_id: Uuid) -> Result<Vec<Purchase>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel_async::pooled_connection::PoolError;

    #[test]
    fn test_pool_checkout_failure_maps_to_pool_error() {
        let err: StoreError = bb8::RunError::<PoolError>::TimedOut.into();
        assert!(matches!(err, StoreError::Pool(ref msg) if msg.to_lowercase().contains("timed out")));
    }
}
