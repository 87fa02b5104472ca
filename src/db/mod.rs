pub mod diesel_pool;
pub mod entitlement_store;
pub mod memory_store;
pub mod postgres_store;

pub use diesel_pool::{
    create_diesel_pool, mask_connection_string, DieselDatabaseConfig, DieselPool,
};
pub use entitlement_store::{EntitlementStore, InsertOutcome, StoreError};
pub use memory_store::InMemoryEntitlementStore;
pub use postgres_store::PostgresEntitlementStore;
