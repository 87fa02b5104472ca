use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::purchase::Purchase;

/// Answer to "does this user hold Lifetime Pro right now?"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EntitlementStatus {
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<Purchase>,
}

impl EntitlementStatus {
    pub fn none() -> Self {
        Self {
            active: false,
            record: None,
        }
    }

    pub fn from_record(record: Option<Purchase>) -> Self {
        match record {
            Some(purchase) if purchase.grants_lifetime_access() => Self {
                active: true,
                record: Some(purchase),
            },
            _ => Self::none(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteAccountRequest {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct DeleteAccountResponse {
    /// Entitlement rows moved to `inactive`
    pub revoked: usize,
}
