// Audit trail for entitlement lifecycle events
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum AuditAction {
    EntitlementGranted,
    DuplicatePaymentIgnored,
    PaymentUnattributed,
    EntitlementRevoked,
    ManualReconciliation,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuditLog {
    pub id: Uuid,
    pub action: AuditAction,
    pub user_id: Option<Uuid>,
    pub payment_reference: Option<String>,
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

pub struct AuditLogger;

impl AuditLogger {
    /// Emit an audit event on the `audit` tracing target
    pub fn log_entitlement_action(
        action: AuditAction,
        user_id: Option<Uuid>,
        payment_reference: Option<&str>,
        details: Option<String>,
    ) {
        let audit_log = AuditLog {
            id: Uuid::new_v4(),
            action,
            user_id,
            payment_reference: payment_reference.map(str::to_string),
            details,
            timestamp: Utc::now(),
        };

        let json_log = serde_json::to_string(&audit_log).unwrap_or_else(|e| {
            warn!("Failed to serialize audit log: {}", e);
            format!("{:?}", audit_log)
        });

        info!(target: "audit", "{}", json_log);
    }
}
