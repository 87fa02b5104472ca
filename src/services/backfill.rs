// Backfill of payments the webhook never delivered
// Manual lookups by payment intent or customer email, plus the periodic sweep.
// Everything funnels through the reconciler's idempotent write path.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

use crate::services::payment_provider::PaymentProvider;
use crate::services::reconciler::{ReconcileOutcome, SucceededPayment, WebhookReconciler};
use crate::services::stripe::is_payment_intent_id;
use crate::utils::audit_logger::{AuditAction, AuditLogger};
use crate::utils::purchase_errors::PurchaseError;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BackfillResult {
    pub payment_reference: String,
    /// created, duplicate, unattributed, not_succeeded, or failed
    pub outcome: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct SweepSummary {
    pub scanned: usize,
    pub created: usize,
    pub duplicates: usize,
    pub unattributed: usize,
    pub failed: usize,
}

pub struct BackfillService {
    provider: Arc<dyn PaymentProvider>,
    reconciler: Arc<WebhookReconciler>,
}

impl BackfillService {
    pub fn new(provider: Arc<dyn PaymentProvider>, reconciler: Arc<WebhookReconciler>) -> Self {
        Self {
            provider,
            reconciler,
        }
    }

    #[instrument(skip(self))]
    pub async fn reconcile_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Vec<BackfillResult>, PurchaseError> {
        if !is_payment_intent_id(payment_intent_id) {
            return Err(PurchaseError::InvalidRequest(
                "paymentIntentId must look like pi_...".to_string(),
            ));
        }

        let intent = self.provider.retrieve_payment_intent(payment_intent_id).await?;

        let result = match SucceededPayment::from_payment_intent(&intent) {
            Some(payment) => self.reconcile_one(payment).await?,
            None => BackfillResult {
                payment_reference: intent.id.clone(),
                outcome: "not_succeeded".to_string(),
            },
        };

        Ok(vec![result])
    }

    #[instrument(skip(self, customer_email))]
    pub async fn reconcile_customer_email(
        &self,
        customer_email: &str,
    ) -> Result<Vec<BackfillResult>, PurchaseError> {
        let sessions = self.provider.list_paid_checkout_sessions(customer_email).await?;
        let mut results = Vec::with_capacity(sessions.len());

        for session in &sessions {
            let result = match SucceededPayment::from_checkout_session(session) {
                Ok(Some(payment)) => self.reconcile_one(payment).await?,
                Ok(None) => BackfillResult {
                    payment_reference: session.id.clone(),
                    outcome: "not_succeeded".to_string(),
                },
                Err(e) => {
                    warn!(session_id = %session.id, error = %e, "Skipping malformed checkout session");
                    BackfillResult {
                        payment_reference: session.id.clone(),
                        outcome: "failed".to_string(),
                    }
                },
            };
            results.push(result);
        }

        Ok(results)
    }

    /// Reconcile every succeeded payment intent newer than `lookback`.
    /// Per-payment failures are counted, not fatal.
    pub async fn sweep(&self, lookback: Duration) -> Result<SweepSummary, PurchaseError> {
        let since = Utc::now() - lookback;
        let intents = self.provider.list_succeeded_payment_intents(since).await?;
        let mut summary = SweepSummary {
            scanned: intents.len(),
            ..Default::default()
        };

        for payment in intents.iter().filter_map(SucceededPayment::from_payment_intent) {
            let reference = payment.payment_reference.clone();
            match self.reconciler.reconcile(payment).await {
                Ok(ReconcileOutcome::Created(_)) => summary.created += 1,
                Ok(_) => summary.duplicates += 1,
                Err(PurchaseError::UserReferenceMissing { .. }) => summary.unattributed += 1,
                Err(e) => {
                    error!(payment_reference = %reference, error = %e, "Sweep failed to reconcile payment");
                    summary.failed += 1;
                },
            }
        }

        info!(
            scanned = summary.scanned,
            created = summary.created,
            duplicates = summary.duplicates,
            unattributed = summary.unattributed,
            failed = summary.failed,
            "Reconciliation sweep finished"
        );
        Ok(summary)
    }

    async fn reconcile_one(&self, payment: SucceededPayment) -> Result<BackfillResult, PurchaseError> {
        let payment_reference = payment.payment_reference.clone();
        let outcome = match self.reconciler.reconcile(payment).await {
            Ok(outcome) => outcome.as_str().to_string(),
            Err(PurchaseError::UserReferenceMissing { .. }) => "unattributed".to_string(),
            Err(e) => return Err(e),
        };

        AuditLogger::log_entitlement_action(
            AuditAction::ManualReconciliation,
            None,
            Some(&payment_reference),
            Some(outcome.clone()),
        );

        Ok(BackfillResult {
            payment_reference,
            outcome,
        })
    }
}
