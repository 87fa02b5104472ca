// Webhook reconciliation: verified payment events become entitlement rows
// One row per payment reference, no matter how often or in which order the
// provider delivers, or whether the sweep/backfill reaches it first.

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::db::{EntitlementStore, InsertOutcome};
use crate::models::{NewPurchase, Purchase};
use crate::services::notifier::{EntitlementChange, EntitlementNotifier};
use crate::services::payment_provider::USER_ID_METADATA_KEY;
use crate::services::stripe::{
    CheckoutSession, PaymentIntent, StripeEvent, StripeEventKind, WebhookVerifier,
};
use crate::utils::audit_logger::{AuditAction, AuditLogger};
use crate::utils::purchase_errors::PurchaseError;

/// User reference channels in priority order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserReference {
    pub primary: Option<String>,
    pub metadata: Option<String>,
}

impl UserReference {
    /// First channel holding a parseable UUID wins
    pub fn resolve(&self) -> Option<Uuid> {
        [("primary", &self.primary), ("metadata", &self.metadata)]
            .into_iter()
            .find_map(|(channel, value)| {
                let raw = value.as_deref().map(str::trim).filter(|v| !v.is_empty())?;
                match Uuid::parse_str(raw) {
                    Ok(user_id) => {
                        debug!(channel, %user_id, "User reference resolved");
                        Some(user_id)
                    },
                    Err(_) => {
                        warn!(channel, value = raw, "User reference is not a UUID, ignoring channel");
                        None
                    },
                }
            })
    }
}

/// A succeeded payment, normalized from whichever provider object reported it
#[derive(Debug, Clone, PartialEq)]
pub struct SucceededPayment {
    pub payment_reference: String,
    pub user_reference: UserReference,
    pub customer_reference: Option<String>,
    pub amount_paid: i64,
    pub currency: String,
    pub coupon_id: Option<String>,
}

impl SucceededPayment {
    /// `None` when the session is not paid yet
    pub fn from_checkout_session(session: &CheckoutSession) -> Result<Option<Self>, PurchaseError> {
        if !session.is_paid() {
            return Ok(None);
        }

        let amount_paid = session.amount_total.ok_or_else(|| {
            PurchaseError::InvalidRequest("checkout session has no amount_total".to_string())
        })?;
        let currency = session.currency.clone().ok_or_else(|| {
            PurchaseError::InvalidRequest("checkout session has no currency".to_string())
        })?;

        Ok(Some(Self {
            payment_reference: session
                .payment_intent
                .clone()
                .unwrap_or_else(|| session.id.clone()),
            user_reference: UserReference {
                primary: session.client_reference_id.clone(),
                metadata: session.metadata_value(USER_ID_METADATA_KEY).map(str::to_string),
            },
            customer_reference: session.customer.clone(),
            amount_paid,
            currency,
            coupon_id: session.coupon_id(),
        }))
    }

    /// Payment intents carry the user id in metadata only
    pub fn from_payment_intent(intent: &PaymentIntent) -> Option<Self> {
        if !intent.is_succeeded() {
            return None;
        }

        Some(Self {
            payment_reference: intent.id.clone(),
            user_reference: UserReference {
                primary: None,
                metadata: intent.metadata_value(USER_ID_METADATA_KEY).map(str::to_string),
            },
            customer_reference: intent.customer.clone(),
            amount_paid: intent.amount_paid(),
            currency: intent.currency.clone(),
            coupon_id: None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    Created(Purchase),
    Duplicate,
    Ignored { event_type: String },
}

impl ReconcileOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconcileOutcome::Created(_) => "created",
            ReconcileOutcome::Duplicate => "duplicate",
            ReconcileOutcome::Ignored { .. } => "ignored",
        }
    }
}

pub struct WebhookReconciler {
    store: Arc<dyn EntitlementStore>,
    notifier: EntitlementNotifier,
    verifier: WebhookVerifier,
}

impl WebhookReconciler {
    pub fn new(
        store: Arc<dyn EntitlementStore>,
        notifier: EntitlementNotifier,
        verifier: WebhookVerifier,
    ) -> Self {
        Self {
            store,
            notifier,
            verifier,
        }
    }

    /// Verify, parse, and dispatch one webhook delivery
    pub async fn handle_webhook(
        &self,
        payload: &[u8],
        signature: Option<&str>,
    ) -> Result<ReconcileOutcome, PurchaseError> {
        // Nothing is parsed before the signature checks out
        if let Err(e) = self.verifier.verify(payload, signature) {
            warn!(error = %e, "Rejected webhook with invalid signature");
            return Err(PurchaseError::SignatureInvalid(e));
        }

        let event: StripeEvent = serde_json::from_slice(payload).map_err(|e| {
            warn!(error = %e, "Webhook payload is not a valid event");
            PurchaseError::InvalidRequest("malformed event payload".to_string())
        })?;

        info!(event_id = %event.id, event_type = %event.event_type, "Webhook received");
        self.dispatch(event).await
    }

    async fn dispatch(&self, event: StripeEvent) -> Result<ReconcileOutcome, PurchaseError> {
        let payment = match StripeEventKind::from_string(&event.event_type) {
            StripeEventKind::CheckoutSessionCompleted
            | StripeEventKind::CheckoutSessionAsyncPaymentSucceeded => {
                let session: CheckoutSession = parse_object(&event)?;
                SucceededPayment::from_checkout_session(&session)?
            },
            StripeEventKind::PaymentIntentSucceeded => {
                let intent: PaymentIntent = parse_object(&event)?;
                SucceededPayment::from_payment_intent(&intent)
            },
            StripeEventKind::Other(_) => None,
        };

        match payment {
            Some(payment) => self.reconcile(payment).await,
            None => {
                debug!(event_id = %event.id, event_type = %event.event_type, "Event ignored");
                Ok(ReconcileOutcome::Ignored {
                    event_type: event.event_type,
                })
            },
        }
    }

    /// Idempotent write path shared by webhooks, the sweep, and backfill
    pub async fn reconcile(&self, payment: SucceededPayment) -> Result<ReconcileOutcome, PurchaseError> {
        let reference = payment.payment_reference.clone();

        // A redelivery may lack the channel that attributed the first one
        if let Some(existing) = self.store.find_by_payment_reference(&reference).await? {
            return Ok(self.duplicate(existing.user_id, &reference));
        }

        let Some(user_id) = payment.user_reference.resolve() else {
            error!(
                payment_reference = %reference,
                "Succeeded payment carries no usable user reference; manual reconciliation required"
            );
            AuditLogger::log_entitlement_action(
                AuditAction::PaymentUnattributed,
                None,
                Some(&reference),
                payment.customer_reference.clone(),
            );
            return Err(PurchaseError::UserReferenceMissing {
                payment_reference: reference,
            });
        };

        let new_purchase = NewPurchase::lifetime_pro(
            user_id,
            reference.clone(),
            payment.customer_reference,
            payment.amount_paid,
            payment.currency,
            payment.coupon_id,
        );

        match self.store.insert_if_absent(new_purchase).await? {
            InsertOutcome::Inserted(purchase) => {
                info!(%user_id, payment_reference = %reference, "Lifetime Pro granted");
                AuditLogger::log_entitlement_action(
                    AuditAction::EntitlementGranted,
                    Some(user_id),
                    Some(&reference),
                    None,
                );
                self.notifier.publish(EntitlementChange::inserted(purchase.clone()));
                Ok(ReconcileOutcome::Created(purchase))
            },
            // Lost the race to a concurrent delivery
            InsertOutcome::AlreadyExists => Ok(self.duplicate(user_id, &reference)),
        }
    }

    fn duplicate(&self, user_id: Uuid, reference: &str) -> ReconcileOutcome {
        info!(%user_id, payment_reference = %reference, "Payment already reconciled");
        AuditLogger::log_entitlement_action(
            AuditAction::DuplicatePaymentIgnored,
            Some(user_id),
            Some(reference),
            None,
        );
        ReconcileOutcome::Duplicate
    }
}

fn parse_object<T: serde::de::DeserializeOwned>(event: &StripeEvent) -> Result<T, PurchaseError> {
    serde_json::from_value(event.data.object.clone()).map_err(|e| {
        warn!(event_id = %event.id, error = %e, "Event object has unexpected shape");
        PurchaseError::InvalidRequest("malformed event object".to_string())
    })
}
