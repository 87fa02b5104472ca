// Payment provider seam
// The Stripe HTTP client implements this in production; tests script it.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::services::stripe::types::{CheckoutSession, PaymentIntent};

/// Metadata key carrying the user id on sessions and payment intents
pub const USER_ID_METADATA_KEY: &str = "user_id";

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Payment provider request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected provider response: {0}")]
    InvalidResponse(String),
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_decode() {
            ProviderError::InvalidResponse(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

/// Everything needed to open a hosted checkout for one user
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSessionParams {
    pub price_id: String,
    pub user_id: Uuid,
    pub user_email: String,
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutSessionParams {
    /// Form body for `POST /v1/checkout/sessions`.
    /// The user id travels in `client_reference_id` and in metadata on both
    /// the session and its payment intent, so either can attribute the payment.
    pub fn to_form(&self) -> Vec<(String, String)> {
        let user_id = self.user_id.to_string();
        vec![
            ("mode".to_string(), "payment".to_string()),
            ("line_items[0][price]".to_string(), self.price_id.clone()),
            ("line_items[0][quantity]".to_string(), "1".to_string()),
            ("client_reference_id".to_string(), user_id.clone()),
            (
                format!("metadata[{}]", USER_ID_METADATA_KEY),
                user_id.clone(),
            ),
            (
                format!("payment_intent_data[metadata][{}]", USER_ID_METADATA_KEY),
                user_id,
            ),
            ("customer_email".to_string(), self.user_email.clone()),
            ("allow_promotion_codes".to_string(), "true".to_string()),
            ("success_url".to_string(), self.success_url.clone()),
            ("cancel_url".to_string(), self.cancel_url.clone()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedCheckoutSession {
    pub id: String,
    pub url: String,
}

#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
    ) -> Result<CreatedCheckoutSession, ProviderError>;

    async fn retrieve_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<PaymentIntent, ProviderError>;

    /// Succeeded payment intents created at or after `created_after`
    async fn list_succeeded_payment_intents(
        &self,
        created_after: DateTime<Utc>,
    ) -> Result<Vec<PaymentIntent>, ProviderError>;

    /// Completed and paid checkout sessions for a customer email
    async fn list_paid_checkout_sessions(
        &self,
        customer_email: &str,
    ) -> Result<Vec<CheckoutSession>, ProviderError>;
}
