// Stripe wire types - only the fields this service reads

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Webhook event envelope
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub created: Option<i64>,
    #[serde(default)]
    pub livemode: bool,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

/// Event types the reconciler cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StripeEventKind {
    CheckoutSessionCompleted,
    CheckoutSessionAsyncPaymentSucceeded,
    PaymentIntentSucceeded,
    Other(String),
}

impl StripeEventKind {
    pub fn from_string(s: &str) -> Self {
        match s {
            "checkout.session.completed" => StripeEventKind::CheckoutSessionCompleted,
            "checkout.session.async_payment_succeeded" => {
                StripeEventKind::CheckoutSessionAsyncPaymentSucceeded
            },
            "payment_intent.succeeded" => StripeEventKind::PaymentIntentSucceeded,
            other => StripeEventKind::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub client_reference_id: Option<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(default, deserialize_with = "expandable_id")]
    pub payment_intent: Option<String>,
    #[serde(default, deserialize_with = "expandable_id")]
    pub customer: Option<String>,
    #[serde(default)]
    pub customer_details: Option<CustomerDetails>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub discounts: Option<Vec<Discount>>,
}

impl CheckoutSession {
    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key).map(String::as_str)
    }

    pub fn coupon_id(&self) -> Option<String> {
        self.discounts
            .as_ref()?
            .iter()
            .find_map(|discount| discount.coupon.clone())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerDetails {
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Discount {
    #[serde(default, deserialize_with = "expandable_id")]
    pub coupon: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub amount_received: Option<i64>,
    pub currency: String,
    #[serde(default, deserialize_with = "expandable_id")]
    pub customer: Option<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(default)]
    pub created: i64,
}

impl PaymentIntent {
    pub fn is_succeeded(&self) -> bool {
        self.status == "succeeded"
    }

    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.as_ref()?.get(key).map(String::as_str)
    }

    pub fn amount_paid(&self) -> i64 {
        self.amount_received.unwrap_or(self.amount)
    }
}

/// Paginated list response
#[derive(Debug, Clone, Deserialize)]
pub struct StripeList<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorBody {
    pub error: StripeApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeApiError {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

/// Stripe returns either a bare id or the expanded object for references
fn expandable_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(id)) => Some(id),
        Some(serde_json::Value::Object(map)) => map
            .get("id")
            .and_then(|id| id.as_str())
            .map(str::to_string),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_checkout_session_accepts_expanded_references() {
        let session: CheckoutSession = serde_json::from_value(json!({
            "id": "cs_test_1",
            "client_reference_id": "0b7a2f4e-5f55-4d2a-9c44-0f5f0c3f6c11",
            "payment_intent": { "id": "pi_1", "object": "payment_intent" },
            "customer": "cus_1",
            "payment_status": "paid",
            "amount_total": 3900,
            "currency": "usd",
            "metadata": null,
            "discounts": [{ "coupon": { "id": "LAUNCH50" } }]
        }))
        .unwrap();

        assert_eq!(session.payment_intent.as_deref(), Some("pi_1"));
        assert_eq!(session.customer.as_deref(), Some("cus_1"));
        assert!(session.is_paid());
        assert_eq!(session.metadata_value("user_id"), None);
        assert_eq!(session.coupon_id().as_deref(), Some("LAUNCH50"));
    }

    #[test]
    fn test_event_kind_mapping() {
        assert_eq!(
            StripeEventKind::from_string("payment_intent.succeeded"),
            StripeEventKind::PaymentIntentSucceeded
        );
        assert_eq!(
            StripeEventKind::from_string("charge.refunded"),
            StripeEventKind::Other("charge.refunded".to_string())
        );
    }

    #[test]
    fn test_payment_intent_amount_prefers_received() {
        let intent: PaymentIntent = serde_json::from_value(json!({
            "id": "pi_2",
            "status": "succeeded",
            "amount": 3900,
            "amount_received": 1950,
            "currency": "usd",
            "created": 1_700_000_000
        }))
        .unwrap();

        assert!(intent.is_succeeded());
        assert_eq!(intent.amount_paid(), 1950);
    }
}
