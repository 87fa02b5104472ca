// Checkout initiation: validate, resolve the price, open a hosted session
// Nothing is persisted here; the webhook is the only writer.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::models::{CheckoutRequest, CheckoutResponse, ValidatedCheckout};
use crate::services::payment_provider::{CheckoutSessionParams, PaymentProvider, ProviderError};
use crate::utils::purchase_errors::PurchaseError;
use crate::utils::validation::require_field;

pub struct CheckoutService {
    provider: Arc<dyn PaymentProvider>,
    default_price_id: Option<String>,
    app_base_url: String,
    timeout: Duration,
}

impl CheckoutService {
    pub fn new(
        provider: Arc<dyn PaymentProvider>,
        default_price_id: Option<String>,
        app_base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            default_price_id: default_price_id.filter(|p| !p.trim().is_empty()),
            app_base_url: app_base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn validate(&self, request: CheckoutRequest) -> Result<ValidatedCheckout, PurchaseError> {
        let request = request.normalized();
        request.validate()?;

        let user_id = require_field(request.user_id.as_ref(), "userId")
            .map_err(PurchaseError::InvalidRequest)?;
        let user_id = Uuid::parse_str(&user_id)
            .map_err(|_| PurchaseError::InvalidRequest("userId must be a UUID".to_string()))?;
        let user_email = require_field(request.user_email.as_ref(), "userEmail")
            .map_err(PurchaseError::InvalidRequest)?;

        Ok(ValidatedCheckout {
            user_id,
            user_email,
            price_reference: request.price_reference,
        })
    }

    /// Explicit price first, then the configured default
    pub fn resolve_price(&self, price_reference: Option<&str>) -> Result<String, PurchaseError> {
        price_reference
            .map(str::to_string)
            .or_else(|| self.default_price_id.clone())
            .ok_or_else(|| {
                error!("No priceReference supplied and STRIPE_DEFAULT_PRICE_ID is not configured");
                PurchaseError::ConfigurationError("no checkout price configured".to_string())
            })
    }

    pub fn session_params(&self, checkout: &ValidatedCheckout, price_id: String) -> CheckoutSessionParams {
        CheckoutSessionParams {
            price_id,
            user_id: checkout.user_id,
            user_email: checkout.user_email.clone(),
            success_url: format!(
                "{}/purchase/success?session_id={{CHECKOUT_SESSION_ID}}",
                self.app_base_url
            ),
            cancel_url: format!("{}/pricing?canceled=true", self.app_base_url),
        }
    }

    #[instrument(skip(self, checkout), fields(user_id = %checkout.user_id))]
    pub async fn create_session(
        &self,
        checkout: &ValidatedCheckout,
    ) -> Result<CheckoutResponse, PurchaseError> {
        let price_id = self.resolve_price(checkout.price_reference.as_deref())?;
        let params = self.session_params(checkout, price_id);

        let result = tokio::time::timeout(self.timeout, self.provider.create_checkout_session(&params))
            .await
            .unwrap_or(Err(ProviderError::Timeout));

        match result {
            Ok(session) => {
                info!(session_id = %session.id, "Checkout session created");
                Ok(CheckoutResponse {
                    redirect_url: session.url,
                    session_id: session.id,
                })
            },
            Err(e) => {
                error!(error = %e, "Failed to create checkout session");
                Err(PurchaseError::UpstreamError(e))
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::payment_provider::CreatedCheckoutSession;
    use crate::services::stripe::{CheckoutSession, PaymentIntent};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    struct SlowProvider;

    #[async_trait]
    impl PaymentProvider for SlowProvider {
        async fn create_checkout_session(
            &self,
            _params: &CheckoutSessionParams,
        ) -> Result<CreatedCheckoutSession, ProviderError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(CreatedCheckoutSession {
                id: "cs_late".to_string(),
                url: "https://checkout.stripe.com/c/pay/cs_late".to_string(),
            })
        }

        async fn retrieve_payment_intent(&self, _id: &str) -> Result<PaymentIntent, ProviderError> {
            Err(ProviderError::Network("unused".to_string()))
        }

        async fn list_succeeded_payment_intents(
            &self,
            _created_after: DateTime<Utc>,
        ) -> Result<Vec<PaymentIntent>, ProviderError> {
            Ok(vec![])
        }

        async fn list_paid_checkout_sessions(
            &self,
            _customer_email: &str,
        ) -> Result<Vec<CheckoutSession>, ProviderError> {
            Ok(vec![])
        }
    }

    fn service(default_price: Option<&str>) -> CheckoutService {
        CheckoutService::new(
            Arc::new(SlowProvider),
            default_price.map(str::to_string),
            "https://loged.in/",
            Duration::from_secs(10),
        )
    }

    fn request(user_id: &str, email: &str) -> CheckoutRequest {
        CheckoutRequest {
            user_id: Some(user_id.to_string()),
            user_email: Some(email.to_string()),
            price_reference: None,
        }
    }

    #[test]
    fn test_validate_trims_and_parses() {
        let user_id = Uuid::new_v4();
        let checkout = service(None)
            .validate(request(&format!(" {} ", user_id), " a@b.com "))
            .unwrap();
        assert_eq!(checkout.user_id, user_id);
        assert_eq!(checkout.user_email, "a@b.com");
        assert_eq!(checkout.price_reference, None);
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let svc = service(None);
        assert!(matches!(
            svc.validate(request("not-a-uuid", "a@b.com")),
            Err(PurchaseError::InvalidRequest(_))
        ));
        assert!(matches!(
            svc.validate(request(&Uuid::new_v4().to_string(), "not-an-email")),
            Err(PurchaseError::InvalidRequest(_))
        ));
        assert!(matches!(
            svc.validate(request(&Uuid::new_v4().to_string(), "   ")),
            Err(PurchaseError::InvalidRequest(msg)) if msg == "userEmail is required"
        ));
    }

    #[test]
    fn test_price_resolution() {
        assert_eq!(service(Some("price_default")).resolve_price(None).unwrap(), "price_default");
        assert_eq!(
            service(Some("price_default")).resolve_price(Some("price_explicit")).unwrap(),
            "price_explicit"
        );
        assert!(matches!(
            service(None).resolve_price(None),
            Err(PurchaseError::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_redirect_urls_use_base_without_trailing_slash() {
        let svc = service(Some("price_default"));
        let checkout = svc.validate(request(&Uuid::new_v4().to_string(), "a@b.com")).unwrap();
        let params = svc.session_params(&checkout, "price_default".to_string());
        assert_eq!(
            params.success_url,
            "https://loged.in/purchase/success?session_id={CHECKOUT_SESSION_ID}"
        );
        assert_eq!(params.cancel_url, "https://loged.in/pricing?canceled=true");
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_timeout_is_upstream_error() {
        let svc = service(Some("price_default"));
        let checkout = svc.validate(request(&Uuid::new_v4().to_string(), "a@b.com")).unwrap();

        let result = svc.create_session(&checkout).await;
        assert!(matches!(
            result,
            Err(PurchaseError::UpstreamError(ProviderError::Timeout))
        ));
    }
}
