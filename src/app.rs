// Application state and service wiring
use std::sync::Arc;
use std::time::Duration;

use crate::{
    app_config::AppConfig,
    db::EntitlementStore,
    services::{
        stripe::WebhookVerifier, AccountService, BackfillService, CheckoutService,
        EntitlementNotifier, EntitlementReader, JwtVerifier, PaymentProvider, WebhookReconciler,
    },
};

// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EntitlementStore>,
    pub notifier: EntitlementNotifier,
    pub checkout_service: Arc<CheckoutService>,
    pub reconciler: Arc<WebhookReconciler>,
    pub entitlement_reader: EntitlementReader,
    pub account_service: Arc<AccountService>,
    pub backfill_service: Arc<BackfillService>,
    pub jwt_verifier: Option<Arc<JwtVerifier>>,
    pub admin_api_key: Option<String>,
}

/// The slice of configuration the services need.
/// Kept separate from `AppConfig` so state can be built without the environment.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub default_price_id: Option<String>,
    pub app_base_url: String,
    pub webhook_secret: String,
    pub webhook_tolerance_secs: u64,
    pub checkout_timeout: Duration,
    pub jwt_secret: Option<String>,
    pub jwt_audience: String,
    pub admin_api_key: Option<String>,
}

impl ServiceSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            default_price_id: config.stripe.default_price_id.clone(),
            app_base_url: config.app_base_url.clone(),
            webhook_secret: config.stripe.webhook_secret.clone(),
            webhook_tolerance_secs: config.stripe.webhook_tolerance_secs,
            checkout_timeout: Duration::from_secs(config.stripe.request_timeout_secs),
            jwt_secret: config.auth.jwt_secret.clone(),
            jwt_audience: config.auth.jwt_audience.clone(),
            admin_api_key: config.auth.admin_api_key.clone(),
        }
    }
}

impl AppState {
    pub fn new(
        store: Arc<dyn EntitlementStore>,
        provider: Arc<dyn PaymentProvider>,
        settings: ServiceSettings,
    ) -> Self {
        let notifier = EntitlementNotifier::default();

        let reconciler = Arc::new(WebhookReconciler::new(
            store.clone(),
            notifier.clone(),
            WebhookVerifier::new(settings.webhook_secret, settings.webhook_tolerance_secs),
        ));

        let checkout_service = Arc::new(CheckoutService::new(
            provider.clone(),
            settings.default_price_id,
            settings.app_base_url,
            settings.checkout_timeout,
        ));

        let jwt_verifier = settings
            .jwt_secret
            .as_deref()
            .map(|secret| Arc::new(JwtVerifier::new(secret, &settings.jwt_audience)));

        Self {
            entitlement_reader: EntitlementReader::new(store.clone(), notifier.clone()),
            account_service: Arc::new(AccountService::new(store.clone(), notifier.clone())),
            backfill_service: Arc::new(BackfillService::new(provider, reconciler.clone())),
            store,
            notifier,
            checkout_service,
            reconciler,
            jwt_verifier,
            admin_api_key: settings.admin_api_key.filter(|k| !k.is_empty()),
        }
    }
}
