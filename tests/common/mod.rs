// Common test utilities and helper structs
// Shared across all test files to avoid duplication

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use logedin_backend::{
    app::{AppState, ServiceSettings},
    build_router,
    db::{EntitlementStore, InMemoryEntitlementStore, InsertOutcome, StoreError},
    models::{NewPurchase, Purchase},
    services::{
        jwt::SupabaseClaims,
        stripe::{compute_signature, CheckoutSession, PaymentIntent},
        CheckoutSessionParams, CreatedCheckoutSession, PaymentProvider, ProviderError,
    },
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tower::util::ServiceExt;
use uuid::Uuid;

pub const WEBHOOK_SECRET: &str = "whsec_test_0123456789abcdef";
pub const JWT_SECRET: &str = "test-supabase-jwt-secret-at-least-32-chars";
pub const ADMIN_KEY: &str = "test-admin-key";
pub const DEFAULT_PRICE: &str = "price_lifetime_pro";

// =============================================================================
// PAYMENT PROVIDER DOUBLE
// =============================================================================

/// Scripted payment provider that records checkout requests
#[derive(Default)]
pub struct MockPaymentProvider {
    pub checkout_calls: Mutex<Vec<CheckoutSessionParams>>,
    pub fail_checkout_with: Mutex<Option<u16>>,
    pub payment_intents: Mutex<HashMap<String, PaymentIntent>>,
    pub sessions_by_email: Mutex<HashMap<String, Vec<CheckoutSession>>>,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_checkout(&self, status: u16) {
        *self.fail_checkout_with.lock().unwrap() = Some(status);
    }

    pub fn add_payment_intent(&self, intent: PaymentIntent) {
        self.payment_intents
            .lock()
            .unwrap()
            .insert(intent.id.clone(), intent);
    }

    pub fn add_session_for_email(&self, email: &str, session: CheckoutSession) {
        self.sessions_by_email
            .lock()
            .unwrap()
            .entry(email.to_string())
            .or_default()
            .push(session);
    }

    pub fn checkout_call_count(&self) -> usize {
        self.checkout_calls.lock().unwrap().len()
    }

    pub fn last_checkout(&self) -> Option<CheckoutSessionParams> {
        self.checkout_calls.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_checkout_session(
        &self,
        params: &CheckoutSessionParams,
    ) -> Result<CreatedCheckoutSession, ProviderError> {
        self.checkout_calls.lock().unwrap().push(params.clone());

        if let Some(status) = *self.fail_checkout_with.lock().unwrap() {
            return Err(ProviderError::Api {
                status,
                message: "Invalid API Key provided: sk_live_****1234".to_string(),
            });
        }

        let id = format!("cs_test_{}", Uuid::new_v4().simple());
        Ok(CreatedCheckoutSession {
            url: format!("https://checkout.stripe.com/c/pay/{}", id),
            id,
        })
    }

    async fn retrieve_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<PaymentIntent, ProviderError> {
        self.payment_intents
            .lock()
            .unwrap()
            .get(payment_intent_id)
            .cloned()
            .ok_or(ProviderError::Api {
                status: 404,
                message: "No such payment_intent".to_string(),
            })
    }

    async fn list_succeeded_payment_intents(
        &self,
        created_after: DateTime<Utc>,
    ) -> Result<Vec<PaymentIntent>, ProviderError> {
        Ok(self
            .payment_intents
            .lock()
            .unwrap()
            .values()
            .filter(|pi| pi.is_succeeded() && pi.created >= created_after.timestamp())
            .cloned()
            .collect())
    }

    async fn list_paid_checkout_sessions(
        &self,
        customer_email: &str,
    ) -> Result<Vec<CheckoutSession>, ProviderError> {
        Ok(self
            .sessions_by_email
            .lock()
            .unwrap()
            .get(customer_email)
            .cloned()
            .unwrap_or_default())
    }
}

// =============================================================================
// STORE DOUBLE
// =============================================================================

/// Store whose every call fails, for fail-safe and retry paths
pub struct FailingStore;

#[async_trait]
impl EntitlementStore for FailingStore {
    async fn find_by_payment_reference(&self, _: &str) -> Result<Option<Purchase>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn insert_if_absent(&self, _: NewPurchase) -> Result<InsertOutcome, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn find_active_for_user(&self, _: Uuid) -> Result<Option<Purchase>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn find_by_user(&self, _: Uuid) -> Result<Vec<Purchase>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn deactivate_for_user(&self, _: Uuid) -> Result<Vec<Purchase>, StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

// =============================================================================
// TEST APPLICATION
// =============================================================================

pub fn test_settings() -> ServiceSettings {
    ServiceSettings {
        default_price_id: Some(DEFAULT_PRICE.to_string()),
        app_base_url: "https://loged.in".to_string(),
        webhook_secret: WEBHOOK_SECRET.to_string(),
        webhook_tolerance_secs: 300,
        checkout_timeout: Duration::from_secs(5),
        jwt_secret: None,
        jwt_audience: "authenticated".to_string(),
        admin_api_key: Some(ADMIN_KEY.to_string()),
    }
}

/// Test application wrapper
pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub store: Arc<InMemoryEntitlementStore>,
    pub provider: Arc<MockPaymentProvider>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_settings(test_settings())
    }

    /// JWT guard enabled
    pub fn with_auth() -> Self {
        Self::with_settings(ServiceSettings {
            jwt_secret: Some(JWT_SECRET.to_string()),
            ..test_settings()
        })
    }

    pub fn with_settings(settings: ServiceSettings) -> Self {
        let store = Arc::new(InMemoryEntitlementStore::new());
        let provider = Arc::new(MockPaymentProvider::new());
        let state = AppState::new(store.clone(), provider.clone(), settings);

        Self {
            app: build_router(state.clone()),
            state,
            store,
            provider,
        }
    }

    /// Send a POST request
    pub fn post(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "POST", uri)
    }

    /// Send a GET request
    pub fn get(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "GET", uri)
    }

    /// Send a DELETE request
    pub fn delete(&self, uri: &str) -> TestRequest {
        TestRequest::new(self, "DELETE", uri)
    }

    /// Deliver a correctly signed webhook
    pub async fn deliver_webhook(&self, event: &Value) -> TestResponse {
        let body = event.to_string();
        let header = sign_payload(body.as_bytes(), Utc::now().timestamp());
        self.post("/webhook")
            .header("stripe-signature", &header)
            .raw_body(body)
            .send()
            .await
    }

    /// Router wired to a store that always fails
    pub fn router_with_store(store: Arc<dyn EntitlementStore>) -> Router {
        let provider = Arc::new(MockPaymentProvider::new());
        build_router(AppState::new(store, provider, test_settings()))
    }
}

/// Test request builder
pub struct TestRequest<'a> {
    app: &'a TestApp,
    method: String,
    uri: String,
    headers: Vec<(String, String)>,
    body: Body,
}

impl<'a> TestRequest<'a> {
    fn new(app: &'a TestApp, method: &str, uri: &str) -> Self {
        Self {
            app,
            method: method.to_string(),
            uri: uri.to_string(),
            headers: Vec::new(),
            body: Body::empty(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("authorization", &format!("Bearer {}", token))
    }

    /// Add JSON body to request
    pub fn json<T: Serialize>(mut self, body: &T) -> Self {
        self.headers
            .push(("content-type".to_string(), "application/json".to_string()));
        self.body = Body::from(serde_json::to_vec(body).unwrap());
        self
    }

    pub fn raw_body(mut self, body: impl Into<String>) -> Self {
        self.headers
            .push(("content-type".to_string(), "application/json".to_string()));
        self.body = Body::from(body.into());
        self
    }

    /// Send the request
    pub async fn send(self) -> TestResponse {
        send_to(self.app.app.clone(), self.method, self.uri, self.headers, self.body).await
    }
}

pub async fn send_to(
    app: Router,
    method: String,
    uri: String,
    headers: Vec<(String, String)>,
    body: Body,
) -> TestResponse {
    let mut builder = Request::builder().method(method.as_str()).uri(uri);
    for (name, value) in headers {
        builder = builder.header(name, value);
    }
    let request = builder.body(body).unwrap();
    let response = app.oneshot(request).await.unwrap();

    TestResponse { response }
}

/// Test response wrapper
pub struct TestResponse {
    response: Response<Body>,
}

impl TestResponse {
    /// Get status code
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    /// Parse JSON response
    pub async fn json<T: serde::de::DeserializeOwned>(self) -> T {
        let body = axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    pub fn into_body(self) -> Body {
        self.response.into_body()
    }

    /// Get response body as text
    pub async fn text(self) -> String {
        let body = axum::body::to_bytes(self.response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(body.to_vec()).unwrap()
    }
}

// =============================================================================
// FIXTURES
// =============================================================================

pub fn sign_payload(payload: &[u8], timestamp: i64) -> String {
    format!(
        "t={},v1={}",
        timestamp,
        compute_signature(WEBHOOK_SECRET, timestamp, payload)
    )
}

pub fn user_token(user_id: Uuid) -> String {
    let claims = SupabaseClaims {
        sub: user_id.to_string(),
        exp: (Utc::now().timestamp() + 3600) as u64,
        aud: Some("authenticated".to_string()),
        email: Some("buyer@example.com".to_string()),
        role: Some("authenticated".to_string()),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .unwrap()
}

/// `checkout.session.completed` for a paid session
pub fn checkout_completed_event(
    client_reference_id: Option<&str>,
    metadata_user_id: Option<&str>,
    payment_intent: &str,
) -> Value {
    let metadata = match metadata_user_id {
        Some(user_id) => json!({ "user_id": user_id }),
        None => json!({}),
    };

    json!({
        "id": format!("evt_{}", Uuid::new_v4().simple()),
        "type": "checkout.session.completed",
        "created": Utc::now().timestamp(),
        "livemode": false,
        "data": {
            "object": {
                "id": format!("cs_test_{}", Uuid::new_v4().simple()),
                "object": "checkout.session",
                "client_reference_id": client_reference_id,
                "metadata": metadata,
                "payment_intent": payment_intent,
                "customer": "cus_test_1",
                "customer_details": { "email": "buyer@example.com" },
                "payment_status": "paid",
                "status": "complete",
                "amount_total": 3900,
                "currency": "usd",
                "discounts": []
            }
        }
    })
}

/// `payment_intent.succeeded` with the user id in metadata
pub fn payment_intent_succeeded_event(payment_intent: &str, metadata_user_id: Option<&str>) -> Value {
    let metadata = match metadata_user_id {
        Some(user_id) => json!({ "user_id": user_id }),
        None => json!({}),
    };

    json!({
        "id": format!("evt_{}", Uuid::new_v4().simple()),
        "type": "payment_intent.succeeded",
        "created": Utc::now().timestamp(),
        "livemode": false,
        "data": {
            "object": {
                "id": payment_intent,
                "object": "payment_intent",
                "status": "succeeded",
                "amount": 3900,
                "amount_received": 3900,
                "currency": "usd",
                "customer": "cus_test_1",
                "metadata": metadata,
                "created": Utc::now().timestamp()
            }
        }
    })
}

pub fn succeeded_intent(id: &str, user_id: Option<Uuid>) -> PaymentIntent {
    let metadata = user_id.map(|u| HashMap::from([("user_id".to_string(), u.to_string())]));
    PaymentIntent {
        id: id.to_string(),
        status: "succeeded".to_string(),
        amount: 3900,
        amount_received: Some(3900),
        currency: "usd".to_string(),
        customer: Some("cus_test_1".to_string()),
        metadata,
        created: Utc::now().timestamp(),
    }
}
