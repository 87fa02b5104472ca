// Payment provider webhook endpoint
// The body is taken raw: the signature covers the exact bytes received.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, info};

use crate::app::AppState;

pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

/// Receive a Stripe event
/// POST /webhook
#[utoipa::path(
    post,
    path = "/webhook",
    tag = "Purchase",
    operation_id = "stripeWebhook",
    request_body(content = String, description = "Raw Stripe event JSON", content_type = "application/json"),
    params(
        ("Stripe-Signature" = String, Header, description = "t=<unix>,v1=<hex hmac>")
    ),
    responses(
        (status = 200, description = "Event acknowledged"),
        (status = 400, description = "Invalid signature or malformed event"),
        (status = 500, description = "Storage failure - provider should retry")
    )
)]
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    match state.reconciler.handle_webhook(&body, signature).await {
        Ok(outcome) => {
            info!(outcome = outcome.as_str(), "Webhook processed");
            (StatusCode::OK, Json(json!({ "received": true }))).into_response()
        },
        Err(e) => {
            if e.is_retryable() {
                error!(error = %e, "Webhook processing failed, provider will retry");
            }
            e.into_response()
        },
    }
}
