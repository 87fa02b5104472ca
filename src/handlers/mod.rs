// HTTP handlers for checkout, webhooks, entitlement reads, and operator tools

pub mod account;
pub mod admin;
pub mod checkout;
pub mod docs;
pub mod entitlement;
pub mod webhook;

use crate::app::AppState;
use crate::utils::{purchase_errors::PurchaseError, validation::require_field};
use axum::{
    routing::{delete, get, post},
    Router,
};
use uuid::Uuid;

// Checkout and webhook routes
pub fn purchase_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(checkout::create_checkout))
        .route("/webhook", post(webhook::stripe_webhook))
}

// Entitlement read routes
pub fn entitlement_routes() -> Router<AppState> {
    Router::new()
        .route("/entitlement", get(entitlement::get_entitlement))
        .route("/entitlement/stream", get(entitlement::entitlement_stream))
        .route("/entitlement/features", get(entitlement::get_features))
}

// Account lifecycle and operator routes
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/account", delete(account::delete_account))
        .route("/admin/reconcile", post(admin::reconcile))
}

/// Required, trimmed, UUID-shaped user id
pub(crate) fn parse_user_id(raw: Option<&String>) -> Result<Uuid, PurchaseError> {
    let raw = require_field(raw, "userId").map_err(PurchaseError::InvalidRequest)?;
    Uuid::parse_str(&raw)
        .map_err(|_| PurchaseError::InvalidRequest("userId must be a UUID".to_string()))
}
