// Operator backfill for payments whose webhook never arrived

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{info, warn};
use utoipa::ToSchema;

use crate::{
    app::AppState,
    services::backfill::BackfillResult,
    utils::{purchase_errors::PurchaseError, validation::trim_optional_field},
};

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";

/// Exactly one selector must be given
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminReconcileRequest {
    #[serde(default)]
    pub payment_intent_id: Option<String>,
    #[serde(default)]
    pub user_email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminReconcileResponse {
    pub results: Vec<BackfillResult>,
}

/// POST /admin/reconcile
#[utoipa::path(
    post,
    path = "/admin/reconcile",
    tag = "Admin",
    operation_id = "reconcilePayments",
    request_body = AdminReconcileRequest,
    responses(
        (status = 200, description = "Per-payment reconciliation outcomes", body = AdminReconcileResponse),
        (status = 400, description = "Invalid body, selector, or payment intent id"),
        (status = 401, description = "Missing or wrong admin key"),
        (status = 404, description = "No admin key configured"),
        (status = 500, description = "Payment provider or storage failure")
    ),
    security(
        ("adminKey" = [])
    )
)]
pub async fn reconcile(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<AdminReconcileRequest>, JsonRejection>,
) -> Result<Json<AdminReconcileResponse>, PurchaseError> {
    // Hidden entirely unless an operator key is configured
    let expected = state.admin_api_key.as_deref().ok_or(PurchaseError::NotFound)?;
    let provided = headers
        .get(ADMIN_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if !bool::from(provided.as_bytes().ct_eq(expected.as_bytes())) {
        warn!("Admin reconcile rejected: bad or missing admin key");
        return Err(PurchaseError::Unauthorized);
    }

    let Json(request) =
        payload.map_err(|_| PurchaseError::InvalidRequest("Invalid JSON body".to_string()))?;
    let payment_intent_id = trim_optional_field(request.payment_intent_id.as_ref());
    let user_email = trim_optional_field(request.user_email.as_ref());

    let results = match (payment_intent_id, user_email) {
        (Some(id), None) => {
            info!(payment_intent_id = %id, "Manual reconciliation by payment intent");
            state.backfill_service.reconcile_payment_intent(&id).await?
        },
        (None, Some(email)) => {
            info!("Manual reconciliation by customer email");
            state.backfill_service.reconcile_customer_email(&email).await?
        },
        _ => {
            return Err(PurchaseError::InvalidRequest(
                "Provide exactly one of paymentIntentId or userEmail".to_string(),
            ))
        },
    };

    Ok(Json(AdminReconcileResponse { results }))
}
