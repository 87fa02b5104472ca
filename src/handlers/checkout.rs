// Checkout initiation endpoint

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use crate::{
    app::AppState,
    middleware::auth::AuthContext,
    models::checkout::{CheckoutRequest, CheckoutResponse},
    utils::purchase_errors::PurchaseError,
};

/// Open a hosted checkout session for Lifetime Pro
/// POST /checkout
#[utoipa::path(
    post,
    path = "/checkout",
    tag = "Purchase",
    operation_id = "createCheckout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Checkout session created", body = CheckoutResponse),
        (status = 400, description = "Bad request - validation failed"),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Forbidden - userId does not match token"),
        (status = 500, description = "Checkout not configured or payment provider unavailable")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn create_checkout(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match payload {
        Ok(json) => json,
        Err(rejection) => {
            warn!("Rejected checkout body: {}", rejection.body_text());
            return PurchaseError::InvalidRequest("Invalid JSON body".to_string()).into_response();
        },
    };

    let checkout = match state.checkout_service.validate(request) {
        Ok(checkout) => checkout,
        Err(e) => return e.into_response(),
    };

    if let Err(e) = auth.authorize(checkout.user_id) {
        return e.into_response();
    }

    match state.checkout_service.create_session(&checkout).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => e.into_response(),
    }
}
