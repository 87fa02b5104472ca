// API documentation: utoipa-generated OpenAPI document

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};

use crate::handlers::{account, admin, checkout, entitlement, webhook};
use crate::models::{
    CheckoutRequest, CheckoutResponse, DeleteAccountRequest, DeleteAccountResponse,
    EntitlementStatus, Purchase,
};
use crate::services::{backfill::BackfillResult, features::PlanFeatures};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Loged.in Purchase API",
        description = "Lifetime Pro checkout, payment webhooks, and entitlement reads",
        version = "1.0.0"
    ),
    paths(
        checkout::create_checkout,
        webhook::stripe_webhook,
        entitlement::get_entitlement,
        entitlement::get_features,
        entitlement::entitlement_stream,
        account::delete_account,
        admin::reconcile,
    ),
    components(schemas(
        CheckoutRequest,
        CheckoutResponse,
        EntitlementStatus,
        Purchase,
        PlanFeatures,
        DeleteAccountRequest,
        DeleteAccountResponse,
        admin::AdminReconcileRequest,
        admin::AdminReconcileResponse,
        BackfillResult,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "Purchase", description = "Checkout and payment reconciliation"),
        (name = "Entitlement", description = "Lifetime Pro status and feature gates"),
        (name = "Account", description = "Account lifecycle hooks"),
        (name = "Admin", description = "Operator reconciliation")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearerAuth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
            components.add_security_scheme(
                "adminKey",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(admin::ADMIN_KEY_HEADER))),
            );
        }
    }
}

/// Serve OpenAPI JSON specification at /docs/openapi.json
pub async fn serve_openapi_spec() -> Response {
    match ApiDoc::openapi().to_json() {
        Ok(spec) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            spec,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to render OpenAPI document: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        },
    }
}
