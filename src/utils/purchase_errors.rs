// Error taxonomy for checkout, webhook, and entitlement endpoints
// Internal detail is logged by the caller and never rendered into responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::db::StoreError;
use crate::services::payment_provider::ProviderError;
use crate::services::stripe::SignatureError;

#[derive(Error, Debug)]
pub enum PurchaseError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden")]
    Forbidden,

    #[error("Not found")]
    NotFound,

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Signature invalid: {0}")]
    SignatureInvalid(#[from] SignatureError),

    #[error("Payment {payment_reference} carries no user reference")]
    UserReferenceMissing { payment_reference: String },

    #[error("Upstream error: {0}")]
    UpstreamError(#[from] ProviderError),

    #[error("Persistence error: {0}")]
    PersistenceError(#[from] StoreError),
}

impl PurchaseError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PurchaseError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            PurchaseError::Unauthorized => StatusCode::UNAUTHORIZED,
            PurchaseError::Forbidden => StatusCode::FORBIDDEN,
            PurchaseError::NotFound => StatusCode::NOT_FOUND,
            PurchaseError::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PurchaseError::SignatureInvalid(_) => StatusCode::BAD_REQUEST,
            // Acknowledged: redelivery cannot add the missing field
            PurchaseError::UserReferenceMissing { .. } => StatusCode::OK,
            PurchaseError::UpstreamError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            PurchaseError::PersistenceError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether the payment provider should redeliver the event
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PurchaseError::UpstreamError(_) | PurchaseError::PersistenceError(_)
        )
    }

    fn public_message(&self) -> String {
        match self {
            PurchaseError::InvalidRequest(msg) => msg.clone(),
            PurchaseError::Unauthorized => "Authentication required".to_string(),
            PurchaseError::Forbidden => "Not allowed for this user".to_string(),
            PurchaseError::NotFound => "Resource not found".to_string(),
            PurchaseError::ConfigurationError(_) => {
                "Checkout is not available right now".to_string()
            },
            PurchaseError::SignatureInvalid(_) => "Invalid signature".to_string(),
            PurchaseError::UserReferenceMissing { .. } => String::new(),
            PurchaseError::UpstreamError(_) => {
                "Payment provider unavailable, please retry".to_string()
            },
            PurchaseError::PersistenceError(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for PurchaseError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if let PurchaseError::UserReferenceMissing { .. } = self {
            return (status, Json(json!({ "received": true }))).into_response();
        }

        let body = Json(json!({
            "error": self.public_message(),
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<validator::ValidationErrors> for PurchaseError {
    fn from(error: validator::ValidationErrors) -> Self {
        PurchaseError::InvalidRequest(error.to_string())
    }
}
