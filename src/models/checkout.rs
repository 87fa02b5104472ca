use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::utils::validation::trim_optional_field;

/// Request payload for `POST /checkout`.
/// Fields are optional at the wire level so a missing one is reported as a
/// validation error instead of a JSON rejection.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(default)]
    pub user_id: Option<String>,

    #[serde(default)]
    #[validate(email(message = "userEmail must be a valid email address"))]
    pub user_email: Option<String>,

    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "priceReference is too long"))]
    pub price_reference: Option<String>,
}

impl CheckoutRequest {
    /// Trim every field and drop blank ones
    pub fn normalized(self) -> Self {
        Self {
            user_id: trim_optional_field(self.user_id.as_ref()),
            user_email: trim_optional_field(self.user_email.as_ref()),
            price_reference: trim_optional_field(self.price_reference.as_ref()),
        }
    }
}

/// A request that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedCheckout {
    pub user_id: Uuid,
    pub user_email: String,
    pub price_reference: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    /// Provider-hosted checkout page
    pub redirect_url: String,
    pub session_id: String,
}
