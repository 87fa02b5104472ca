// Account deletion hook: revokes entitlements, keeps the rows

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::{
    app::AppState,
    handlers::parse_user_id,
    middleware::auth::AuthContext,
    models::entitlement::{DeleteAccountRequest, DeleteAccountResponse},
    utils::purchase_errors::PurchaseError,
};

/// Revoke every active entitlement of a deleted account
/// DELETE /account
#[utoipa::path(
    delete,
    path = "/account",
    tag = "Account",
    operation_id = "deleteAccount",
    request_body = DeleteAccountRequest,
    responses(
        (status = 200, description = "Entitlements revoked", body = DeleteAccountResponse),
        (status = 400, description = "Missing or invalid userId"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn delete_account(
    State(state): State<AppState>,
    auth: AuthContext,
    payload: Result<Json<DeleteAccountRequest>, JsonRejection>,
) -> Result<Json<DeleteAccountResponse>, PurchaseError> {
    let Json(request) =
        payload.map_err(|_| PurchaseError::InvalidRequest("Invalid JSON body".to_string()))?;
    let user_id = parse_user_id(request.user_id.as_ref())?;
    auth.authorize(user_id)?;

    let revoked = state.account_service.revoke_entitlements(user_id).await?;
    Ok(Json(DeleteAccountResponse {
        revoked: revoked.len(),
    }))
}
