// Entitlement read endpoints: one-shot, live stream, and feature gates

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures_util::stream::{self, Stream};
use serde::Deserialize;
use tracing::{debug, warn};
use utoipa::IntoParams;

use crate::{
    app::AppState,
    handlers::parse_user_id,
    middleware::auth::AuthContext,
    models::entitlement::EntitlementStatus,
    services::{entitlement::EntitlementWatcher, features::PlanFeatures},
    utils::purchase_errors::PurchaseError,
};

const STREAM_EVENT_NAME: &str = "entitlement";
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct EntitlementQuery {
    /// Supabase user id
    pub user_id: Option<String>,
}

/// Current Lifetime Pro status for a user
/// GET /entitlement?userId=
#[utoipa::path(
    get,
    path = "/entitlement",
    tag = "Entitlement",
    operation_id = "getEntitlement",
    params(EntitlementQuery),
    responses(
        (status = 200, description = "Entitlement status; record omitted when absent", body = EntitlementStatus),
        (status = 400, description = "Missing or invalid userId"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn get_entitlement(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<EntitlementQuery>,
) -> Result<Json<EntitlementStatus>, PurchaseError> {
    let user_id = parse_user_id(query.user_id.as_ref())?;
    auth.authorize(user_id)?;

    Ok(Json(state.entitlement_reader.status(user_id).await))
}

/// Feature gates derived from the entitlement
/// GET /entitlement/features?userId=
#[utoipa::path(
    get,
    path = "/entitlement/features",
    tag = "Entitlement",
    operation_id = "getPlanFeatures",
    params(EntitlementQuery),
    responses(
        (status = 200, description = "Feature gates for the user's plan", body = PlanFeatures),
        (status = 400, description = "Missing or invalid userId"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn get_features(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<EntitlementQuery>,
) -> Result<Json<PlanFeatures>, PurchaseError> {
    let user_id = parse_user_id(query.user_id.as_ref())?;
    auth.authorize(user_id)?;

    let status = state.entitlement_reader.status(user_id).await;
    Ok(Json(PlanFeatures::for_entitlement(&status)))
}

/// Live entitlement updates as Server-Sent Events
/// GET /entitlement/stream?userId=
#[utoipa::path(
    get,
    path = "/entitlement/stream",
    tag = "Entitlement",
    operation_id = "streamEntitlement",
    params(EntitlementQuery),
    responses(
        (status = 200, description = "`entitlement` events: current status first, then each change",
            content_type = "text/event-stream", body = EntitlementStatus),
        (status = 400, description = "Missing or invalid userId"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    security(
        ("bearerAuth" = [])
    )
)]
pub async fn entitlement_stream(
    State(state): State<AppState>,
    auth: AuthContext,
    Query(query): Query<EntitlementQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, PurchaseError> {
    let user_id = parse_user_id(query.user_id.as_ref())?;
    auth.authorize(user_id)?;

    debug!(%user_id, "Entitlement stream opened");
    let watcher = state.entitlement_reader.watch(user_id);

    Ok(Sse::new(status_stream(watcher))
        .keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL)))
}

/// Initial status, then one event per visible change
fn status_stream(watcher: EntitlementWatcher) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold((watcher, true), |(mut watcher, initial)| async move {
        let status = if initial {
            Some(watcher.refresh().await)
        } else {
            watcher.next_change().await
        };

        status.map(|status| (Ok(status_event(&status)), (watcher, false)))
    })
}

fn status_event(status: &EntitlementStatus) -> Event {
    Event::default()
        .event(STREAM_EVENT_NAME)
        .json_data(status)
        .unwrap_or_else(|e| {
            warn!("Failed to serialize entitlement event: {}", e);
            Event::default().comment("serialization failed")
        })
}
