//! Admin HTTP endpoints: statistics, list reload, and relay information.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use nostr_ingest_store::Store;

use crate::error::RelayError;
use crate::info::RelayStats;
use crate::relay::Relay;

/// Media type of the NIP-11 document.
pub const NOSTR_JSON: &str = "application/nostr+json";

/// Build the admin router over a shared relay.
pub fn router<S: Store + 'static>(relay: Arc<Relay<S>>) -> Router {
    Router::new()
        .route("/", get(relay_information::<S>))
        .route("/info", get(info::<S>))
        .route("/reload", post(reload::<S>))
        .with_state(relay)
}

struct AdminError(RelayError);

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        tracing::error!(error = %self.0, "admin request failed");
        (StatusCode::INTERNAL_SERVER_ERROR, self.0.to_string()).into_response()
    }
}

/// Event count, pool connections, and supported NIPs.
async fn info<S: Store + 'static>(
    State(relay): State<Arc<Relay<S>>>,
) -> Result<Json<RelayStats>, AdminError> {
    relay.stats().await.map(Json).map_err(AdminError)
}

/// Reload the access lists. Always 200; failures are logged.
async fn reload<S: Store + 'static>(State(relay): State<Arc<Relay<S>>>) -> StatusCode {
    relay.reload_access_lists().await;
    StatusCode::OK
}

/// NIP-11 document for clients asking for it; a plain banner otherwise.
async fn relay_information<S: Store + 'static>(
    State(relay): State<Arc<Relay<S>>>,
    headers: HeaderMap,
) -> Response {
    let wants_document = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains(NOSTR_JSON));

    if !wants_document {
        return (StatusCode::OK, "Please use a Nostr client to connect.").into_response();
    }

    (
        [
            (header::CONTENT_TYPE, NOSTR_JSON),
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        ],
        Json(relay.information().clone()),
    )
        .into_response()
}
