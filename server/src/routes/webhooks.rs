use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde_json::{json, Value};

use crate::services::license_sync;
use crate::AppState;

/// Stripe event receiver. Signature-checked, idempotent on event id,
/// always answers `{"received": true}` so Stripe stops retrying.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, StatusCode> {
    let stripe = match &state.stripe {
        Some(s) => s,
        None => return Ok(Json(json!({ "received": true }))),
    };

    let sig = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let event = match stripe.verify_webhook_signature(&body, sig) {
        Ok(e) => e,
        Err(_) => return Err(StatusCode::BAD_REQUEST),
    };

    // An id-less payload cannot be deduplicated; treat it as malformed.
    if event["id"].as_str().filter(|s| !s.is_empty()).is_none() {
        return Err(StatusCode::BAD_REQUEST);
    }

    // Stripe retries until acknowledged; a replayed event must be a no-op.
    // The pool doubles as the event ledger backed by `stripe_events`.
    license_sync::apply_event_idempotent(&state.db, &state.db, &event).await;

    Ok(Json(json!({ "received": true })))
}
