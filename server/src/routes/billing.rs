use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::license::{payment_description, LicenseFull, LICENSE_STATUS_INACTIVE};
use crate::services::license_sync;
use crate::services::stripe_service::{CheckoutSessionParams, StripeClient};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateCheckoutRequest {
    pub license_id: Option<Uuid>,
}

fn stripe_client(state: &AppState) -> AppResult<&StripeClient> {
    state
        .stripe
        .as_ref()
        .ok_or_else(|| AppError::Stripe("Stripe no está configurado".into()))
}

/// Starts a Stripe Checkout session for a license. One-off licenses pay
/// once, subscriptions start a monthly recurring plan.
pub async fn create_checkout(
    State(state): State<AppState>,
    body: Option<Json<CreateCheckoutRequest>>,
) -> AppResult<Json<Value>> {
    let stripe = stripe_client(&state)?;

    let license_id = body
        .and_then(|Json(b)| b.license_id)
        .ok_or_else(|| AppError::BadRequest("License ID requerido".into()))?;

    let license: Option<LicenseFull> = sqlx::query_as("SELECT * FROM licenses_full WHERE id = $1")
        .bind(license_id)
        .fetch_optional(&state.db)
        .await?;
    let license = license.ok_or_else(|| AppError::NotFound("Licencia no encontrada".into()))?;

    if license.price_cents <= 0 {
        return Err(AppError::BadRequest(format!(
            "El producto \"{}\" no tiene un precio configurado para el tipo de licencia \"{}\". \
             Por favor, edita el producto y configura el precio correspondiente.",
            license.product_name, license.license_type
        )));
    }

    let id_str = license.id.to_string();
    let success_url = state
        .config
        .stripe
        .success_url
        .replace("{license_id}", &id_str);
    let cancel_url = state
        .config
        .stripe
        .cancel_url
        .replace("{license_id}", &id_str);

    let session = stripe
        .create_checkout_session(&CheckoutSessionParams {
            license_id: &id_str,
            license_type: &license.license_type,
            client_email: &license.client_email,
            product_name: &license.product_name,
            description: payment_description(&license.license_type),
            amount_cents: license.price_cents,
            success_url: &success_url,
            cancel_url: &cancel_url,
        })
        .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "session_id": session["id"],
            "url": session["url"],
        }
    })))
}

/// Reports where a checkout session stands, for the payment result pages.
pub async fn get_checkout_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> AppResult<Json<Value>> {
    let stripe = stripe_client(&state)?;
    let session = stripe.get_checkout_session(&session_id).await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "id": session["id"],
            "status": session["status"],
            "payment_status": session["payment_status"],
        }
    })))
}

/// Cancels the provider subscription and deactivates the license carrying it.
pub async fn cancel_subscription(
    State(state): State<AppState>,
    Path(subscription_id): Path<String>,
) -> AppResult<Json<Value>> {
    let stripe = stripe_client(&state)?;
    let subscription = stripe.cancel_subscription(&subscription_id).await?;

    let license_id: Option<Uuid> = license_sync::mark_license_status_by_subscription(
        &state.db,
        &subscription_id,
        LICENSE_STATUS_INACTIVE,
    )
    .await?;
    if license_id.is_none() {
        tracing::warn!(
            subscription_id = %subscription_id,
            "Cancelled a subscription no license references"
        );
    }

    Ok(Json(json!({
        "success": true,
        "data": {
            "subscription_id": subscription_id,
            "status": subscription["status"],
            "license_id": license_id,
        },
        "message": "Suscripción cancelada"
    })))
}
