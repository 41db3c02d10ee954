use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One settled charge, appended by the Stripe webhook. The sales chart is a
/// reduction over these rows.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Payment {
    pub id: Uuid,
    pub license_id: Option<Uuid>,
    pub stripe_session_id: Option<String>,
    pub stripe_invoice_id: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct StripeEvent {
    pub id: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub status: String,
    pub received_at: DateTime<Utc>,
}
