use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const LICENSE_TYPE_ONE_TIME: &str = "licencia_unica";
pub const LICENSE_TYPE_SUBSCRIPTION: &str = "suscripcion";

pub const LICENSE_STATUS_ACTIVE: &str = "activa";
pub const LICENSE_STATUS_INACTIVE: &str = "inactiva";
pub const LICENSE_STATUS_PENDING_PAYMENT: &str = "pendiente_pago";

pub fn is_valid_license_type(t: &str) -> bool {
    t == LICENSE_TYPE_ONE_TIME || t == LICENSE_TYPE_SUBSCRIPTION
}

pub fn is_valid_license_status(s: &str) -> bool {
    s == LICENSE_STATUS_ACTIVE || s == LICENSE_STATUS_INACTIVE || s == LICENSE_STATUS_PENDING_PAYMENT
}

/// Line-item description shown on the Stripe checkout page.
pub fn payment_description(license_type: &str) -> &'static str {
    if license_type == LICENSE_TYPE_ONE_TIME {
        "Licencia única"
    } else {
        "Suscripción mensual"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct License {
    pub id: Uuid,
    pub client_id: Uuid,
    pub product_id: Uuid,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub license_type: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: String,
    pub stripe_subscription_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// License joined with its client and product plus the price that applies
/// to its type. `is_expired` is computed against the current date in SQL.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LicenseFull {
    pub id: Uuid,
    pub client_id: Uuid,
    pub product_id: Uuid,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub license_type: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: String,
    pub stripe_subscription_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub client_name: String,
    pub client_email: String,
    pub client_company: Option<String>,
    pub product_name: String,
    pub product_description: Option<String>,
    pub price_cents: i64,
    pub is_expired: bool,
}

#[derive(Debug, Deserialize)]
pub struct CreateLicenseRequest {
    pub client_id: Uuid,
    pub product_id: Uuid,
    #[serde(rename = "type")]
    pub license_type: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLicenseRequest {
    #[serde(rename = "type")]
    pub license_type: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLicenseStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct LicenseQuery {
    pub estado: Option<String>,
    pub tipo: Option<String>,
    pub cliente: Option<Uuid>,
    pub producto: Option<Uuid>,
    pub vencida: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_and_status_validation() {
        assert!(is_valid_license_type("licencia_unica"));
        assert!(is_valid_license_type("suscripcion"));
        assert!(!is_valid_license_type("perpetua"));

        assert!(is_valid_license_status("activa"));
        assert!(is_valid_license_status("inactiva"));
        assert!(is_valid_license_status("pendiente_pago"));
        assert!(!is_valid_license_status("activo"));
    }

    #[test]
    fn checkout_descriptions() {
        assert_eq!(payment_description("licencia_unica"), "Licencia única");
        assert_eq!(payment_description("suscripcion"), "Suscripción mensual");
    }
}
