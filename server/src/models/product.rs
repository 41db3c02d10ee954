use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prices are integer cents. A product carries one price per license type;
/// a zero means that type is not sold for this product.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_one_payment_cents: i64,
    pub price_subscription_cents: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    pub price_one_payment_cents: i64,
    pub price_subscription_cents: i64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_one_payment_cents: Option<i64>,
    pub price_subscription_cents: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    pub busqueda: Option<String>,
}
