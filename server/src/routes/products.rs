use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::product::*;
use crate::AppState;

pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<Value>> {
    let products: Vec<Product> = match query.busqueda.as_deref().filter(|s| !s.is_empty()) {
        Some(term) => {
            let pattern = format!("%{}%", term);
            sqlx::query_as("SELECT * FROM products WHERE name ILIKE $1 ORDER BY name ASC")
                .bind(&pattern)
                .fetch_all(&state.db)
                .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM products ORDER BY name ASC")
                .fetch_all(&state.db)
                .await?
        }
    };

    Ok(Json(json!({ "success": true, "data": products })))
}

pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let product: Product = sqlx::query_as("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product not found".into()))?;

    Ok(Json(json!({ "success": true, "data": product })))
}

pub async fn create_product(
    State(state): State<AppState>,
    Json(body): Json<CreateProductRequest>,
) -> AppResult<Json<Value>> {
    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name required".into()));
    }
    if body.price_one_payment_cents < 0 || body.price_subscription_cents < 0 {
        return Err(AppError::BadRequest("Prices must not be negative".into()));
    }

    let product: Product = sqlx::query_as(
        r#"INSERT INTO products (id, name, description, price_one_payment_cents, price_subscription_cents)
        VALUES (gen_random_uuid(), $1, $2, $3, $4)
        RETURNING *"#,
    )
    .bind(body.name.trim())
    .bind(&body.description)
    .bind(body.price_one_payment_cents)
    .bind(body.price_subscription_cents)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(json!({ "success": true, "data": product })))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateProductRequest>,
) -> AppResult<Json<Value>> {
    if body.price_one_payment_cents.is_some_and(|p| p < 0)
        || body.price_subscription_cents.is_some_and(|p| p < 0)
    {
        return Err(AppError::BadRequest("Prices must not be negative".into()));
    }

    let product: Product = sqlx::query_as(
        r#"UPDATE products SET
            name = COALESCE($2, name),
            description = COALESCE($3, description),
            price_one_payment_cents = COALESCE($4, price_one_payment_cents),
            price_subscription_cents = COALESCE($5, price_subscription_cents)
        WHERE id = $1
        RETURNING *"#,
    )
    .bind(id)
    .bind(&body.name)
    .bind(&body.description)
    .bind(body.price_one_payment_cents)
    .bind(body.price_subscription_cents)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Product not found".into()))?;

    Ok(Json(json!({ "success": true, "data": product })))
}

pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Product not found".into()));
    }

    Ok(Json(json!({ "success": true, "message": "Product deleted" })))
}
