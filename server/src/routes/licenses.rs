use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::license::*;
use crate::AppState;

pub async fn list_licenses(
    State(state): State<AppState>,
    Query(query): Query<LicenseQuery>,
) -> AppResult<Json<Value>> {
    if let Some(estado) = query.estado.as_deref() {
        if !is_valid_license_status(estado) {
            return Err(AppError::BadRequest("Invalid license status".into()));
        }
    }
    if let Some(tipo) = query.tipo.as_deref() {
        if !is_valid_license_type(tipo) {
            return Err(AppError::BadRequest("Invalid license type".into()));
        }
    }

    let licenses: Vec<LicenseFull> = sqlx::query_as(
        r#"SELECT * FROM licenses_full
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::text IS NULL OR type = $2)
          AND ($3::uuid IS NULL OR client_id = $3)
          AND ($4::uuid IS NULL OR product_id = $4)
          AND ($5::boolean IS NULL OR is_expired = $5)
        ORDER BY created_at DESC"#,
    )
    .bind(&query.estado)
    .bind(&query.tipo)
    .bind(query.cliente)
    .bind(query.producto)
    .bind(query.vencida)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "success": true, "data": licenses })))
}

pub async fn get_license(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let license: License = sqlx::query_as("SELECT * FROM licenses WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("License not found".into()))?;

    Ok(Json(json!({ "success": true, "data": license })))
}

pub async fn get_license_full(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let license: LicenseFull = sqlx::query_as("SELECT * FROM licenses_full WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("License not found".into()))?;

    Ok(Json(json!({ "success": true, "data": license })))
}

pub async fn create_license(
    State(state): State<AppState>,
    Json(body): Json<CreateLicenseRequest>,
) -> AppResult<Json<Value>> {
    if !is_valid_license_type(&body.license_type) {
        return Err(AppError::BadRequest("Invalid license type".into()));
    }
    let status = body
        .status
        .unwrap_or_else(|| LICENSE_STATUS_ACTIVE.to_string());
    if !is_valid_license_status(&status) {
        return Err(AppError::BadRequest("Invalid license status".into()));
    }

    let client_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM clients WHERE id = $1)")
            .bind(body.client_id)
            .fetch_one(&state.db)
            .await?;
    if !client_exists {
        return Err(AppError::NotFound("Client not found".into()));
    }

    let product_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
            .bind(body.product_id)
            .fetch_one(&state.db)
            .await?;
    if !product_exists {
        return Err(AppError::NotFound("Product not found".into()));
    }

    let license: License = sqlx::query_as(
        r#"INSERT INTO licenses (id, client_id, product_id, type, start_date, end_date, status)
        VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, $6)
        RETURNING *"#,
    )
    .bind(body.client_id)
    .bind(body.product_id)
    .bind(&body.license_type)
    .bind(body.start_date)
    .bind(body.end_date)
    .bind(&status)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(json!({ "success": true, "data": license })))
}

pub async fn update_license(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateLicenseRequest>,
) -> AppResult<Json<Value>> {
    if let Some(t) = body.license_type.as_deref() {
        if !is_valid_license_type(t) {
            return Err(AppError::BadRequest("Invalid license type".into()));
        }
    }
    if let Some(s) = body.status.as_deref() {
        if !is_valid_license_status(s) {
            return Err(AppError::BadRequest("Invalid license status".into()));
        }
    }

    let license: License = sqlx::query_as(
        r#"UPDATE licenses SET
            type = COALESCE($2, type),
            start_date = COALESCE($3, start_date),
            end_date = COALESCE($4, end_date),
            status = COALESCE($5, status)
        WHERE id = $1
        RETURNING *"#,
    )
    .bind(id)
    .bind(&body.license_type)
    .bind(body.start_date)
    .bind(body.end_date)
    .bind(&body.status)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("License not found".into()))?;

    Ok(Json(json!({ "success": true, "data": license })))
}

pub async fn update_license_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateLicenseStatusRequest>,
) -> AppResult<Json<Value>> {
    if !is_valid_license_status(&body.status) {
        return Err(AppError::BadRequest("Invalid license status".into()));
    }

    let license: License =
        sqlx::query_as("UPDATE licenses SET status = $2 WHERE id = $1 RETURNING *")
            .bind(id)
            .bind(&body.status)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| AppError::NotFound("License not found".into()))?;

    Ok(Json(json!({ "success": true, "data": license })))
}

pub async fn delete_license(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let result = sqlx::query("DELETE FROM licenses WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("License not found".into()));
    }

    Ok(Json(json!({ "success": true, "message": "License deleted" })))
}
