use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::models::client::*;
use crate::models::license::LicenseFull;
use crate::AppState;

pub async fn list_clients(
    State(state): State<AppState>,
    Query(query): Query<ClientQuery>,
) -> AppResult<Json<Value>> {
    let clients: Vec<Client> = match query.busqueda.as_deref().filter(|s| !s.is_empty()) {
        Some(term) => {
            let pattern = format!("%{}%", term);
            sqlx::query_as(
                "SELECT * FROM clients WHERE name ILIKE $1 OR email ILIKE $1 OR company ILIKE $1 ORDER BY created_at DESC",
            )
            .bind(&pattern)
            .fetch_all(&state.db)
            .await?
        }
        None => {
            sqlx::query_as("SELECT * FROM clients ORDER BY created_at DESC")
                .fetch_all(&state.db)
                .await?
        }
    };

    Ok(Json(json!({ "success": true, "data": clients })))
}

pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let client: Client = sqlx::query_as("SELECT * FROM clients WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".into()))?;

    Ok(Json(json!({ "success": true, "data": client })))
}

pub async fn get_client_licenses(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let client: Client = sqlx::query_as("SELECT * FROM clients WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Client not found".into()))?;

    let licenses: Vec<LicenseFull> =
        sqlx::query_as("SELECT * FROM licenses_full WHERE client_id = $1 ORDER BY created_at DESC")
            .bind(id)
            .fetch_all(&state.db)
            .await?;

    Ok(Json(
        json!({ "success": true, "data": { "client": client, "licenses": licenses } }),
    ))
}

pub async fn create_client(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateClientRequest>,
) -> AppResult<Json<Value>> {
    if body.name.trim().is_empty() {
        return Err(AppError::BadRequest("Name required".into()));
    }
    if !is_valid_email(&body.email) {
        return Err(AppError::BadRequest("Invalid email".into()));
    }

    let client: Client = sqlx::query_as(
        r#"INSERT INTO clients (id, name, email, phone, company, created_by)
        VALUES (gen_random_uuid(), $1, $2, $3, $4, $5)
        RETURNING *"#,
    )
    .bind(body.name.trim())
    .bind(&body.email)
    .bind(&body.phone)
    .bind(&body.company)
    .bind(auth.id)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(json!({ "success": true, "data": client })))
}

pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateClientRequest>,
) -> AppResult<Json<Value>> {
    if let Some(email) = body.email.as_deref() {
        if !is_valid_email(email) {
            return Err(AppError::BadRequest("Invalid email".into()));
        }
    }

    let client: Client = sqlx::query_as(
        r#"UPDATE clients SET
            name = COALESCE($2, name),
            email = COALESCE($3, email),
            phone = COALESCE($4, phone),
            company = COALESCE($5, company)
        WHERE id = $1
        RETURNING *"#,
    )
    .bind(id)
    .bind(&body.name)
    .bind(&body.email)
    .bind(&body.phone)
    .bind(&body.company)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Client not found".into()))?;

    Ok(Json(json!({ "success": true, "data": client })))
}

pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let result = sqlx::query("DELETE FROM clients WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Client not found".into()));
    }

    Ok(Json(json!({ "success": true, "message": "Client deleted" })))
}
