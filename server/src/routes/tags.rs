use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::contact::{Contact, CreateTagRequest, Tag, UpdateTagRequest};
use crate::AppState;

const DEFAULT_TAG_COLOR: &str = "#6366f1";

pub async fn list_tags(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let tags: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY name ASC")
        .fetch_all(&state.db)
        .await?;

    Ok(Json(json!({ "success": true, "data": tags })))
}

pub async fn create_tag(
    State(state): State<AppState>,
    Json(body): Json<CreateTagRequest>,
) -> AppResult<Json<Value>> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name required".into()));
    }

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tags WHERE name = $1)")
        .bind(name)
        .fetch_one(&state.db)
        .await?;
    if exists {
        return Err(AppError::Conflict("Tag already exists".into()));
    }

    let color = body
        .color
        .unwrap_or_else(|| DEFAULT_TAG_COLOR.to_string());

    let tag: Tag =
        sqlx::query_as("INSERT INTO tags (id, name, color) VALUES (gen_random_uuid(), $1, $2) RETURNING *")
            .bind(name)
            .bind(&color)
            .fetch_one(&state.db)
            .await?;

    Ok(Json(
        json!({ "success": true, "message": "Tag creado exitosamente", "data": tag }),
    ))
}

pub async fn update_tag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateTagRequest>,
) -> AppResult<Json<Value>> {
    let tag: Tag = sqlx::query_as(
        r#"UPDATE tags SET
            name = COALESCE($2, name),
            color = COALESCE($3, color)
        WHERE id = $1
        RETURNING *"#,
    )
    .bind(id)
    .bind(&body.name)
    .bind(&body.color)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Tag not found".into()))?;

    Ok(Json(
        json!({ "success": true, "message": "Tag actualizado exitosamente", "data": tag }),
    ))
}

pub async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let result = sqlx::query("DELETE FROM tags WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Tag not found".into()));
    }

    Ok(Json(
        json!({ "success": true, "message": "Tag eliminado exitosamente" }),
    ))
}

pub async fn get_tag_contacts(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let tag_found: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tags WHERE id = $1)")
        .bind(id)
        .fetch_one(&state.db)
        .await?;
    if !tag_found {
        return Err(AppError::NotFound("Tag not found".into()));
    }

    let contacts: Vec<Contact> = sqlx::query_as(
        r#"SELECT c.* FROM contacts c
        JOIN contact_tags ct ON ct.contact_id = c.id
        WHERE ct.tag_id = $1
        ORDER BY c.created_at DESC"#,
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "success": true, "data": contacts })))
}
