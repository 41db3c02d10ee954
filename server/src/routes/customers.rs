use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::models::client::is_valid_email;
use crate::models::contact::*;
use crate::models::opportunity::Opportunity;
use crate::models::task::Task;
use crate::AppState;

/// OFFSET for a 1-based page, saturating so an absurd page number cannot
/// overflow into a negative offset.
fn page_offset(page: i64, per_page: i64) -> i64 {
    (page - 1).saturating_mul(per_page)
}

fn trimmed(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

async fn contact_exists(db: &sqlx::PgPool, id: Uuid) -> AppResult<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM contacts WHERE id = $1)")
        .bind(id)
        .fetch_one(db)
        .await?;
    if exists {
        Ok(())
    } else {
        Err(AppError::NotFound("Cliente no encontrado".into()))
    }
}

/// `busqueda` short-circuits into a capped search; otherwise a paginated
/// listing filtered by `estado` (Spanish values mapped onto the schema) and
/// `tipo`.
pub async fn list_customers(
    State(state): State<AppState>,
    Query(query): Query<CustomerQuery>,
) -> AppResult<Json<Value>> {
    if let Some(term) = query.busqueda.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", term);
        let contacts: Vec<Contact> = sqlx::query_as(
            r#"SELECT * FROM contacts
            WHERE first_name ILIKE $1 OR last_name ILIKE $1 OR email ILIKE $1
               OR company_name ILIKE $1 OR phone ILIKE $1
            ORDER BY created_at DESC
            LIMIT 20"#,
        )
        .bind(&pattern)
        .fetch_all(&state.db)
        .await?;

        let total = contacts.len();
        return Ok(Json(json!({
            "success": true,
            "data": contacts,
            "total": total,
            "page": 1,
            "limite": total,
            "tiene_mas": false,
        })));
    }

    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.limite.unwrap_or(50).clamp(1, 100);
    let status = query.estado.as_deref().map(map_estado);

    let total: i64 = sqlx::query_scalar(
        r#"SELECT COUNT(*)::bigint FROM contacts
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::text IS NULL OR contact_type = $2)"#,
    )
    .bind(status)
    .bind(&query.tipo)
    .fetch_one(&state.db)
    .await?;

    let contacts: Vec<Contact> = sqlx::query_as(
        r#"SELECT * FROM contacts
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::text IS NULL OR contact_type = $2)
        ORDER BY created_at DESC
        LIMIT $3 OFFSET $4"#,
    )
    .bind(status)
    .bind(&query.tipo)
    .bind(per_page)
    .bind(page_offset(page, per_page))
    .fetch_all(&state.db)
    .await?;

    let total_pages = (total + per_page - 1) / per_page;
    Ok(Json(json!({
        "success": true,
        "data": contacts,
        "total": total,
        "page": page,
        "limite": per_page,
        "tiene_mas": page < total_pages,
    })))
}

pub async fn create_customer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateCustomerRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let nombre = body.nombre.trim();
    if nombre.chars().count() < 2 {
        return Err(AppError::BadRequest(
            "El nombre es requerido y debe tener al menos 2 caracteres".into(),
        ));
    }

    let email = body
        .correo_electronico
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);

    if let Some(email) = email.as_deref() {
        if !is_valid_email(email) {
            return Err(AppError::BadRequest(
                "El correo electrónico no es válido".into(),
            ));
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM contacts WHERE LOWER(email) = $1)")
                .bind(email)
                .fetch_one(&state.db)
                .await?;
        if exists {
            return Err(AppError::Conflict(
                "Ya existe un contacto con este correo electrónico".into(),
            ));
        }
    }

    // Spanish form estados; anything unrecognized lands as active
    let status = match body.estado.as_deref() {
        Some("inactivo") => "inactive",
        Some("prospecto") => "qualified",
        Some("lead") => "new",
        _ => "active",
    };

    let contact: Contact = sqlx::query_as(
        r#"INSERT INTO contacts (id, first_name, email, phone, company_name, contact_type, status, source, notes, assigned_to)
        VALUES (gen_random_uuid(), $1, $2, $3, $4, 'customer', $5, 'manual', $6, $7)
        RETURNING *"#,
    )
    .bind(nombre)
    .bind(&email)
    .bind(trimmed(&body.telefono))
    .bind(trimmed(&body.empresa))
    .bind(status)
    .bind(trimmed(&body.notas))
    .bind(auth.id)
    .fetch_one(&state.db)
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Cliente creado exitosamente",
            "data": contact,
        })),
    ))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let contact: Contact = sqlx::query_as("SELECT * FROM contacts WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Cliente no encontrado".into()))?;

    Ok(Json(json!({ "success": true, "data": contact })))
}

pub async fn update_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateCustomerRequest>,
) -> AppResult<Json<Value>> {
    let nombre = trimmed(&body.nombre);
    if let Some(nombre) = nombre.as_deref() {
        if nombre.chars().count() < 2 {
            return Err(AppError::BadRequest(
                "El nombre es requerido y debe tener al menos 2 caracteres".into(),
            ));
        }
    }

    let email = body
        .correo_electronico
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);
    if let Some(email) = email.as_deref() {
        if !is_valid_email(email) {
            return Err(AppError::BadRequest(
                "El correo electrónico no es válido".into(),
            ));
        }
    }

    let status = body.estado.as_deref().map(map_estado);

    let contact: Contact = sqlx::query_as(
        r#"UPDATE contacts SET
            first_name = COALESCE($2, first_name),
            email = COALESCE($3, email),
            phone = COALESCE($4, phone),
            company_name = COALESCE($5, company_name),
            status = COALESCE($6, status),
            notes = COALESCE($7, notes),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *"#,
    )
    .bind(id)
    .bind(&nombre)
    .bind(&email)
    .bind(trimmed(&body.telefono))
    .bind(trimmed(&body.empresa))
    .bind(status)
    .bind(trimmed(&body.notas))
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Cliente no encontrado".into()))?;

    Ok(Json(
        json!({ "success": true, "message": "Contacto actualizado exitosamente", "data": contact }),
    ))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Cliente no encontrado".into()));
    }

    Ok(Json(
        json!({ "success": true, "message": "Cliente eliminado exitosamente" }),
    ))
}

pub async fn get_customer_tags(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    contact_exists(&state.db, id).await?;

    let tags: Vec<Tag> = sqlx::query_as(
        r#"SELECT t.id, t.name, t.color FROM tags t
        JOIN contact_tags ct ON ct.tag_id = t.id
        WHERE ct.contact_id = $1
        ORDER BY t.name ASC"#,
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "success": true, "data": tags })))
}

pub async fn add_customer_tag(
    State(state): State<AppState>,
    Path((id, tag_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Value>> {
    contact_exists(&state.db, id).await?;

    let tag_found: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tags WHERE id = $1)")
        .bind(tag_id)
        .fetch_one(&state.db)
        .await?;
    if !tag_found {
        return Err(AppError::NotFound("Tag not found".into()));
    }

    sqlx::query(
        "INSERT INTO contact_tags (contact_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(id)
    .bind(tag_id)
    .execute(&state.db)
    .await?;

    Ok(Json(
        json!({ "success": true, "message": "Tag asignado al contacto" }),
    ))
}

pub async fn remove_customer_tag(
    State(state): State<AppState>,
    Path((id, tag_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<Value>> {
    sqlx::query("DELETE FROM contact_tags WHERE contact_id = $1 AND tag_id = $2")
        .bind(id)
        .bind(tag_id)
        .execute(&state.db)
        .await?;

    Ok(Json(
        json!({ "success": true, "message": "Tag removido del contacto" }),
    ))
}

pub async fn get_customer_interactions(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    contact_exists(&state.db, id).await?;

    let interactions: Vec<Interaction> = sqlx::query_as(
        "SELECT * FROM interactions WHERE contact_id = $1 ORDER BY interaction_date DESC",
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "success": true, "data": interactions })))
}

/// Records an interaction and refreshes the contact's `last_contact_date`.
pub async fn create_customer_interaction(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<CreateInteractionRequest>,
) -> AppResult<Json<Value>> {
    contact_exists(&state.db, id).await?;

    if body.interaction_type.trim().is_empty() {
        return Err(AppError::BadRequest("Interaction type required".into()));
    }

    let interaction: Interaction = sqlx::query_as(
        r#"INSERT INTO interactions (id, contact_id, type, notes, interaction_date)
        VALUES (gen_random_uuid(), $1, $2, $3, COALESCE($4, NOW()))
        RETURNING *"#,
    )
    .bind(id)
    .bind(body.interaction_type.trim())
    .bind(&body.notes)
    .bind(body.interaction_date)
    .fetch_one(&state.db)
    .await?;

    sqlx::query("UPDATE contacts SET last_contact_date = NOW(), updated_at = NOW() WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    Ok(Json(json!({ "success": true, "data": interaction })))
}

pub async fn get_customer_opportunities(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    contact_exists(&state.db, id).await?;

    let opportunities: Vec<Opportunity> = sqlx::query_as(
        "SELECT * FROM opportunities WHERE contact_id = $1 ORDER BY created_at DESC",
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(json!({ "success": true, "data": opportunities })))
}

pub async fn get_customer_tasks(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    contact_exists(&state.db, id).await?;

    let tasks: Vec<Task> =
        sqlx::query_as("SELECT * FROM tasks WHERE contact_id = $1 ORDER BY due_date ASC")
            .bind(id)
            .fetch_all(&state.db)
            .await?;

    Ok(Json(json!({ "success": true, "data": tasks })))
}

pub async fn update_customer_score(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateScoreRequest>,
) -> AppResult<Json<Value>> {
    if !(0..=100).contains(&body.score) {
        return Err(AppError::BadRequest(
            "Score must be between 0 and 100".into(),
        ));
    }

    let contact: Contact = sqlx::query_as(
        "UPDATE contacts SET score = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .bind(body.score)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound("Cliente no encontrado".into()))?;

    Ok(Json(
        json!({ "success": true, "message": "Score actualizado", "data": contact }),
    ))
}

pub async fn import_customers(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<Vec<ImportContact>>,
) -> AppResult<Json<Value>> {
    if body.is_empty() {
        return Err(AppError::BadRequest("No contacts to import".into()));
    }
    if body.iter().any(|c| c.first_name.trim().is_empty()) {
        return Err(AppError::BadRequest(
            "first_name is required for every contact".into(),
        ));
    }

    // One statement for the whole batch: a bad row rolls everything back.
    let batch = ImportBatch::from_rows(&body);
    let result = sqlx::query(
        r#"INSERT INTO contacts (id, first_name, last_name, email, phone, company_name, contact_type, status, source, notes, assigned_to)
        SELECT gen_random_uuid(), u.first_name, u.last_name, u.email, u.phone, u.company_name, u.contact_type, u.status, u.source, u.notes, $10
        FROM UNNEST($1::text[], $2::text[], $3::text[], $4::text[], $5::text[], $6::text[], $7::text[], $8::text[], $9::text[])
          AS u(first_name, last_name, email, phone, company_name, contact_type, status, source, notes)"#,
    )
    .bind(&batch.first_names)
    .bind(&batch.last_names)
    .bind(&batch.emails)
    .bind(&batch.phones)
    .bind(&batch.company_names)
    .bind(&batch.contact_types)
    .bind(&batch.statuses)
    .bind(&batch.sources)
    .bind(&batch.notes)
    .bind(auth.id)
    .execute(&state.db)
    .await?;
    let imported = result.rows_affected() as i64;

    Ok(Json(json!({
        "success": true,
        "message": format!("{} contactos importados exitosamente", imported),
        "imported": imported,
    })))
}

pub async fn customer_stats(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*)::bigint FROM contacts")
        .fetch_one(&state.db)
        .await?;

    let new_this_month: i64 = sqlx::query_scalar(
        "SELECT COUNT(*)::bigint FROM contacts WHERE created_at >= date_trunc('month', NOW())",
    )
    .fetch_one(&state.db)
    .await?;

    let by_type: Vec<(String, i64)> = sqlx::query_as(
        "SELECT contact_type, COUNT(*)::bigint FROM contacts GROUP BY contact_type ORDER BY contact_type",
    )
    .fetch_all(&state.db)
    .await?;

    let by_status: Vec<(String, i64)> = sqlx::query_as(
        "SELECT status, COUNT(*)::bigint FROM contacts GROUP BY status ORDER BY status",
    )
    .fetch_all(&state.db)
    .await?;

    let by_type: serde_json::Map<String, Value> = by_type
        .into_iter()
        .map(|(k, v)| (k, Value::from(v)))
        .collect();
    let by_status: serde_json::Map<String, Value> = by_status
        .into_iter()
        .map(|(k, v)| (k, Value::from(v)))
        .collect();

    Ok(Json(json!({
        "success": true,
        "data": {
            "total": total,
            "newThisMonth": new_this_month,
            "byType": by_type,
            "byStatus": by_status,
        }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_offset_is_zero_based() {
        assert_eq!(page_offset(1, 50), 0);
        assert_eq!(page_offset(2, 50), 50);
        assert_eq!(page_offset(3, 20), 40);
    }

    #[test]
    fn page_offset_saturates_on_huge_pages() {
        assert_eq!(page_offset(i64::MAX, 100), i64::MAX);
        assert_eq!(page_offset(i64::MAX, 1), i64::MAX - 1);
    }
}
