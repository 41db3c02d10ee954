use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::models::task::{
    CreateTaskRequest, TaskFull, TaskQuery, UpdateTaskRequest, TASK_COMPLETED, TASK_PENDING,
};
use crate::AppState;

const TASK_FULL_SQL: &str = "SELECT t.id, t.title, t.description, t.status, t.priority, t.due_date, \
     t.contact_id, t.opportunity_id, t.assigned_to, t.completed_at, t.created_at, t.updated_at, \
     c.first_name AS contact_first_name, c.last_name AS contact_last_name, \
     c.email AS contact_email, c.company_name AS contact_company_name, \
     o.title AS opportunity_title, o.value_cents AS opportunity_value_cents \
     FROM tasks t \
     LEFT JOIN contacts c ON c.id = t.contact_id \
     LEFT JOIN opportunities o ON o.id = t.opportunity_id";

fn task_json(t: &TaskFull) -> Value {
    let contact = t.contact_id.map(|id| {
        json!({
            "id": id,
            "first_name": t.contact_first_name,
            "last_name": t.contact_last_name,
            "email": t.contact_email,
            "company_name": t.contact_company_name,
        })
    });
    let opportunity = t.opportunity_id.map(|id| {
        json!({
            "id": id,
            "title": t.opportunity_title,
            "value_cents": t.opportunity_value_cents,
        })
    });
    json!({
        "id": t.id,
        "title": t.title,
        "description": t.description,
        "status": t.status,
        "priority": t.priority,
        "due_date": t.due_date,
        "contact_id": t.contact_id,
        "opportunity_id": t.opportunity_id,
        "assigned_to": t.assigned_to,
        "completed_at": t.completed_at,
        "created_at": t.created_at,
        "updated_at": t.updated_at,
        "contact": contact,
        "opportunity": opportunity,
    })
}

async fn fetch_task(state: &AppState, id: Uuid) -> AppResult<TaskFull> {
    let sql = format!("{} WHERE t.id = $1", TASK_FULL_SQL);
    let row: Option<TaskFull> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    row.ok_or_else(|| AppError::NotFound("Tarea no encontrada".into()))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<TaskQuery>,
) -> AppResult<Json<Value>> {
    let sql = format!(
        "{} WHERE ($1::text IS NULL OR t.status = $1) \
         AND ($2::text IS NULL OR t.priority = $2) \
         AND ($3::uuid IS NULL OR t.assigned_to = $3) \
         AND ($4::uuid IS NULL OR t.contact_id = $4) \
         AND ($5::uuid IS NULL OR t.opportunity_id = $5) \
         AND ($6::timestamptz IS NULL OR t.due_date >= $6) \
         AND ($7::timestamptz IS NULL OR t.due_date <= $7) \
         ORDER BY t.due_date ASC NULLS LAST",
        TASK_FULL_SQL
    );
    let rows: Vec<TaskFull> = sqlx::query_as(&sql)
        .bind(query.status.as_deref())
        .bind(query.priority.as_deref())
        .bind(query.assigned_to)
        .bind(query.contact_id)
        .bind(query.opportunity_id)
        .bind(query.due_from)
        .bind(query.due_to)
        .fetch_all(&state.db)
        .await?;

    let data: Vec<Value> = rows.iter().map(task_json).collect();
    Ok(Json(json!({ "success": true, "data": data })))
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let row = fetch_task(&state, id).await?;
    Ok(Json(json!({ "success": true, "data": task_json(&row) })))
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Json(body): Json<CreateTaskRequest>,
) -> AppResult<Json<Value>> {
    if body.title.trim().is_empty() {
        return Err(AppError::BadRequest("El título es requerido".into()));
    }

    // Unassigned tasks land on whoever created them.
    let assigned_to = body.assigned_to.unwrap_or(auth.id);
    let priority = body.priority.as_deref().unwrap_or("medium");

    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO tasks (id, title, description, status, priority, due_date, contact_id, opportunity_id, assigned_to, created_at, updated_at) \
         VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, $6, $7, $8, NOW(), NOW()) \
         RETURNING id",
    )
    .bind(body.title.trim())
    .bind(body.description.as_deref())
    .bind(TASK_PENDING)
    .bind(priority)
    .bind(body.due_date)
    .bind(body.contact_id)
    .bind(body.opportunity_id)
    .bind(assigned_to)
    .fetch_one(&state.db)
    .await?;

    let row = fetch_task(&state, id).await?;
    Ok(Json(json!({
        "success": true,
        "data": task_json(&row),
        "message": "Tarea creada exitosamente"
    })))
}

pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateTaskRequest>,
) -> AppResult<Json<Value>> {
    if let Some(title) = body.title.as_deref() {
        if title.trim().is_empty() {
            return Err(AppError::BadRequest("El título es requerido".into()));
        }
    }

    let updated: Option<Uuid> = sqlx::query_scalar(
        "UPDATE tasks SET \
            title = COALESCE($2, title), \
            description = COALESCE($3, description), \
            priority = COALESCE($4, priority), \
            due_date = COALESCE($5, due_date), \
            contact_id = COALESCE($6, contact_id), \
            opportunity_id = COALESCE($7, opportunity_id), \
            assigned_to = COALESCE($8, assigned_to), \
            updated_at = NOW() \
         WHERE id = $1 \
         RETURNING id",
    )
    .bind(id)
    .bind(body.title.as_deref().map(str::trim))
    .bind(body.description.as_deref())
    .bind(body.priority.as_deref())
    .bind(body.due_date)
    .bind(body.contact_id)
    .bind(body.opportunity_id)
    .bind(body.assigned_to)
    .fetch_optional(&state.db)
    .await?;

    if updated.is_none() {
        return Err(AppError::NotFound("Tarea no encontrada".into()));
    }

    let row = fetch_task(&state, id).await?;
    Ok(Json(json!({
        "success": true,
        "data": task_json(&row),
        "message": "Tarea actualizada exitosamente"
    })))
}

pub async fn complete_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let result = sqlx::query(
        "UPDATE tasks SET status = $2, completed_at = NOW(), updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(TASK_COMPLETED)
    .execute(&state.db)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Tarea no encontrada".into()));
    }

    let row = fetch_task(&state, id).await?;
    Ok(Json(json!({
        "success": true,
        "data": task_json(&row),
        "message": "Tarea completada"
    })))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Tarea no encontrada".into()));
    }
    Ok(Json(json!({
        "success": true,
        "message": "Tarea eliminada exitosamente"
    })))
}

async fn pending_tasks_where(state: &AppState, extra: &str) -> AppResult<Vec<TaskFull>> {
    let sql = format!(
        "{} WHERE t.status = $1{} ORDER BY t.due_date ASC NULLS LAST",
        TASK_FULL_SQL, extra
    );
    let rows: Vec<TaskFull> = sqlx::query_as(&sql)
        .bind(TASK_PENDING)
        .fetch_all(&state.db)
        .await?;
    Ok(rows)
}

pub async fn pending_tasks(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let rows = pending_tasks_where(&state, "").await?;
    let data: Vec<Value> = rows.iter().map(task_json).collect();
    Ok(Json(json!({ "success": true, "data": data })))
}

pub async fn overdue_tasks(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let rows = pending_tasks_where(&state, " AND t.due_date < NOW()").await?;
    let data: Vec<Value> = rows.iter().map(task_json).collect();
    Ok(Json(json!({ "success": true, "data": data })))
}

/// Pending tasks due within the current UTC day.
pub async fn today_tasks(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let rows = pending_tasks_where(
        &state,
        " AND t.due_date >= CURRENT_DATE AND t.due_date < CURRENT_DATE + INTERVAL '1 day'",
    )
    .await?;
    let data: Vec<Value> = rows.iter().map(task_json).collect();
    Ok(Json(json!({ "success": true, "data": data })))
}

pub async fn task_stats(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let (total, pending, completed, overdue): (i64, i64, i64, i64) = sqlx::query_as(
        "SELECT \
            COUNT(*)::bigint, \
            COUNT(CASE WHEN status = 'pending' THEN 1 END)::bigint, \
            COUNT(CASE WHEN status = 'completed' THEN 1 END)::bigint, \
            COUNT(CASE WHEN status = 'pending' AND due_date < NOW() THEN 1 END)::bigint \
         FROM tasks",
    )
    .fetch_one(&state.db)
    .await?;

    Ok(Json(json!({
        "success": true,
        "data": {
            "total": total,
            "pending": pending,
            "completed": completed,
            "overdue": overdue,
        }
    })))
}
