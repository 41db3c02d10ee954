use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::opportunity::{
    win_rate, CreateOpportunityRequest, MarkLostRequest, MoveStageRequest, OpportunityFull,
    OpportunityQuery, PipelineStage, UpdateOpportunityRequest, OPPORTUNITY_LOST, OPPORTUNITY_OPEN,
    OPPORTUNITY_WON,
};
use crate::AppState;

const OPPORTUNITY_FULL_SQL: &str = "SELECT o.id, o.title, o.contact_id, o.stage_id, o.value_cents, o.status, o.lost_reason, \
     o.expected_close_date, o.actual_close_date, o.assigned_to, o.created_at, o.updated_at, \
     c.first_name AS contact_first_name, c.last_name AS contact_last_name, \
     c.email AS contact_email, c.company_name AS contact_company_name, \
     s.name AS stage_name, s.color AS stage_color, s.probability AS stage_probability \
     FROM opportunities o \
     LEFT JOIN contacts c ON c.id = o.contact_id \
     LEFT JOIN pipeline_stages s ON s.id = o.stage_id";

fn opportunity_json(o: &OpportunityFull) -> Value {
    let contact = o.contact_id.map(|id| {
        json!({
            "id": id,
            "first_name": o.contact_first_name,
            "last_name": o.contact_last_name,
            "email": o.contact_email,
            "company_name": o.contact_company_name,
        })
    });
    let stage = o.stage_id.map(|id| {
        json!({
            "id": id,
            "name": o.stage_name,
            "color": o.stage_color,
            "probability": o.stage_probability,
        })
    });
    json!({
        "id": o.id,
        "title": o.title,
        "contact_id": o.contact_id,
        "stage_id": o.stage_id,
        "value_cents": o.value_cents,
        "status": o.status,
        "lost_reason": o.lost_reason,
        "expected_close_date": o.expected_close_date,
        "actual_close_date": o.actual_close_date,
        "assigned_to": o.assigned_to,
        "created_at": o.created_at,
        "updated_at": o.updated_at,
        "contact": contact,
        "stage": stage,
    })
}

fn validate_status(status: &str) -> AppResult<()> {
    if status != OPPORTUNITY_OPEN && status != OPPORTUNITY_WON && status != OPPORTUNITY_LOST {
        return Err(AppError::BadRequest("Invalid opportunity status".into()));
    }
    Ok(())
}

async fn fetch_opportunity(state: &AppState, id: Uuid) -> AppResult<OpportunityFull> {
    let sql = format!("{} WHERE o.id = $1", OPPORTUNITY_FULL_SQL);
    let row: Option<OpportunityFull> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(&state.db)
        .await?;
    row.ok_or_else(|| AppError::NotFound("Oportunidad no encontrada".into()))
}

pub async fn list_opportunities(
    State(state): State<AppState>,
    Query(query): Query<OpportunityQuery>,
) -> AppResult<Json<Value>> {
    if let Some(status) = query.status.as_deref() {
        validate_status(status)?;
    }

    let sql = format!(
        "{} WHERE ($1::text IS NULL OR o.status = $1) \
         AND ($2::uuid IS NULL OR o.stage_id = $2) \
         AND ($3::uuid IS NULL OR o.assigned_to = $3) \
         AND ($4::uuid IS NULL OR o.contact_id = $4) \
         ORDER BY o.created_at DESC",
        OPPORTUNITY_FULL_SQL
    );
    let rows: Vec<OpportunityFull> = sqlx::query_as(&sql)
        .bind(query.status.as_deref())
        .bind(query.stage_id)
        .bind(query.assigned_to)
        .bind(query.contact_id)
        .fetch_all(&state.db)
        .await?;

    let data: Vec<Value> = rows.iter().map(opportunity_json).collect();
    Ok(Json(json!({ "success": true, "data": data })))
}

pub async fn get_opportunity(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let row = fetch_opportunity(&state, id).await?;
    Ok(Json(json!({ "success": true, "data": opportunity_json(&row) })))
}

pub async fn create_opportunity(
    State(state): State<AppState>,
    Json(body): Json<CreateOpportunityRequest>,
) -> AppResult<Json<Value>> {
    if body.title.trim().is_empty() {
        return Err(AppError::BadRequest("El título es requerido".into()));
    }
    if body.value_cents < 0 {
        return Err(AppError::BadRequest(
            "El valor no puede ser negativo".into(),
        ));
    }

    if let Some(contact_id) = body.contact_id {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM contacts WHERE id = $1)")
                .bind(contact_id)
                .fetch_one(&state.db)
                .await?;
        if !exists {
            return Err(AppError::NotFound("Cliente no encontrado".into()));
        }
    }

    // Default the stage to the first pipeline column when the caller omits it.
    let stage_id = match body.stage_id {
        Some(stage_id) => {
            let exists: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pipeline_stages WHERE id = $1)")
                    .bind(stage_id)
                    .fetch_one(&state.db)
                    .await?;
            if !exists {
                return Err(AppError::NotFound("Etapa no encontrada".into()));
            }
            Some(stage_id)
        }
        None => {
            sqlx::query_scalar("SELECT id FROM pipeline_stages ORDER BY order_index ASC LIMIT 1")
                .fetch_optional(&state.db)
                .await?
        }
    };

    let id: Uuid = sqlx::query_scalar(
        "INSERT INTO opportunities (id, title, contact_id, stage_id, value_cents, status, expected_close_date, assigned_to, created_at, updated_at) \
         VALUES (gen_random_uuid(), $1, $2, $3, $4, $5, $6, $7, NOW(), NOW()) \
         RETURNING id",
    )
    .bind(body.title.trim())
    .bind(body.contact_id)
    .bind(stage_id)
    .bind(body.value_cents)
    .bind(OPPORTUNITY_OPEN)
    .bind(body.expected_close_date)
    .bind(body.assigned_to)
    .fetch_one(&state.db)
    .await?;

    let row = fetch_opportunity(&state, id).await?;
    Ok(Json(json!({
        "success": true,
        "data": opportunity_json(&row),
        "message": "Oportunidad creada exitosamente"
    })))
}

pub async fn update_opportunity(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateOpportunityRequest>,
) -> AppResult<Json<Value>> {
    if let Some(title) = body.title.as_deref() {
        if title.trim().is_empty() {
            return Err(AppError::BadRequest("El título es requerido".into()));
        }
    }
    if body.value_cents.is_some_and(|v| v < 0) {
        return Err(AppError::BadRequest(
            "El valor no puede ser negativo".into(),
        ));
    }
    if let Some(stage_id) = body.stage_id {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pipeline_stages WHERE id = $1)")
                .bind(stage_id)
                .fetch_one(&state.db)
                .await?;
        if !exists {
            return Err(AppError::NotFound("Etapa no encontrada".into()));
        }
    }

    let updated: Option<Uuid> = sqlx::query_scalar(
        "UPDATE opportunities SET \
            title = COALESCE($2, title), \
            value_cents = COALESCE($3, value_cents), \
            contact_id = COALESCE($4, contact_id), \
            stage_id = COALESCE($5, stage_id), \
            expected_close_date = COALESCE($6, expected_close_date), \
            assigned_to = COALESCE($7, assigned_to), \
            updated_at = NOW() \
         WHERE id = $1 \
         RETURNING id",
    )
    .bind(id)
    .bind(body.title.as_deref().map(str::trim))
    .bind(body.value_cents)
    .bind(body.contact_id)
    .bind(body.stage_id)
    .bind(body.expected_close_date)
    .bind(body.assigned_to)
    .fetch_optional(&state.db)
    .await?;

    if updated.is_none() {
        return Err(AppError::NotFound("Oportunidad no encontrada".into()));
    }

    let row = fetch_opportunity(&state, id).await?;
    Ok(Json(json!({
        "success": true,
        "data": opportunity_json(&row),
        "message": "Oportunidad actualizada exitosamente"
    })))
}

pub async fn move_opportunity_stage(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<MoveStageRequest>,
) -> AppResult<Json<Value>> {
    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pipeline_stages WHERE id = $1)")
            .bind(body.stage_id)
            .fetch_one(&state.db)
            .await?;
    if !exists {
        return Err(AppError::NotFound("Etapa no encontrada".into()));
    }

    let result = sqlx::query("UPDATE opportunities SET stage_id = $2, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(body.stage_id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Oportunidad no encontrada".into()));
    }

    let row = fetch_opportunity(&state, id).await?;
    Ok(Json(json!({
        "success": true,
        "data": opportunity_json(&row),
        "message": "Oportunidad movida a nueva etapa"
    })))
}

pub async fn mark_opportunity_won(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let result = sqlx::query(
        "UPDATE opportunities SET status = $2, actual_close_date = NOW(), updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(OPPORTUNITY_WON)
    .execute(&state.db)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Oportunidad no encontrada".into()));
    }

    let row = fetch_opportunity(&state, id).await?;
    Ok(Json(json!({
        "success": true,
        "data": opportunity_json(&row),
        "message": "Oportunidad marcada como ganada"
    })))
}

pub async fn mark_opportunity_lost(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Option<Json<MarkLostRequest>>,
) -> AppResult<Json<Value>> {
    let reason = body.and_then(|Json(b)| b.reason);
    let result = sqlx::query(
        "UPDATE opportunities SET status = $2, lost_reason = $3, actual_close_date = NOW(), updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(OPPORTUNITY_LOST)
    .bind(reason)
    .execute(&state.db)
    .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Oportunidad no encontrada".into()));
    }

    let row = fetch_opportunity(&state, id).await?;
    Ok(Json(json!({
        "success": true,
        "data": opportunity_json(&row),
        "message": "Oportunidad marcada como perdida"
    })))
}

pub async fn delete_opportunity(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let result = sqlx::query("DELETE FROM opportunities WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Oportunidad no encontrada".into()));
    }
    Ok(Json(json!({
        "success": true,
        "message": "Oportunidad eliminada exitosamente"
    })))
}

/// Aggregate pipeline numbers for the sales dashboard cards.
pub async fn opportunity_metrics(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let (open_count, won_count, lost_count, open_value, won_value, lost_value): (
        i64,
        i64,
        i64,
        i64,
        i64,
        i64,
    ) = sqlx::query_as(
        "SELECT \
            COUNT(CASE WHEN status = 'open' THEN 1 END)::bigint, \
            COUNT(CASE WHEN status = 'won' THEN 1 END)::bigint, \
            COUNT(CASE WHEN status = 'lost' THEN 1 END)::bigint, \
            COALESCE(SUM(CASE WHEN status = 'open' THEN value_cents END), 0)::bigint, \
            COALESCE(SUM(CASE WHEN status = 'won' THEN value_cents END), 0)::bigint, \
            COALESCE(SUM(CASE WHEN status = 'lost' THEN value_cents END), 0)::bigint \
         FROM opportunities",
    )
    .fetch_one(&state.db)
    .await?;

    let average_deal_size = if won_count > 0 {
        won_value as f64 / won_count as f64
    } else {
        0.0
    };

    Ok(Json(json!({
        "success": true,
        "data": {
            "totalOpenValue": open_value,
            "totalWonValue": won_value,
            "totalLostValue": lost_value,
            "openCount": open_count,
            "wonCount": won_count,
            "lostCount": lost_count,
            "winRate": win_rate(won_count, lost_count),
            "averageDealSize": average_deal_size,
        }
    })))
}

/// Kanban view: every stage in order with its open opportunities and total value.
pub async fn pipeline_board(State(state): State<AppState>) -> AppResult<Json<Value>> {
    let stages: Vec<PipelineStage> =
        sqlx::query_as("SELECT * FROM pipeline_stages ORDER BY order_index ASC")
            .fetch_all(&state.db)
            .await?;

    let sql = format!(
        "{} WHERE o.stage_id = $1 AND o.status = $2 ORDER BY o.created_at DESC",
        OPPORTUNITY_FULL_SQL
    );
    let mut columns = Vec::with_capacity(stages.len());
    for stage in &stages {
        let rows: Vec<OpportunityFull> = sqlx::query_as(&sql)
            .bind(stage.id)
            .bind(OPPORTUNITY_OPEN)
            .fetch_all(&state.db)
            .await?;
        let total_value: i64 = rows.iter().map(|o| o.value_cents).sum();
        columns.push(json!({
            "id": stage.id,
            "name": stage.name,
            "color": stage.color,
            "probability": stage.probability,
            "order_index": stage.order_index,
            "opportunities": rows.iter().map(opportunity_json).collect::<Vec<_>>(),
            "totalValue": total_value,
        }));
    }

    Ok(Json(json!({ "success": true, "data": columns })))
}
