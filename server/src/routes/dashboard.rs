use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::{AppError, AppResult};
use crate::models::license::{
    LICENSE_STATUS_ACTIVE, LICENSE_STATUS_INACTIVE, LICENSE_STATUS_PENDING_PAYMENT,
};
use crate::services::sales::{bucket_payments, window_start, SalesInterval};
use crate::AppState;

const STATS_CACHE_KEY: &str = "dashboard:stats";

#[derive(Debug, Deserialize)]
pub struct SalesQuery {
    pub interval: Option<String>,
}

async fn count_where(state: &AppState, sql: &str) -> AppResult<i64> {
    let count: i64 = sqlx::query_scalar(sql).fetch_one(&state.db).await?;
    Ok(count)
}

async fn count_licenses_by_status(state: &AppState, status: &str) -> AppResult<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM licenses WHERE status = $1")
        .bind(status)
        .fetch_one(&state.db)
        .await?;
    Ok(count)
}

/// Headline counts for the dashboard cards. Cached briefly so a busy
/// dashboard does not hammer Postgres with seven counts per page load.
pub async fn dashboard_stats(State(state): State<AppState>) -> AppResult<Json<Value>> {
    if let Some(cache) = &state.cache {
        if let Some(cached) = cache.get_json::<Value>(STATS_CACHE_KEY).await {
            return Ok(Json(json!({ "success": true, "data": cached })));
        }
    }

    let total_clients = count_where(&state, "SELECT COUNT(*) FROM clients").await?;
    let total_products = count_where(&state, "SELECT COUNT(*) FROM products").await?;
    let total_licenses = count_where(&state, "SELECT COUNT(*) FROM licenses").await?;
    let active_licenses = count_licenses_by_status(&state, LICENSE_STATUS_ACTIVE).await?;
    let inactive_licenses = count_licenses_by_status(&state, LICENSE_STATUS_INACTIVE).await?;
    let pending_payment_licenses =
        count_licenses_by_status(&state, LICENSE_STATUS_PENDING_PAYMENT).await?;
    let expired_licenses = count_where(
        &state,
        "SELECT COUNT(*) FROM licenses WHERE end_date IS NOT NULL AND end_date < CURRENT_DATE",
    )
    .await?;

    let stats = json!({
        "total_clients": total_clients,
        "total_products": total_products,
        "total_licenses": total_licenses,
        "active_licenses": active_licenses,
        "inactive_licenses": inactive_licenses,
        "pending_payment_licenses": pending_payment_licenses,
        "expired_licenses": expired_licenses,
    });

    if let Some(cache) = &state.cache {
        cache
            .set_json(STATS_CACHE_KEY, &stats, state.config.dashboard.cache_seconds)
            .await;
    }

    Ok(Json(json!({ "success": true, "data": stats })))
}

/// Revenue chart: paid amounts reduced into daily or monthly buckets.
pub async fn sales_data(
    State(state): State<AppState>,
    Query(query): Query<SalesQuery>,
) -> AppResult<Json<Value>> {
    let interval: SalesInterval = query
        .interval
        .as_deref()
        .unwrap_or("6m")
        .parse()
        .map_err(|_| {
            AppError::BadRequest("Intervalo inválido. Usa: 7d, 30d, 3m, 6m, 12m".into())
        })?;

    let cache_key = format!("dashboard:sales:{}", interval.as_str());
    if let Some(cache) = &state.cache {
        if let Some(cached) = cache.get_json::<Value>(&cache_key).await {
            return Ok(Json(json!({ "success": true, "data": cached })));
        }
    }

    let now = Utc::now();
    let payments: Vec<(DateTime<Utc>, i64)> = sqlx::query_as(
        "SELECT paid_at, amount_cents FROM payments WHERE paid_at >= $1 ORDER BY paid_at ASC",
    )
    .bind(window_start(interval, now))
    .fetch_all(&state.db)
    .await?;

    let count = payments.len();
    let (labels, totals) = bucket_payments(&payments, interval, now);
    let total: i64 = totals.iter().sum();

    let data = json!({
        "interval": interval.as_str(),
        "labels": labels,
        "totals": totals,
        "count": count,
        "total": total,
    });

    if let Some(cache) = &state.cache {
        cache
            .set_json(&cache_key, &data, state.config.dashboard.cache_seconds)
            .await;
    }

    Ok(Json(json!({ "success": true, "data": data })))
}
