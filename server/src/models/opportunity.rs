use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const OPPORTUNITY_OPEN: &str = "open";
pub const OPPORTUNITY_WON: &str = "won";
pub const OPPORTUNITY_LOST: &str = "lost";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Opportunity {
    pub id: Uuid,
    pub title: String,
    pub contact_id: Option<Uuid>,
    pub stage_id: Option<Uuid>,
    pub value_cents: i64,
    pub status: String,
    pub lost_reason: Option<String>,
    pub expected_close_date: Option<NaiveDate>,
    pub actual_close_date: Option<DateTime<Utc>>,
    pub assigned_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PipelineStage {
    pub id: Uuid,
    pub name: String,
    pub color: String,
    pub probability: i32,
    pub order_index: i32,
}

/// Opportunity row left-joined with its contact and stage summaries.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OpportunityFull {
    pub id: Uuid,
    pub title: String,
    pub contact_id: Option<Uuid>,
    pub stage_id: Option<Uuid>,
    pub value_cents: i64,
    pub status: String,
    pub lost_reason: Option<String>,
    pub expected_close_date: Option<NaiveDate>,
    pub actual_close_date: Option<DateTime<Utc>>,
    pub assigned_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub contact_first_name: Option<String>,
    pub contact_last_name: Option<String>,
    pub contact_email: Option<String>,
    pub contact_company_name: Option<String>,
    pub stage_name: Option<String>,
    pub stage_color: Option<String>,
    pub stage_probability: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOpportunityRequest {
    pub title: String,
    pub value_cents: i64,
    pub contact_id: Option<Uuid>,
    pub stage_id: Option<Uuid>,
    pub expected_close_date: Option<NaiveDate>,
    pub assigned_to: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOpportunityRequest {
    pub title: Option<String>,
    pub value_cents: Option<i64>,
    pub contact_id: Option<Uuid>,
    pub stage_id: Option<Uuid>,
    pub expected_close_date: Option<NaiveDate>,
    pub assigned_to: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct MoveStageRequest {
    pub stage_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct MarkLostRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OpportunityQuery {
    pub status: Option<String>,
    pub stage_id: Option<Uuid>,
    pub assigned_to: Option<Uuid>,
    pub contact_id: Option<Uuid>,
}

/// Round to 2 decimals, the way the win rate is reported.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Win rate over closed deals as a percentage, 0 when nothing has closed.
pub fn win_rate(won: i64, lost: i64) -> f64 {
    if won + lost == 0 {
        return 0.0;
    }
    round2(won as f64 / (won + lost) as f64 * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn win_rate_rounding() {
        assert_eq!(win_rate(0, 0), 0.0);
        assert_eq!(win_rate(1, 0), 100.0);
        assert_eq!(win_rate(0, 1), 0.0);
        assert_eq!(win_rate(1, 2), 33.33);
        assert_eq!(win_rate(2, 1), 66.67);
        assert_eq!(win_rate(1, 7), 12.5);
    }
}
