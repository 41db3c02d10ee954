use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::middleware::auth::AuthUser;
use crate::AppState;

fn role_level(role: &str) -> i32 {
    match role {
        "staff" => 1,
        "admin" => 2,
        _ => 0,
    }
}

// Role comes from the users row, not the token claim.
async fn check_role(state: &AppState, user_id: Uuid, min_role: &str) -> Result<String, AppError> {
    let row: Option<String> =
        sqlx::query_scalar("SELECT role FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&state.db)
            .await?;

    let actual_role = row.unwrap_or_default();
    if actual_role.is_empty() || role_level(&actual_role) < role_level(min_role) {
        return Err(AppError::Forbidden(format!("Requires {} role", min_role)));
    }
    Ok(actual_role)
}

/// Middleware: admin only. Staff sessions can read everything but every
/// mutating route is layered with this.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = req
        .extensions()
        .get::<AuthUser>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;

    let role = check_role(&state, user.id, "admin").await?;
    req.extensions_mut().insert(AuthUser {
        id: user.id,
        role,
    });

    Ok(next.run(req).await)
}
