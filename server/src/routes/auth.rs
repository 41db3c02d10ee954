use axum::{
    extract::{FromRequest, Request, State},
    http::header,
    Extension, Form, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::{generate_tokens, verify_token, AuthUser};
use crate::models::user::*;
use crate::AppState;

fn session_cookie(name: &str, value: String, max_age_secs: i64, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::new(name.to_owned(), value);
    cookie.set_path("/");
    cookie.set_http_only(true);
    cookie.set_secure(secure);
    cookie.set_same_site(SameSite::Lax);
    cookie.set_max_age(time::Duration::seconds(max_age_secs));
    cookie
}

fn removal_cookie(name: &str) -> Cookie<'static> {
    let mut cookie = Cookie::new(name.to_owned(), "");
    cookie.set_path("/");
    cookie
}

fn with_session(jar: CookieJar, state: &AppState, access: String, refresh: String) -> CookieJar {
    let secure = state.config.is_production();
    jar.add(session_cookie(
        &state.config.jwt.access_cookie,
        access,
        state.config.jwt.access_expiry_secs,
        secure,
    ))
    .add(session_cookie(
        &state.config.jwt.refresh_cookie,
        refresh,
        state.config.jwt.refresh_expiry_secs,
        secure,
    ))
}

// The dashboard login form posts urlencoded; API clients send JSON.
async fn login_body(req: Request) -> AppResult<LoginRequest> {
    let form_encoded = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false);

    if form_encoded {
        let Form(body) = Form::<LoginRequest>::from_request(req, &())
            .await
            .map_err(|_| AppError::BadRequest("Invalid login payload".into()))?;
        Ok(body)
    } else {
        let Json(body) = Json::<LoginRequest>::from_request(req, &())
            .await
            .map_err(|_| AppError::BadRequest("Invalid login payload".into()))?;
        Ok(body)
    }
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    req: Request,
) -> AppResult<(CookieJar, Json<Value>)> {
    let body = login_body(req).await?;

    let user: User = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(&body.email)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".into()))?;

    let valid = bcrypt::verify(&body.password, &user.password_hash)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    if !valid {
        return Err(AppError::Unauthorized("Invalid email or password".into()));
    }

    sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
        .bind(user.id)
        .execute(&state.db)
        .await?;

    let (access, refresh) = generate_tokens(
        user.id,
        &user.role,
        &state.config.jwt.secret,
        state.config.jwt.access_expiry_secs,
        state.config.jwt.refresh_expiry_secs,
    )?;

    let jar = with_session(jar, &state, access, refresh);
    Ok((
        jar,
        Json(json!({ "success": true, "data": { "user": UserPublic::from(&user) } })),
    ))
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<Value>) {
    let jar = jar
        .remove(removal_cookie(&state.config.jwt.access_cookie))
        .remove(removal_cookie(&state.config.jwt.refresh_cookie));

    (jar, Json(json!({ "success": true, "message": "Logged out" })))
}

pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Option<Json<RefreshRequest>>,
) -> AppResult<(CookieJar, Json<Value>)> {
    let token = jar
        .get(&state.config.jwt.refresh_cookie)
        .map(|c| c.value().to_string())
        .or_else(|| body.and_then(|Json(b)| b.refresh_token))
        .ok_or_else(|| AppError::Unauthorized("Refresh token required".into()))?;

    let claims = verify_token(&token, &state.config.jwt.secret)?;
    if claims.token_type.as_deref() != Some("refresh") {
        return Err(AppError::Unauthorized("Refresh token required".into()));
    }

    let user_id = Uuid::parse_str(&claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid token".into()))?;

    let user: User = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid token".into()))?;

    let (access, refresh) = generate_tokens(
        user.id,
        &user.role,
        &state.config.jwt.secret,
        state.config.jwt.access_expiry_secs,
        state.config.jwt.refresh_expiry_secs,
    )?;

    let jar = with_session(jar, &state, access, refresh);
    Ok((
        jar,
        Json(json!({ "success": true, "data": { "user": UserPublic::from(&user) } })),
    ))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> AppResult<Json<Value>> {
    let user: User = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(auth.id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(Json(
        json!({ "success": true, "data": UserPublic::from(&user) }),
    ))
}

/// Admin-only: staff accounts are provisioned, never self-registered.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<Json<Value>> {
    if body.email.is_empty() || body.password.len() < 6 {
        return Err(AppError::BadRequest(
            "Email required and password must be at least 6 characters".into(),
        ));
    }
    if body.full_name.trim().is_empty() {
        return Err(AppError::BadRequest("Full name required".into()));
    }

    let role = body.role.unwrap_or_else(|| ROLE_STAFF.to_string());
    if !is_valid_role(&role) {
        return Err(AppError::BadRequest("Invalid role".into()));
    }

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(&body.email)
        .fetch_one(&state.db)
        .await?;
    if exists {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let password_hash =
        bcrypt::hash(&body.password, 12).map_err(|e| AppError::Internal(e.to_string()))?;

    let user: User = sqlx::query_as(
        r#"INSERT INTO users (id, email, password_hash, full_name, role)
        VALUES (gen_random_uuid(), $1, $2, $3, $4)
        RETURNING *"#,
    )
    .bind(&body.email)
    .bind(&password_hash)
    .bind(body.full_name.trim())
    .bind(&role)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(
        json!({ "success": true, "data": UserPublic::from(&user) }),
    ))
}
