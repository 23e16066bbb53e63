use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use validator::Validate;

use crate::error::AppError;
use crate::middleware::AuthUser;
use crate::models::User;
use crate::services::auth;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user/register", post(register))
        .route("/user/token", post(obtain_token))
        .route("/user/token/refresh", post(refresh_token))
        .route("/user/me", get(me).put(update_me))
}

/// Flattens validator errors into the `{field: message}` payload shape.
fn validation_to_app_error(errors: validator::ValidationErrors) -> AppError {
    let mut fields = Map::new();
    for (field, errs) in errors.field_errors() {
        if let Some(err) = errs.first() {
            let message = err
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| format!("Invalid value for {field}."));
            fields.insert(field.to_string(), Value::String(message));
        }
    }
    AppError::Validation(Value::Object(fields))
}

#[derive(Debug, Serialize)]
struct UserResponse {
    id: i64,
    email: String,
    first_name: String,
    last_name: String,
    is_staff: bool,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        UserResponse {
            id: u.id,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            is_staff: u.is_staff,
        }
    }
}

/* ---------- REGISTER ---------- */

#[derive(Debug, Deserialize, Validate)]
struct RegisterRequest {
    #[validate(email(message = "Enter a valid email address."))]
    email: String,
    #[validate(length(min = 5, message = "Ensure this field has at least 5 characters."))]
    password: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate().map_err(validation_to_app_error)?;

    let password_hash = auth::hash_password(&req.password)?;

    let created = sqlx::query_as::<_, User>(
        "INSERT INTO users (email, password_hash, first_name, last_name)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(&req.email)
    .bind(&password_hash)
    .bind(&req.first_name)
    .bind(&req.last_name)
    .fetch_one(&state.db.pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            AppError::field("email", "user with this email already exists.")
        }
        _ => AppError::Database(e),
    })?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(created))))
}

/* ---------- TOKENS ---------- */

#[derive(Debug, Deserialize)]
struct TokenRequest {
    email: String,
    password: String,
}

async fn obtain_token(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = User::find_by_email(&req.email, &state.db)
        .await?
        .filter(|u| u.is_active && u.verify_password(&req.password))
        .ok_or_else(|| {
            AppError::Unauthorized(
                "No active account found with the given credentials".to_string(),
            )
        })?;

    let pair = auth::issue_token_pair(user.id, &state.config.jwt)?;
    Ok(Json(pair))
}

#[derive(Debug, Deserialize)]
struct RefreshRequest {
    refresh: String,
}

async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> Result<impl IntoResponse, AppError> {
    let access = auth::refresh_access_token(&req.refresh, &state.config.jwt)?;
    Ok(Json(json!({ "access": access })))
}

/* ---------- PROFILE ---------- */

async fn me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let profile = User::find_by_id(user.id, &state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(UserResponse::from(profile)))
}

#[derive(Debug, Deserialize, Validate)]
struct UpdateMeRequest {
    #[validate(email(message = "Enter a valid email address."))]
    email: Option<String>,
    #[validate(length(min = 5, message = "Ensure this field has at least 5 characters."))]
    password: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
}

async fn update_me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<UpdateMeRequest>,
) -> Result<impl IntoResponse, AppError> {
    req.validate().map_err(validation_to_app_error)?;

    let current = User::find_by_id(user.id, &state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let password_hash = match &req.password {
        Some(password) => auth::hash_password(password)?,
        None => current.password_hash.clone(),
    };

    let updated = sqlx::query_as::<_, User>(
        "UPDATE users
         SET email = $1, password_hash = $2, first_name = $3, last_name = $4
         WHERE id = $5
         RETURNING *",
    )
    .bind(req.email.as_deref().unwrap_or(&current.email))
    .bind(&password_hash)
    .bind(req.first_name.as_deref().unwrap_or(&current.first_name))
    .bind(req.last_name.as_deref().unwrap_or(&current.last_name))
    .bind(user.id)
    .fetch_one(&state.db.pool)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
            AppError::field("email", "user with this email already exists.")
        }
        _ => AppError::Database(e),
    })?;

    Ok(Json(UserResponse::from(updated)))
}
