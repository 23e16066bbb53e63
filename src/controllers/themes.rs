use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::AppError;
use crate::middleware::{AdminUser, AuthUser};
use crate::models::theme::{self, ShowTheme};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/themes", get(list_themes).post(create_theme))
}

async fn list_themes(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let themes = sqlx::query_as::<_, ShowTheme>("SELECT id, name FROM show_themes ORDER BY id")
        .fetch_all(&state.db.pool)
        .await?;

    Ok(Json(themes))
}

#[derive(Debug, Deserialize)]
struct CreateThemeRequest {
    name: String,
}

async fn create_theme(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(req): Json<CreateThemeRequest>,
) -> Result<impl IntoResponse, AppError> {
    theme::validate_name(&req.name)?;

    let created = sqlx::query_as::<_, ShowTheme>(
        "INSERT INTO show_themes (name) VALUES ($1) RETURNING id, name",
    )
    .bind(&req.name)
    .fetch_one(&state.db.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(created)))
}
