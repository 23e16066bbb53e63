use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::AppError;
use crate::middleware::{AdminUser, AuthUser};
use crate::models::dome::{self, PlanetariumDome};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/planetarium-domes", get(list_domes).post(create_dome))
}

#[derive(Debug, Serialize)]
struct DomeResponse {
    id: i64,
    name: String,
    rows: i32,
    seats_in_row: i32,
    capacity: i64,
}

impl From<PlanetariumDome> for DomeResponse {
    fn from(d: PlanetariumDome) -> Self {
        let capacity = d.capacity();
        DomeResponse {
            id: d.id,
            name: d.name,
            rows: d.rows,
            seats_in_row: d.seats_in_row,
            capacity,
        }
    }
}

async fn list_domes(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let domes = sqlx::query_as::<_, PlanetariumDome>(
        "SELECT id, name, rows, seats_in_row FROM planetarium_domes ORDER BY id",
    )
    .fetch_all(&state.db.pool)
    .await?;

    let payload: Vec<DomeResponse> = domes.into_iter().map(DomeResponse::from).collect();
    Ok(Json(payload))
}

#[derive(Debug, Deserialize)]
struct CreateDomeRequest {
    name: String,
    rows: i32,
    seats_in_row: i32,
}

async fn create_dome(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(req): Json<CreateDomeRequest>,
) -> Result<impl IntoResponse, AppError> {
    dome::validate_name(&req.name)?;
    dome::validate_rows_and_seats(req.rows, req.seats_in_row)?;

    let created = sqlx::query_as::<_, PlanetariumDome>(
        "INSERT INTO planetarium_domes (name, rows, seats_in_row)
         VALUES ($1, $2, $3)
         RETURNING id, name, rows, seats_in_row",
    )
    .bind(&req.name)
    .bind(req.rows)
    .bind(req.seats_in_row)
    .fetch_one(&state.db.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(DomeResponse::from(created))))
}
