use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::AppError;
use crate::middleware::{AdminUser, AuthUser};
use crate::models::dome::capacity;
use crate::models::session::tickets_available;
use crate::models::ShowSession;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/show-sessions", get(list_sessions).post(create_session))
        .route(
            "/show-sessions/{id}",
            get(retrieve_session)
                .put(update_session)
                .delete(delete_session),
        )
}

#[derive(Debug, Deserialize)]
struct SessionsQuery {
    /// `YYYY-MM-DD`, filters on the show_time date.
    date: Option<String>,
    /// Astronomy show id.
    show: Option<i64>,
}

#[derive(Debug, Serialize)]
struct SessionListItem {
    id: i64,
    astronomy_show_title: String,
    planetarium_dome_name: String,
    planetarium_dome_capacity: i64,
    show_time: DateTime<Utc>,
    tickets_available: i64,
}

// Row shape shared by the list and detail queries: session, joined show and
// dome columns, plus the per-session ticket count.
type SessionRow = (i64, i64, String, i64, String, i32, i32, DateTime<Utc>, i64);

const SESSION_SELECT: &str = "SELECT ss.id,
            a.id, a.title,
            d.id, d.name, d.rows, d.seats_in_row,
            ss.show_time,
            (SELECT COUNT(*) FROM tickets t WHERE t.show_session_id = ss.id) AS tickets_sold
     FROM show_sessions ss
     JOIN astronomy_shows a ON a.id = ss.astronomy_show_id
     JOIN planetarium_domes d ON d.id = ss.planetarium_dome_id";

async fn list_sessions(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(params): Query<SessionsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let date = params
        .date
        .map(|s| {
            NaiveDate::parse_from_str(&s, "%Y-%m-%d")
                .map_err(|_| AppError::field("date", "Date must be in YYYY-MM-DD format."))
        })
        .transpose()?;

    let mut q = format!("{SESSION_SELECT} WHERE TRUE");
    let mut bind_idx = 1;
    if date.is_some() {
        q.push_str(&format!(" AND (ss.show_time AT TIME ZONE 'UTC')::date = ${bind_idx}"));
        bind_idx += 1;
    }
    if params.show.is_some() {
        q.push_str(&format!(" AND ss.astronomy_show_id = ${bind_idx}"));
    }
    q.push_str(" ORDER BY ss.show_time, ss.id");

    let mut dbq = sqlx::query_as::<_, SessionRow>(&q);
    if let Some(d) = date {
        dbq = dbq.bind(d);
    }
    if let Some(show_id) = params.show {
        dbq = dbq.bind(show_id);
    }

    let rows = dbq.fetch_all(&state.db.pool).await?;

    let payload: Vec<SessionListItem> = rows
        .into_iter()
        .map(
            |(id, _show_id, title, _dome_id, dome_name, rows, seats_in_row, show_time, sold)| {
                let cap = capacity(rows, seats_in_row);
                SessionListItem {
                    id,
                    astronomy_show_title: title,
                    planetarium_dome_name: dome_name,
                    planetarium_dome_capacity: cap,
                    show_time,
                    tickets_available: tickets_available(cap, sold),
                }
            },
        )
        .collect();

    Ok(Json(payload))
}

#[derive(Debug, Serialize)]
struct SessionShow {
    id: i64,
    title: String,
    theme: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SessionDome {
    id: i64,
    name: String,
    rows: i32,
    seats_in_row: i32,
    capacity: i64,
}

#[derive(Debug, Serialize)]
struct SessionDetailResponse {
    id: i64,
    show_time: DateTime<Utc>,
    astronomy_show: SessionShow,
    planetarium_dome: SessionDome,
    tickets_available: i64,
}

async fn retrieve_session(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let q = format!("{SESSION_SELECT} WHERE ss.id = $1");
    let row = sqlx::query_as::<_, SessionRow>(&q)
        .bind(id)
        .fetch_optional(&state.db.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Show session {id} not found")))?;

    let (id, show_id, title, dome_id, dome_name, rows, seats_in_row, show_time, sold) = row;

    let theme = sqlx::query_scalar::<_, String>(
        "SELECT t.name
         FROM show_themes t
         JOIN astronomy_show_themes st ON st.theme_id = t.id
         WHERE st.show_id = $1
         ORDER BY t.id",
    )
    .bind(show_id)
    .fetch_all(&state.db.pool)
    .await?;

    let cap = capacity(rows, seats_in_row);

    Ok(Json(SessionDetailResponse {
        id,
        show_time,
        astronomy_show: SessionShow {
            id: show_id,
            title,
            theme,
        },
        planetarium_dome: SessionDome {
            id: dome_id,
            name: dome_name,
            rows,
            seats_in_row,
            capacity: cap,
        },
        tickets_available: tickets_available(cap, sold),
    }))
}

#[derive(Debug, Deserialize)]
struct SessionWriteRequest {
    astronomy_show: i64,
    planetarium_dome: i64,
    show_time: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
struct SessionWriteResponse {
    id: i64,
    astronomy_show: i64,
    planetarium_dome: i64,
    show_time: DateTime<Utc>,
}

impl From<ShowSession> for SessionWriteResponse {
    fn from(s: ShowSession) -> Self {
        SessionWriteResponse {
            id: s.id,
            astronomy_show: s.astronomy_show_id,
            planetarium_dome: s.planetarium_dome_id,
            show_time: s.show_time,
        }
    }
}

async fn check_session_refs(pool: &sqlx::PgPool, req: &SessionWriteRequest) -> Result<(), AppError> {
    let show_exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM astronomy_shows WHERE id = $1)")
            .bind(req.astronomy_show)
            .fetch_one(pool)
            .await?;
    if !show_exists {
        return Err(AppError::field(
            "astronomy_show",
            format!("Invalid astronomy show id: {}", req.astronomy_show),
        ));
    }

    let dome_exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM planetarium_domes WHERE id = $1)",
    )
    .bind(req.planetarium_dome)
    .fetch_one(pool)
    .await?;
    if !dome_exists {
        return Err(AppError::field(
            "planetarium_dome",
            format!("Invalid planetarium dome id: {}", req.planetarium_dome),
        ));
    }

    Ok(())
}

async fn create_session(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(req): Json<SessionWriteRequest>,
) -> Result<impl IntoResponse, AppError> {
    check_session_refs(&state.db.pool, &req).await?;

    let created = sqlx::query_as::<_, ShowSession>(
        "INSERT INTO show_sessions (astronomy_show_id, planetarium_dome_id, show_time)
         VALUES ($1, $2, $3)
         RETURNING id, astronomy_show_id, planetarium_dome_id, show_time",
    )
    .bind(req.astronomy_show)
    .bind(req.planetarium_dome)
    .bind(req.show_time)
    .fetch_one(&state.db.pool)
    .await?;

    Ok((StatusCode::CREATED, Json(SessionWriteResponse::from(created))))
}

async fn update_session(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    Json(req): Json<SessionWriteRequest>,
) -> Result<impl IntoResponse, AppError> {
    check_session_refs(&state.db.pool, &req).await?;

    let updated = sqlx::query_as::<_, ShowSession>(
        "UPDATE show_sessions
         SET astronomy_show_id = $1, planetarium_dome_id = $2, show_time = $3
         WHERE id = $4
         RETURNING id, astronomy_show_id, planetarium_dome_id, show_time",
    )
    .bind(req.astronomy_show)
    .bind(req.planetarium_dome)
    .bind(req.show_time)
    .bind(id)
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Show session {id} not found")))?;

    Ok(Json(SessionWriteResponse::from(updated)))
}

async fn delete_session(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let deleted = sqlx::query("DELETE FROM show_sessions WHERE id = $1")
        .bind(id)
        .execute(&state.db.pool)
        .await?
        .rows_affected();

    if deleted == 0 {
        return Err(AppError::NotFound(format!("Show session {id} not found")));
    }

    Ok(StatusCode::NO_CONTENT)
}
