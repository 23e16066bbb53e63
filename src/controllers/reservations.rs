use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{conflict_on_unique, AppError};
use crate::middleware::AuthUser;
use crate::models::ticket::validate_ticket;
use crate::models::{PlanetariumDome, Reservation, Ticket};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/reservations", get(list_reservations).post(create_reservation))
}

/* ---------- helpers ---------- */

/// LIMIT/OFFSET math in i64 so an absurd page number cannot overflow.
fn page_offset(page: u32, page_size: u32) -> i64 {
    (page as i64 - 1) * page_size as i64
}

/// Dome hosting the given session, or None when the session does not exist.
async fn session_dome<'e, E>(executor: E, show_session_id: i64) -> sqlx::Result<Option<PlanetariumDome>>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    sqlx::query_as::<_, PlanetariumDome>(
        "SELECT d.id, d.name, d.rows, d.seats_in_row
         FROM planetarium_domes d
         JOIN show_sessions ss ON ss.planetarium_dome_id = d.id
         WHERE ss.id = $1",
    )
    .bind(show_session_id)
    .fetch_optional(executor)
    .await
}

/* ---------- LIST ---------- */

#[derive(Debug, Deserialize)]
struct ReservationsQuery {
    page: Option<u32>,
    page_size: Option<u32>,
}

#[derive(Debug, Serialize)]
struct TicketResponse {
    id: i64,
    row: i32,
    seat: i32,
    show_session: i64,
}

#[derive(Debug, Serialize)]
struct ReservationResponse {
    id: i64,
    created_at: DateTime<Utc>,
    tickets: Vec<TicketResponse>,
}

#[derive(Debug, Serialize)]
struct ReservationListResponse {
    count: i64,
    results: Vec<ReservationResponse>,
}

// GET /reservations - paginated, scoped to the requesting user, newest first
async fn list_reservations(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(params): Query<ReservationsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = params.page.unwrap_or(1).max(1);
    let page_size = params.page_size.unwrap_or(10).clamp(1, 100);
    let offset = page_offset(page, page_size);

    let count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM reservations WHERE user_id = $1",
    )
    .bind(user.id)
    .fetch_one(&state.db.pool)
    .await?;

    let page_rows = sqlx::query_as::<_, Reservation>(
        "SELECT id, user_id, created_at
         FROM reservations
         WHERE user_id = $1
         ORDER BY created_at DESC, id DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(user.id)
    .bind(page_size as i64)
    .bind(offset)
    .fetch_all(&state.db.pool)
    .await?;

    let reservation_ids: Vec<i64> = page_rows.iter().map(|r| r.id).collect();

    let ticket_rows = sqlx::query_as::<_, Ticket>(
        "SELECT id, \"row\", seat, show_session_id, reservation_id
         FROM tickets
         WHERE reservation_id = ANY($1)
         ORDER BY \"row\", seat",
    )
    .bind(&reservation_ids)
    .fetch_all(&state.db.pool)
    .await?;

    let mut by_reservation: BTreeMap<i64, Vec<TicketResponse>> = BTreeMap::new();
    for t in ticket_rows {
        by_reservation
            .entry(t.reservation_id)
            .or_default()
            .push(TicketResponse {
                id: t.id,
                row: t.row,
                seat: t.seat,
                show_session: t.show_session_id,
            });
    }

    let results: Vec<ReservationResponse> = page_rows
        .into_iter()
        .map(|r| ReservationResponse {
            id: r.id,
            created_at: r.created_at,
            tickets: by_reservation.remove(&r.id).unwrap_or_default(),
        })
        .collect();

    Ok(Json(ReservationListResponse { count, results }))
}

/* ---------- CREATE (booking transaction) ---------- */

#[derive(Debug, Deserialize)]
struct TicketRequest {
    row: i32,
    seat: i32,
    show_session: i64,
}

#[derive(Debug, Deserialize)]
struct CreateReservationRequest {
    tickets: Vec<TicketRequest>,
}

// POST /reservations
//
// Creates one reservation for the requesting user and all of its tickets in
// a single transaction. Any out-of-range seat or duplicate
// (session, row, seat) aborts the whole thing; the transaction rolls back on
// drop, so nothing persists.
async fn create_reservation(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateReservationRequest>,
) -> Result<impl IntoResponse, AppError> {
    if req.tickets.is_empty() {
        return Err(AppError::field("tickets", "This list may not be empty."));
    }

    let mut tx = state.db.pool.begin().await?;

    let (reservation_id, created_at) = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
        "INSERT INTO reservations (user_id) VALUES ($1) RETURNING id, created_at",
    )
    .bind(user.id)
    .fetch_one(&mut *tx)
    .await?;

    let mut tickets = Vec::with_capacity(req.tickets.len());
    for ticket in &req.tickets {
        let dome = session_dome(&mut *tx, ticket.show_session)
            .await?
            .ok_or_else(|| {
                AppError::field(
                    "show_session",
                    format!("Invalid show session id: {}", ticket.show_session),
                )
            })?;

        validate_ticket(ticket.row, ticket.seat, &dome)?;

        let ticket_id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO tickets (\"row\", seat, show_session_id, reservation_id)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(ticket.row)
        .bind(ticket.seat)
        .bind(ticket.show_session)
        .bind(reservation_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            conflict_on_unique(
                e,
                &format!(
                    "Seat {} in row {} is already taken for this session",
                    ticket.seat, ticket.row
                ),
            )
        })?;

        tickets.push(TicketResponse {
            id: ticket_id,
            row: ticket.row,
            seat: ticket.seat,
            show_session: ticket.show_session,
        });
    }

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(ReservationResponse {
            id: reservation_id,
            created_at,
            tickets,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_page_starts_at_zero() {
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(3, 10), 20);
        assert_eq!(page_offset(2, 100), 100);
    }

    #[test]
    fn huge_page_number_does_not_overflow() {
        assert_eq!(page_offset(u32::MAX, 100), (u32::MAX as i64 - 1) * 100);
    }
}
