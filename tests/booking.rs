//! Booking atomicity and permission outcomes against a real database.
//!
//! These need a running Postgres (`DATABASE_URL`); run them explicitly with
//! `cargo test -- --ignored`.

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use sqlx::PgPool;
use std::sync::Arc;
use tower::ServiceExt;

use planetarium_api::{
    config::{AppConfig, Config, DatabaseConfig, JwtConfig, MediaConfig},
    controllers,
    database::Database,
    services::auth,
    AppState,
};

fn test_config() -> Config {
    Config {
        app: AppConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            environment: "test".to_string(),
            rust_log: "error".to_string(),
        },
        database: DatabaseConfig {
            url: String::new(),
            pool_size: 1,
            acquire_timeout_seconds: 1,
        },
        jwt: JwtConfig {
            secret: "test-secret".to_string(),
            access_expires_minutes: 60,
            refresh_expires_days: 7,
        },
        media: MediaConfig {
            root: "media".to_string(),
        },
    }
}

fn test_app(pool: PgPool) -> (Router, Config) {
    let config = test_config();
    let state = Arc::new(AppState {
        db: Database { pool },
        config: config.clone(),
    });
    let app = Router::new()
        .nest("/api", controllers::routes())
        .with_state(state);
    (app, config)
}

async fn create_user(pool: &PgPool, email: &str, is_staff: bool) -> i64 {
    let hash = auth::hash_password("testpassword123").unwrap();
    sqlx::query_scalar::<_, i64>(
        "INSERT INTO users (email, password_hash, is_staff) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(email)
    .bind(hash)
    .bind(is_staff)
    .fetch_one(pool)
    .await
    .unwrap()
}

// Dome 10x20, one show, one session. Returns the session id.
async fn seed_session(pool: &PgPool) -> i64 {
    let dome_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO planetarium_domes (name, rows, seats_in_row)
         VALUES ('Test Dome', 10, 20) RETURNING id",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    let show_id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO astronomy_shows (title, description)
         VALUES ('Mars Show', 'A show about Mars') RETURNING id",
    )
    .fetch_one(pool)
    .await
    .unwrap();

    sqlx::query_scalar::<_, i64>(
        "INSERT INTO show_sessions (astronomy_show_id, planetarium_dome_id, show_time)
         VALUES ($1, $2, NOW()) RETURNING id",
    )
    .bind(show_id)
    .bind(dome_id)
    .fetch_one(pool)
    .await
    .unwrap()
}

fn bearer(user_id: i64, config: &Config) -> String {
    let pair = auth::issue_token_pair(user_id, &config.jwt).unwrap();
    format!("Bearer {}", pair.access)
}

async fn post_json(app: Router, uri: &str, token: &str, body: Value) -> StatusCode {
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::AUTHORIZATION, token)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    response.status()
}

async fn counts(pool: &PgPool) -> (i64, i64) {
    let reservations = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM reservations")
        .fetch_one(pool)
        .await
        .unwrap();
    let tickets = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM tickets")
        .fetch_one(pool)
        .await
        .unwrap();
    (reservations, tickets)
}

#[ignore = "requires a running Postgres (DATABASE_URL)"]
#[sqlx::test(migrations = "./src/migrations")]
async fn second_booking_of_taken_seat_is_conflict(pool: PgPool) {
    let session = seed_session(&pool).await;
    let alice = create_user(&pool, "alice@test.com", false).await;
    let bob = create_user(&pool, "bob@test.com", false).await;
    let (app, config) = test_app(pool.clone());

    let body = json!({ "tickets": [{ "row": 1, "seat": 1, "show_session": session }] });

    let status = post_json(
        app.clone(),
        "/api/reservations",
        &bearer(alice, &config),
        body.clone(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(counts(&pool).await, (1, 1));

    // Same seat, same session: rejected at the unique constraint.
    let status = post_json(app, "/api/reservations", &bearer(bob, &config), body).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Prior data unchanged: one reservation, one ticket, still Alice's.
    assert_eq!(counts(&pool).await, (1, 1));
    let owner = sqlx::query_scalar::<_, i64>(
        "SELECT r.user_id FROM tickets t JOIN reservations r ON r.id = t.reservation_id",
    )
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(owner, alice);
}

#[ignore = "requires a running Postgres (DATABASE_URL)"]
#[sqlx::test(migrations = "./src/migrations")]
async fn mixed_batch_persists_nothing(pool: PgPool) {
    let session = seed_session(&pool).await;
    let alice = create_user(&pool, "alice@test.com", false).await;
    let (app, config) = test_app(pool.clone());

    // Row 99 is outside the 10x20 grid; the valid ticket must not survive.
    let body = json!({
        "tickets": [
            { "row": 1, "seat": 1, "show_session": session },
            { "row": 99, "seat": 1, "show_session": session }
        ]
    });

    let status = post_json(app, "/api/reservations", &bearer(alice, &config), body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(counts(&pool).await, (0, 0));
}

#[ignore = "requires a running Postgres (DATABASE_URL)"]
#[sqlx::test(migrations = "./src/migrations")]
async fn duplicate_seat_within_one_request_persists_nothing(pool: PgPool) {
    let session = seed_session(&pool).await;
    let alice = create_user(&pool, "alice@test.com", false).await;
    let (app, config) = test_app(pool.clone());

    let body = json!({
        "tickets": [
            { "row": 2, "seat": 3, "show_session": session },
            { "row": 2, "seat": 3, "show_session": session }
        ]
    });

    let status = post_json(app, "/api/reservations", &bearer(alice, &config), body).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(counts(&pool).await, (0, 0));
}

#[ignore = "requires a running Postgres (DATABASE_URL)"]
#[sqlx::test(migrations = "./src/migrations")]
async fn non_staff_create_on_admin_resource_is_forbidden(pool: PgPool) {
    let alice = create_user(&pool, "alice@test.com", false).await;
    let admin = create_user(&pool, "admin@test.com", true).await;
    let (app, config) = test_app(pool.clone());

    let body = json!({ "name": "New Dome", "rows": 5, "seats_in_row": 5 });

    let status = post_json(
        app.clone(),
        "/api/planetarium-domes",
        &bearer(alice, &config),
        body.clone(),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let domes = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM planetarium_domes")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(domes, 0);

    let status = post_json(app, "/api/planetarium-domes", &bearer(admin, &config), body).await;
    assert_eq!(status, StatusCode::CREATED);
}
