use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::error::AppError;
use crate::middleware::{AdminUser, AuthUser};
use crate::models::show::{self, AstronomyShow};
use crate::models::theme::ShowTheme;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/astronomy-shows", get(list_shows).post(create_show))
        .route("/astronomy-shows/{id}", get(retrieve_show))
        .route("/astronomy-shows/{id}/upload-image", post(upload_image))
}

#[derive(Debug, Deserialize)]
struct ShowsQuery {
    /// Case-insensitive substring match on the title.
    title: Option<String>,
    /// Comma-separated theme id list, e.g. `?theme=2,5`.
    theme: Option<String>,
}

#[derive(Debug, Serialize)]
struct ShowListItem {
    id: i64,
    title: String,
    theme: Vec<String>,
}

// Escape LIKE wildcards so a filter value only ever matches literally.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn parse_id_list(raw: &str) -> Result<Vec<i64>, AppError> {
    raw.split(',')
        .map(|s| {
            s.trim()
                .parse::<i64>()
                .map_err(|_| AppError::BadRequest(format!("Invalid theme id: {s}")))
        })
        .collect()
}

async fn list_shows(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(params): Query<ShowsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let theme_ids = params.theme.as_deref().map(parse_id_list).transpose()?;

    let mut q = String::from(
        "SELECT s.id, s.title,
                COALESCE(array_agg(t.name ORDER BY t.id) FILTER (WHERE t.name IS NOT NULL), '{}') AS theme
         FROM astronomy_shows s
         LEFT JOIN astronomy_show_themes st ON st.show_id = s.id
         LEFT JOIN show_themes t ON t.id = st.theme_id
         WHERE TRUE",
    );
    let mut bind_idx = 1;
    if params.title.is_some() {
        q.push_str(&format!(" AND s.title ILIKE '%' || ${bind_idx} || '%'"));
        bind_idx += 1;
    }
    if theme_ids.is_some() {
        q.push_str(&format!(
            " AND s.id IN (SELECT show_id FROM astronomy_show_themes WHERE theme_id = ANY(${bind_idx}))"
        ));
    }
    q.push_str(" GROUP BY s.id ORDER BY s.id");

    let mut dbq = sqlx::query_as::<_, (i64, String, Vec<String>)>(&q);
    if let Some(title) = params.title {
        dbq = dbq.bind(escape_like(&title));
    }
    if let Some(ids) = theme_ids {
        dbq = dbq.bind(ids);
    }

    let rows = dbq.fetch_all(&state.db.pool).await?;

    let payload: Vec<ShowListItem> = rows
        .into_iter()
        .map(|(id, title, theme)| ShowListItem { id, title, theme })
        .collect();

    Ok(Json(payload))
}

#[derive(Debug, Serialize)]
struct ShowDetailResponse {
    id: i64,
    title: String,
    theme: Vec<ShowTheme>,
    description: String,
    image: Option<String>,
}

async fn fetch_show(pool: &sqlx::PgPool, id: i64) -> Result<AstronomyShow, AppError> {
    sqlx::query_as::<_, AstronomyShow>(
        "SELECT id, title, description, image FROM astronomy_shows WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Astronomy show {id} not found")))
}

async fn fetch_show_themes(pool: &sqlx::PgPool, show_id: i64) -> Result<Vec<ShowTheme>, AppError> {
    let themes = sqlx::query_as::<_, ShowTheme>(
        "SELECT t.id, t.name
         FROM show_themes t
         JOIN astronomy_show_themes st ON st.theme_id = t.id
         WHERE st.show_id = $1
         ORDER BY t.id",
    )
    .bind(show_id)
    .fetch_all(pool)
    .await?;
    Ok(themes)
}

async fn retrieve_show(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let show = fetch_show(&state.db.pool, id).await?;
    let theme = fetch_show_themes(&state.db.pool, id).await?;

    Ok(Json(ShowDetailResponse {
        id: show.id,
        title: show.title,
        theme,
        description: show.description,
        image: show.image,
    }))
}

#[derive(Debug, Deserialize)]
struct CreateShowRequest {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    theme: Vec<i64>,
}

async fn create_show(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Json(req): Json<CreateShowRequest>,
) -> Result<impl IntoResponse, AppError> {
    show::validate_title(&req.title)?;

    let mut tx = state.db.pool.begin().await?;

    let created = sqlx::query_as::<_, AstronomyShow>(
        "INSERT INTO astronomy_shows (title, description)
         VALUES ($1, $2)
         RETURNING id, title, description, image",
    )
    .bind(&req.title)
    .bind(&req.description)
    .fetch_one(&mut *tx)
    .await?;

    for theme_id in &req.theme {
        sqlx::query("INSERT INTO astronomy_show_themes (show_id, theme_id) VALUES ($1, $2)")
            .bind(created.id)
            .bind(theme_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23503") => {
                    AppError::field("theme", format!("Invalid theme id: {theme_id}"))
                }
                _ => AppError::Database(e),
            })?;
    }

    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "id": created.id,
            "title": created.title,
            "theme": req.theme,
            "description": created.description,
        })),
    ))
}

// POST /astronomy-shows/{id}/upload-image
// Accepts a single multipart `image` part and replaces the show's image
// reference. The old file stays on disk.
async fn upload_image(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let show = fetch_show(&state.db.pool, id).await?;

    let mut stored: Option<String> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_owned)
            .ok_or_else(|| AppError::field("image", "No file was submitted."))?;
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?;
        if data.is_empty() {
            return Err(AppError::field("image", "The submitted file is empty."));
        }

        let relative = show::image_path(&show.title, &filename);
        let full_path = std::path::Path::new(&state.config.media.root).join(&relative);
        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Internal(format!("Failed to create media dir: {e}")))?;
        }
        tokio::fs::write(&full_path, &data)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store image: {e}")))?;

        stored = Some(relative);
        break;
    }

    let image = stored.ok_or_else(|| AppError::field("image", "No file was submitted."))?;

    sqlx::query("UPDATE astronomy_shows SET image = $1 WHERE id = $2")
        .bind(&image)
        .bind(id)
        .execute(&state.db.pool)
        .await?;

    Ok((StatusCode::OK, Json(json!({ "id": id, "image": image }))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_titles_pass_through() {
        assert_eq!(escape_like("Mars Show"), "Mars Show");
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("back\\slash"), "back\\\\slash");
    }

    #[test]
    fn id_list_parsing() {
        assert_eq!(parse_id_list("2,5").unwrap(), vec![2, 5]);
        assert_eq!(parse_id_list(" 7 ").unwrap(), vec![7]);
        assert!(parse_id_list("2,x").is_err());
    }
}
