use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::error;

/// Request-local failure taxonomy. Every handler returns `Result<_, AppError>`
/// and the `IntoResponse` impl maps each variant to its status code and body.
#[derive(Debug, Error)]
pub enum AppError {
    /// Field-level validation failures, keyed by field name.
    #[error("validation failed")]
    Validation(Value),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Uniqueness conflict, e.g. a seat already sold for a session.
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("database error")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Single-field validation error in the DRF-style `{field: message}` shape.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(json!({ field: message.into() }))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match self {
            Self::Validation(fields) => fields,
            Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::Conflict(msg)
            | Self::BadRequest(msg) => json!({ "detail": msg }),
            Self::Database(e) => {
                error!(error = ?e, "database error");
                json!({ "detail": "A database error occurred" })
            }
            Self::Internal(msg) => {
                error!(message = %msg, "internal error");
                json!({ "detail": "Internal server error" })
            }
        };

        (status, Json(body)).into_response()
    }
}

/// Postgres unique-violation SQLSTATE.
const UNIQUE_VIOLATION: &str = "23505";

/// Maps a unique-constraint hit to `Conflict`, everything else to `Database`.
/// Used by writes whose only expected constraint failure is a duplicate key.
pub fn conflict_on_unique(e: sqlx::Error, message: &str) -> AppError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
            return AppError::Conflict(message.to_string());
        }
    }
    AppError::Database(e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_error_is_bad_request() {
        let err = AppError::field("rows", "The number of rows must be a positive integer.");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        match err {
            AppError::Validation(v) => {
                assert_eq!(
                    v["rows"],
                    "The number of rows must be a positive integer."
                );
            }
            _ => panic!("expected validation variant"),
        }
    }

    #[test]
    fn conflict_maps_to_409() {
        assert_eq!(
            AppError::Conflict("seat taken".into()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn non_database_error_passes_through() {
        let err = conflict_on_unique(sqlx::Error::RowNotFound, "dup");
        assert!(matches!(err, AppError::Database(_)));
    }
}
