use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ShowTheme {
    pub id: i64,
    pub name: String,
}

pub fn validate_name(name: &str) -> Result<(), AppError> {
    if name.is_empty() {
        return Err(AppError::field("name", "The theme name cannot be empty."));
    }
    if name.chars().count() > 255 {
        return Err(AppError::field(
            "name",
            "The theme name must not exceed 255 characters.",
        ));
    }
    Ok(())
}
