use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PlanetariumDome {
    pub id: i64,
    pub name: String,
    pub rows: i32,
    pub seats_in_row: i32,
}

impl PlanetariumDome {
    /// Total number of seats in the dome's grid.
    pub fn capacity(&self) -> i64 {
        capacity(self.rows, self.seats_in_row)
    }
}

pub fn capacity(rows: i32, seats_in_row: i32) -> i64 {
    rows as i64 * seats_in_row as i64
}

/// Both grid dimensions must be positive. Checked before any dome insert;
/// the CHECK constraints in the schema are the backstop.
pub fn validate_rows_and_seats(rows: i32, seats_in_row: i32) -> Result<(), AppError> {
    if rows <= 0 {
        return Err(AppError::field(
            "rows",
            "The number of rows must be a positive integer.",
        ));
    }
    if seats_in_row <= 0 {
        return Err(AppError::field(
            "seats_in_row",
            "The number of seats per row must be a positive integer.",
        ));
    }
    Ok(())
}

pub fn validate_name(name: &str) -> Result<(), AppError> {
    if name.is_empty() {
        return Err(AppError::field(
            "name",
            "The planetarium name cannot be empty.",
        ));
    }
    if name.chars().count() > 255 {
        return Err(AppError::field(
            "name",
            "The planetarium name must not exceed 255 characters.",
        ));
    }
    Ok(())
}
