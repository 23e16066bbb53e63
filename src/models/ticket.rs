use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::AppError;
use crate::models::PlanetariumDome;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Ticket {
    pub id: i64,
    pub row: i32,
    pub seat: i32,
    pub show_session_id: i64,
    pub reservation_id: i64,
}

/// Checks that a ticket's coordinates fall inside the dome's seating grid:
/// 1 <= row <= dome.rows and 1 <= seat <= dome.seats_in_row. Must run before
/// the ticket is persisted; the error names the offending field and the
/// allowed range.
pub fn validate_ticket(row: i32, seat: i32, dome: &PlanetariumDome) -> Result<(), AppError> {
    for (value, field, dome_field, max) in [
        (row, "row", "rows", dome.rows),
        (seat, "seat", "seats_in_row", dome.seats_in_row),
    ] {
        if !(1..=max).contains(&value) {
            return Err(AppError::field(
                field,
                format!(
                    "{field} number must be in available range: (1, {dome_field}): (1, {max})"
                ),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dome(rows: i32, seats_in_row: i32) -> PlanetariumDome {
        PlanetariumDome {
            id: 1,
            name: "Test Dome".to_string(),
            rows,
            seats_in_row,
        }
    }

    #[test]
    fn accepts_corners_of_the_grid() {
        let d = dome(10, 20);
        assert!(validate_ticket(1, 1, &d).is_ok());
        assert!(validate_ticket(10, 20, &d).is_ok());
        assert!(validate_ticket(5, 7, &d).is_ok());
    }

    #[test]
    fn rejects_row_out_of_range_with_field_message() {
        let d = dome(10, 20);
        let err = validate_ticket(11, 1, &d).unwrap_err();
        match err {
            AppError::Validation(v) => {
                assert_eq!(
                    v["row"],
                    "row number must be in available range: (1, rows): (1, 10)"
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(validate_ticket(0, 1, &d).is_err());
        assert!(validate_ticket(-3, 1, &d).is_err());
    }

    #[test]
    fn rejects_seat_out_of_range_with_field_message() {
        let d = dome(10, 20);
        let err = validate_ticket(1, 21, &d).unwrap_err();
        match err {
            AppError::Validation(v) => {
                assert_eq!(
                    v["seat"],
                    "seat number must be in available range: (1, seats_in_row): (1, 20)"
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(validate_ticket(1, 0, &d).is_err());
    }

    #[test]
    fn row_is_checked_before_seat() {
        let d = dome(10, 20);
        // Both out of range: the row error wins.
        match validate_ticket(0, 0, &d).unwrap_err() {
            AppError::Validation(v) => assert!(v.get("row").is_some()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    proptest! {
        // Validation succeeds iff both coordinates are inside the grid.
        #[test]
        fn in_range_iff_valid(
            rows in 1..200i32,
            seats in 1..200i32,
            row in -50..250i32,
            seat in -50..250i32,
        ) {
            let d = dome(rows, seats);
            let ok = validate_ticket(row, seat, &d).is_ok();
            let expected = (1..=rows).contains(&row) && (1..=seats).contains(&seat);
            prop_assert_eq!(ok, expected);
        }
    }
}
