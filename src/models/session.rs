use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ShowSession {
    pub id: i64,
    pub astronomy_show_id: i64,
    pub planetarium_dome_id: i64,
    pub show_time: DateTime<Utc>,
}

/// Remaining seats for a session. Derived per query, never stored.
pub fn tickets_available(capacity: i64, tickets_sold: i64) -> i64 {
    capacity - tickets_sold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_is_capacity_minus_sold() {
        assert_eq!(tickets_available(400, 3), 397);
        assert_eq!(tickets_available(200, 0), 200);
        assert_eq!(tickets_available(200, 200), 0);
    }
}
