use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One accepted occupancy observation. Created only by the occupancy writer,
/// deleted only by the daily aggregation job.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Occupancy {
    pub id: i64,
    pub auditorium_id: i64,
    pub person_count: i64,
    pub timestamp: DateTime<Utc>,
}

/// Hourly rollup row, one per (auditorium, UTC day, hour-of-day).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DailyLoad {
    pub auditorium_id: i64,
    pub day: NaiveDate,
    pub hour: i32,
    pub avg_person_count: f64,
}

/// Latest-observation projection used by the read paths; freshness is
/// evaluated on top of `timestamp` by the caller.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OccupancyReading {
    pub auditorium_id: i64,
    pub person_count: i64,
    pub timestamp: DateTime<Utc>,
}

/// Hourly average for the stats read path, merged from rollups and raw rows.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct HourlyLoad {
    pub hour: i32,
    pub avg_person_count: f64,
}
