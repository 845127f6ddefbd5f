use crate::db::models::{DailyLoad, HourlyLoad, OccupancyReading};
use crate::error::Error;
use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Hour band the stats endpoint reports (auditoriums are in use 9:00-21:59).
const STATS_HOUR_FIRST: i32 = 9;
const STATS_HOUR_LAST: i32 = 21;

/// Read paths over raw occupancy rows and daily_load rollups.
#[derive(Clone)]
pub struct OccupancyRepository {
    pool: Arc<PgPool>,
}

impl OccupancyRepository {
    /// Create a new occupancy repository
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Latest observation for an auditorium at or before the given instant.
    pub async fn latest_for_auditorium(
        &self,
        auditorium_id: i64,
        at: DateTime<Utc>,
    ) -> Result<Option<OccupancyReading>> {
        let result = sqlx::query_as::<_, OccupancyReading>(
            r#"
            SELECT auditorium_id, person_count, timestamp
            FROM occupancy
            WHERE auditorium_id = $1 AND timestamp <= $2
            ORDER BY timestamp DESC
            LIMIT 1
            "#,
        )
        .bind(auditorium_id)
        .bind(at)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| {
            Error::Database(format!(
                "Failed to get occupancy for auditorium {}: {}",
                auditorium_id, e
            ))
        })?;

        Ok(result)
    }

    /// Latest observation per auditorium in a building at or before the
    /// given instant.
    pub async fn latest_by_building(
        &self,
        building_id: i64,
        at: DateTime<Utc>,
    ) -> Result<Vec<OccupancyReading>> {
        let result = sqlx::query_as::<_, OccupancyReading>(
            r#"
            SELECT DISTINCT ON (o.auditorium_id)
                   o.auditorium_id, o.person_count, o.timestamp
            FROM occupancy o
            JOIN auditoriums a ON a.id = o.auditorium_id
            WHERE a.building_id = $1 AND o.timestamp <= $2
            ORDER BY o.auditorium_id, o.timestamp DESC
            "#,
        )
        .bind(building_id)
        .bind(at)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| {
            Error::Database(format!(
                "Failed to get occupancy for building {}: {}",
                building_id, e
            ))
        })?;

        Ok(result)
    }

    /// Hourly averages for an auditorium on a UTC day, for hours 9-21.
    ///
    /// Closed days live in daily_load; the current day is still raw, so both
    /// sources are read and merged. Raw rows win on overlap, though overlap
    /// should not occur once a day has been aggregated. Returns `None` when
    /// neither source has any row for the day, so callers can tell "no
    /// observations" apart from "observed zero people all day".
    pub async fn hourly_stats(
        &self,
        auditorium_id: i64,
        day: NaiveDate,
    ) -> Result<Option<Vec<HourlyLoad>>> {
        let (start, end) = crate::aggregator::day_window(day);

        let rollups = sqlx::query_as::<_, DailyLoad>(
            r#"
            SELECT auditorium_id, day, hour, avg_person_count
            FROM daily_load
            WHERE auditorium_id = $1 AND day = $2
            "#,
        )
        .bind(auditorium_id)
        .bind(day)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get daily_load rows: {}", e)))?;

        let raw = sqlx::query_as::<_, HourlyLoad>(
            r#"
            SELECT EXTRACT(hour FROM timestamp AT TIME ZONE 'UTC')::int AS hour,
                   AVG(person_count)::float8 AS avg_person_count
            FROM occupancy
            WHERE auditorium_id = $1 AND timestamp >= $2 AND timestamp < $3
            GROUP BY 1
            "#,
        )
        .bind(auditorium_id)
        .bind(start)
        .bind(end)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get raw hourly stats: {}", e)))?;

        Ok(merge_hourly(rollups, raw))
    }
}

/// Merge rollup and raw rows into a dense 9-21 band, raw winning on overlap.
/// `None` means the day has no observations at all.
fn merge_hourly(rollups: Vec<DailyLoad>, raw: Vec<HourlyLoad>) -> Option<Vec<HourlyLoad>> {
    if rollups.is_empty() && raw.is_empty() {
        return None;
    }

    let mut by_hour: BTreeMap<i32, f64> = BTreeMap::new();
    for row in rollups {
        if (STATS_HOUR_FIRST..=STATS_HOUR_LAST).contains(&row.hour) {
            by_hour.insert(row.hour, row.avg_person_count);
        }
    }
    for row in raw {
        if (STATS_HOUR_FIRST..=STATS_HOUR_LAST).contains(&row.hour) {
            by_hour.insert(row.hour, row.avg_person_count);
        }
    }

    Some(
        (STATS_HOUR_FIRST..=STATS_HOUR_LAST)
            .map(|hour| HourlyLoad {
                hour,
                avg_person_count: by_hour.get(&hour).copied().unwrap_or(0.0),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rollup(hour: i32, avg: f64) -> DailyLoad {
        DailyLoad {
            auditorium_id: 1,
            day: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            hour,
            avg_person_count: avg,
        }
    }

    #[test]
    fn day_without_observations_is_not_reported_as_all_zero() {
        assert!(merge_hourly(Vec::new(), Vec::new()).is_none());
    }

    #[test]
    fn merged_band_is_dense_and_raw_wins_overlap() {
        let rollups = vec![rollup(10, 3.0), rollup(23, 9.0)];
        let raw = vec![
            HourlyLoad {
                hour: 10,
                avg_person_count: 5.0,
            },
            HourlyLoad {
                hour: 8,
                avg_person_count: 2.0,
            },
        ];

        let hours = merge_hourly(rollups, raw).unwrap();

        assert_eq!(hours.len(), 13);
        assert!(hours
            .iter()
            .all(|h| (STATS_HOUR_FIRST..=STATS_HOUR_LAST).contains(&h.hour)));
        let at_ten = hours.iter().find(|h| h.hour == 10).unwrap();
        assert_eq!(at_ten.avg_person_count, 5.0);
        let at_nine = hours.iter().find(|h| h.hour == 9).unwrap();
        assert_eq!(at_nine.avg_person_count, 0.0);
    }
}
