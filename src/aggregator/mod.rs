use crate::error::Error;
use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Timelike, Utc};
use log::{error, info};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tokio_util::sync::CancellationToken;

/// Summary of one aggregation run.
#[derive(Debug, Clone, Copy)]
pub struct DayRollup {
    pub load_rows: u64,
    pub raw_rows_deleted: u64,
}

/// Right-open UTC window covering one calendar day: `[00:00, +24h)`.
pub fn day_window(day: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = day.and_hms_opt(0, 0, 0).expect("midnight always exists").and_utc();
    (start, start + ChronoDuration::days(1))
}

/// Yesterday as a UTC date, the conventional aggregation target.
pub fn default_target_day() -> NaiveDate {
    (Utc::now() - ChronoDuration::days(1)).date_naive()
}

/// Rolls raw occupancy rows up into hourly daily_load averages.
///
/// The whole job is one transaction: replace the day's rollups, insert fresh
/// averages, delete the source rows. Re-running a day replaces prior results
/// instead of double-averaging; a failed run leaves the raw data intact for a
/// retry.
#[derive(Clone)]
pub struct DailyAggregator {
    pool: Arc<PgPool>,
}

impl DailyAggregator {
    /// Create a new daily aggregator
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Aggregate one UTC day. A day with zero observations is an empty
    /// success, not an error.
    pub async fn aggregate_day(&self, day: NaiveDate) -> Result<DayRollup, Error> {
        let (start, end) = day_window(day);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Database(format!("failed to begin transaction: {}", e)))?;

        // Remove previous rollups for the same day to keep the job idempotent.
        sqlx::query("DELETE FROM daily_load WHERE day = $1")
            .bind(day)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                Error::Database(format!("failed to delete existing daily_load rows: {}", e))
            })?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO daily_load (auditorium_id, day, hour, avg_person_count)
            SELECT o.auditorium_id,
                   $1::date,
                   EXTRACT(hour FROM o.timestamp AT TIME ZONE 'UTC')::int,
                   AVG(o.person_count)::float8
            FROM occupancy o
            WHERE o.timestamp >= $2 AND o.timestamp < $3
            GROUP BY o.auditorium_id, EXTRACT(hour FROM o.timestamp AT TIME ZONE 'UTC')
            "#,
        )
        .bind(day)
        .bind(start)
        .bind(end)
        .execute(&mut *tx)
        .await
        .map_err(|e| Error::Database(format!("failed to insert daily_load rows: {}", e)))?;

        // Raw detail is retired once rolled up.
        let deleted = sqlx::query("DELETE FROM occupancy WHERE timestamp >= $1 AND timestamp < $2")
            .bind(start)
            .bind(end)
            .execute(&mut *tx)
            .await
            .map_err(|e| Error::Database(format!("failed to delete aggregated rows: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| Error::Database(format!("failed to commit aggregation: {}", e)))?;

        Ok(DayRollup {
            load_rows: inserted.rows_affected(),
            raw_rows_deleted: deleted.rows_affected(),
        })
    }

    /// Run the job once per UTC day for the previous day, at the given hour.
    ///
    /// Intended for in-process scheduling; `bin/aggregate` covers the
    /// cron-driven case. Never targets the current day.
    pub async fn run_scheduler(&self, run_hour: u32, shutdown: CancellationToken) {
        let mut ticker = interval(Duration::from_secs(60));
        let mut last_run_for: Option<NaiveDate> = None;

        info!("Daily aggregation scheduler started (runs at {:02}:00 UTC)", run_hour);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Aggregation scheduler shutting down");
                    return;
                }
                _ = ticker.tick() => {
                    let now = Utc::now();
                    let target = now.date_naive() - ChronoDuration::days(1);
                    if now.hour() < run_hour || last_run_for == Some(target) {
                        continue;
                    }

                    match self.aggregate_day(target).await {
                        Ok(rollup) => {
                            info!(
                                "Aggregated occupancy for {}: {} daily_load rows, {} raw rows retired",
                                target, rollup.load_rows, rollup.raw_rows_deleted
                            );
                            last_run_for = Some(target);
                        }
                        Err(e) => {
                            // Nothing was committed; the next tick retries the whole day.
                            error!("Daily aggregation for {} failed: {}", target, e);
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_window_spans_exactly_24_hours() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let (start, end) = day_window(day);
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap());
        assert_eq!(end - start, ChronoDuration::hours(24));
    }

    #[test]
    fn window_is_right_open() {
        // A row stamped exactly at day-start + 24h belongs to the next day.
        let day = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let (start, end) = day_window(day);
        let boundary = Utc.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap();
        assert_eq!(end, boundary);
        assert!(boundary >= start && !(boundary < end));

        let (next_start, _) = day_window(NaiveDate::from_ymd_opt(2024, 3, 11).unwrap());
        assert_eq!(next_start, boundary);
    }

    #[test]
    fn windows_of_adjacent_days_tile() {
        let day = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let (_, end) = day_window(day);
        let (next_start, _) = day_window(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(end, next_start);
    }
}
