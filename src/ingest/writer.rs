use crate::db::models::{Camera, CameraAssignment, Occupancy};
use crate::error::Error;
use crate::ingest::event::CameraEvent;
use sqlx::PgPool;
use std::sync::Arc;

/// Commits one occupancy observation per validated camera event.
///
/// Camera resolution, assignment resolution and the insert run inside a single
/// transaction so an assignment change racing an in-flight event cannot
/// produce a write against a half-updated assignment. No row is created on any
/// failure path.
#[derive(Clone)]
pub struct OccupancyWriter {
    pool: Arc<PgPool>,
}

impl OccupancyWriter {
    /// Create a new occupancy writer
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Store occupancy info from a camera event, returning the committed row.
    ///
    /// Errors are classified for the consumer loop: `CameraUnknown` and
    /// `CameraUnattached` are permanent rejections, `Database` is retryable.
    pub async fn save_event(&self, event: &CameraEvent) -> Result<Occupancy, Error> {
        let person_count = event
            .person_count
            .ok_or_else(|| Error::Validation("person_count is missing".to_string()))?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| Error::Database(format!("failed to begin transaction: {}", e)))?;

        let camera = sqlx::query_as::<_, Camera>(
            "SELECT id, mac, created_at FROM cameras WHERE mac = $1",
        )
        .bind(&event.camera_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            Error::Database(format!(
                "failed to load camera by mac {}: {}",
                event.camera_id, e
            ))
        })?;
        let camera = match camera {
            Some(camera) => camera,
            None => return Err(Error::CameraUnknown(event.camera_id.clone())),
        };

        let assignment = sqlx::query_as::<_, CameraAssignment>(
            "SELECT camera_id, auditorium_id, created_at FROM camera_assignments WHERE camera_id = $1",
        )
        .bind(camera.id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| Error::Database(format!("failed to load camera assignment: {}", e)))?;
        let assignment = match assignment {
            Some(assignment) => assignment,
            None => return Err(Error::CameraUnattached(event.camera_id.clone())),
        };

        let record = sqlx::query_as::<_, Occupancy>(
            r#"
            INSERT INTO occupancy (auditorium_id, person_count, timestamp)
            VALUES ($1, $2, $3)
            RETURNING id, auditorium_id, person_count, timestamp
            "#,
        )
        .bind(assignment.auditorium_id)
        .bind(person_count)
        .bind(event.timestamp)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| Error::Database(format!("failed to create occupancy record: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| Error::Database(format!("failed to commit occupancy record: {}", e)))?;

        Ok(record)
    }
}
