use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Registered physical sensor, identified by its hardware MAC address.
/// Created by administrative CRUD; the ingest path only ever reads it.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Camera {
    pub id: i64,
    pub mac: String,
    pub created_at: DateTime<Utc>,
}

/// At most one active auditorium per camera.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CameraAssignment {
    pub camera_id: i64,
    pub auditorium_id: i64,
    pub created_at: DateTime<Utc>,
}
