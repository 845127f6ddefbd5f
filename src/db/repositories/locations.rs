use crate::db::models::{Auditorium, Building, City};
use crate::error::Error;
use anyhow::Result;
use sqlx::PgPool;
use std::sync::Arc;

/// Read-only repository over the location hierarchy. The hierarchy itself is
/// maintained by external CRUD; this service only ever looks it up.
#[derive(Clone)]
pub struct LocationsRepository {
    pool: Arc<PgPool>,
}

impl LocationsRepository {
    /// Create a new locations repository
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Get all cities
    pub async fn get_cities(&self) -> Result<Vec<City>> {
        let result = sqlx::query_as::<_, City>(
            r#"
            SELECT id, name_ru, name_en
            FROM cities
            ORDER BY id
            "#,
        )
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get cities: {}", e)))?;

        Ok(result)
    }

    /// Get buildings for a city
    pub async fn get_buildings_by_city(&self, city_id: i64) -> Result<Vec<Building>> {
        let result = sqlx::query_as::<_, Building>(
            r#"
            SELECT id, city_id, address_ru, address_en, floor_count
            FROM buildings
            WHERE city_id = $1
            ORDER BY id
            "#,
        )
        .bind(city_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| Error::Database(format!("Failed to get buildings for city {}: {}", city_id, e)))?;

        Ok(result)
    }

    /// Get auditoriums for a building
    pub async fn get_auditoriums_by_building(&self, building_id: i64) -> Result<Vec<Auditorium>> {
        let result = sqlx::query_as::<_, Auditorium>(
            r#"
            SELECT id, building_id, floor_number, capacity, auditorium_number,
                   type, type_ru, image_url
            FROM auditoriums
            WHERE building_id = $1
            ORDER BY id
            "#,
        )
        .bind(building_id)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| {
            Error::Database(format!(
                "Failed to get auditoriums for building {}: {}",
                building_id, e
            ))
        })?;

        Ok(result)
    }
}
