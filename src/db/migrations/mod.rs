use anyhow::Result;
use sqlx::PgPool;
use tracing::info;

/// Idempotent schema statements, executed in order inside one transaction.
/// Safe to run on every startup; every statement is a no-op when the object
/// already exists.
const MIGRATIONS: &[&str] = &[
    // Location hierarchy (maintained by external CRUD, read here)
    r#"
    CREATE TABLE IF NOT EXISTS cities (
        id       BIGSERIAL PRIMARY KEY,
        name_ru  TEXT NOT NULL,
        name_en  TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS buildings (
        id          BIGSERIAL PRIMARY KEY,
        city_id     BIGINT NOT NULL REFERENCES cities(id) ON DELETE CASCADE,
        address_ru  TEXT NOT NULL,
        address_en  TEXT NOT NULL,
        floor_count INT  NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS auditoriums (
        id                BIGSERIAL PRIMARY KEY,
        building_id       BIGINT NOT NULL REFERENCES buildings(id) ON DELETE CASCADE,
        floor_number      INT  NOT NULL DEFAULT 0,
        capacity          INT  NOT NULL DEFAULT 0,
        auditorium_number TEXT NOT NULL,
        type              TEXT NOT NULL DEFAULT 'classroom',
        type_ru           TEXT NOT NULL DEFAULT '',
        image_url         TEXT NOT NULL DEFAULT ''
    )
    "#,
    // Registered sensors and their single active assignment
    r#"
    CREATE TABLE IF NOT EXISTS cameras (
        id         BIGSERIAL PRIMARY KEY,
        mac        TEXT NOT NULL UNIQUE,
        created_at TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS camera_assignments (
        camera_id     BIGINT PRIMARY KEY REFERENCES cameras(id) ON DELETE CASCADE,
        auditorium_id BIGINT NOT NULL REFERENCES auditoriums(id) ON DELETE CASCADE,
        created_at    TIMESTAMPTZ NOT NULL DEFAULT now()
    )
    "#,
    // Raw observations, written by the consumer, retired by the aggregator
    r#"
    CREATE TABLE IF NOT EXISTS occupancy (
        id            BIGSERIAL PRIMARY KEY,
        auditorium_id BIGINT NOT NULL REFERENCES auditoriums(id) ON DELETE CASCADE,
        person_count  BIGINT NOT NULL CHECK (person_count >= 0),
        timestamp     TIMESTAMPTZ NOT NULL
    )
    "#,
    // Hourly rollups, one row per (auditorium, day, hour)
    r#"
    CREATE TABLE IF NOT EXISTS daily_load (
        id               BIGSERIAL PRIMARY KEY,
        auditorium_id    BIGINT NOT NULL REFERENCES auditoriums(id) ON DELETE CASCADE,
        day              DATE   NOT NULL,
        hour             INT    NOT NULL CHECK (hour BETWEEN 0 AND 23),
        avg_person_count DOUBLE PRECISION NOT NULL CHECK (avg_person_count >= 0)
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_occupancy_auditorium_ts
        ON occupancy (auditorium_id, timestamp DESC)
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_occupancy_ts
        ON occupancy (timestamp)
    "#,
    r#"
    CREATE UNIQUE INDEX IF NOT EXISTS idx_daily_load_bucket
        ON daily_load (auditorium_id, day, hour)
    "#,
];

/// Apply the embedded schema to the database.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    let mut tx = pool.begin().await?;

    for (i, statement) in MIGRATIONS.iter().enumerate() {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .map_err(|e| anyhow::anyhow!("migration statement {} failed: {}", i + 1, e))?;
    }

    tx.commit().await?;
    info!("Applied {} schema statements", MIGRATIONS.len());

    Ok(())
}
