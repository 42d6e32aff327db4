//! Database schema management for `codemetal-weatherflow`.
//!
//! Ensures the readings table and its range-query index exist before the
//! scheduler starts writing. Applied once on startup from `main.rs`.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Safe to call on every startup; no-op if objects already exist.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    // Append-only time series, one row per sampled reading
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS weather_readings (
            id           BIGSERIAL        PRIMARY KEY,
            location     TEXT             NOT NULL,
            temperature  DOUBLE PRECISION NOT NULL,
            feels_like   DOUBLE PRECISION NOT NULL,
            condition    TEXT             NOT NULL,
            observed_at  BIGINT           NOT NULL,
            recorded_at  TIMESTAMPTZ      NOT NULL DEFAULT now()
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Serves both the windowed range query and "latest for location"
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_weather_readings_location_observed
            ON weather_readings (location, observed_at);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
