//! Time-Series Store: append-only persistence of readings per location.
//!
//! The contract every implementation honours:
//! - `append` stores a reading exactly as given, never editing earlier ones
//! - `range(location, t, _)` returns exactly the readings of `location` with
//!   `observed_at >= t`; with [`RangeOrder::Ascending`] they come back sorted
//!   by `observed_at`, ties in insertion order
//! - `latest(location)` is the reading with the greatest `observed_at`

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use sqlx::PgPool;

use crate::{Reading, StoreError};

// ---

/// Ordering requested from a range query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOrder {
    // ---
    Ascending,
    Unordered,
}

/// Append-only reading persistence with range queries.
pub trait ReadingStore: Send + Sync + 'static {
    /// Persist one reading.
    fn append(&self, reading: &Reading) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Readings for `location` observed at or after `min_timestamp`.
    fn range(
        &self,
        location: &str,
        min_timestamp: i64,
        order: RangeOrder,
    ) -> impl Future<Output = Result<Vec<Reading>, StoreError>> + Send;

    /// Most recent reading for `location`, if any.
    fn latest(
        &self,
        location: &str,
    ) -> impl Future<Output = Result<Option<Reading>, StoreError>> + Send;
}

/// PostgreSQL-backed store over the `weather_readings` table.
#[derive(Debug, Clone)]
pub struct PgReadingStore {
    pool: PgPool,
}

impl PgReadingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ReadingStore for PgReadingStore {
    // ---
    async fn append(&self, reading: &Reading) -> Result<(), StoreError> {
        // ---
        sqlx::query(
            r#"
            INSERT INTO weather_readings (
                location, temperature, feels_like, condition, observed_at
            ) VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&reading.location)
        .bind(reading.temperature)
        .bind(reading.feels_like)
        .bind(&reading.condition)
        .bind(reading.observed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn range(
        &self,
        location: &str,
        min_timestamp: i64,
        order: RangeOrder,
    ) -> Result<Vec<Reading>, StoreError> {
        // ---
        let sql = match order {
            RangeOrder::Ascending => {
                r#"
                SELECT location, temperature, feels_like, condition, observed_at
                FROM weather_readings
                WHERE location = $1 AND observed_at >= $2
                ORDER BY observed_at ASC, id ASC
                "#
            }
            RangeOrder::Unordered => {
                r#"
                SELECT location, temperature, feels_like, condition, observed_at
                FROM weather_readings
                WHERE location = $1 AND observed_at >= $2
                "#
            }
        };

        let readings = sqlx::query_as::<_, Reading>(sql)
            .bind(location)
            .bind(min_timestamp)
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(location, min_timestamp, count = readings.len(), "Range query");
        Ok(readings)
    }

    async fn latest(&self, location: &str) -> Result<Option<Reading>, StoreError> {
        // ---
        let reading = sqlx::query_as::<_, Reading>(
            r#"
            SELECT location, temperature, feels_like, condition, observed_at
            FROM weather_readings
            WHERE location = $1
            ORDER BY observed_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(location)
        .fetch_optional(&self.pool)
        .await?;

        Ok(reading)
    }
}

/// In-process store, used when no database is configured and in tests.
///
/// Readings are kept per location in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryReadingStore {
    readings: Arc<Mutex<HashMap<String, Vec<Reading>>>>,
}

impl MemoryReadingStore {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of readings stored for `location`.
    pub fn count(&self, location: &str) -> usize {
        // ---
        let readings = self.readings.lock().unwrap_or_else(PoisonError::into_inner);
        readings.get(location).map_or(0, Vec::len)
    }
}

impl ReadingStore for MemoryReadingStore {
    // ---
    async fn append(&self, reading: &Reading) -> Result<(), StoreError> {
        // ---
        let mut readings = self.readings.lock().unwrap_or_else(PoisonError::into_inner);
        readings
            .entry(reading.location.clone())
            .or_default()
            .push(reading.clone());
        Ok(())
    }

    async fn range(
        &self,
        location: &str,
        min_timestamp: i64,
        order: RangeOrder,
    ) -> Result<Vec<Reading>, StoreError> {
        // ---
        let mut matched: Vec<Reading> = {
            let readings = self.readings.lock().unwrap_or_else(PoisonError::into_inner);
            readings
                .get(location)
                .map(|all| {
                    all.iter()
                        .filter(|r| r.observed_at >= min_timestamp)
                        .cloned()
                        .collect()
                })
                .unwrap_or_default()
        };

        if order == RangeOrder::Ascending {
            // Stable sort keeps insertion order for equal timestamps.
            matched.sort_by_key(|r| r.observed_at);
        }
        Ok(matched)
    }

    async fn latest(&self, location: &str) -> Result<Option<Reading>, StoreError> {
        // ---
        let readings = self.readings.lock().unwrap_or_else(PoisonError::into_inner);
        // max_by_key returns the last maximum, i.e. the newest insert on ties.
        Ok(readings
            .get(location)
            .and_then(|all| all.iter().max_by_key(|r| r.observed_at))
            .cloned())
    }
}
