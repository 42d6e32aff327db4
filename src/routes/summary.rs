use axum::{extract::Path, extract::State, routing::get, Json, Router};
use chrono::Utc;
use tracing::info;

use crate::{AppError, DailySummary, HistoricalTrend, ReadingSource, ReadingStore, WeatherService};

// ---

pub fn router<S, T>() -> Router<WeatherService<S, T>>
where
    S: ReadingSource,
    T: ReadingStore,
{
    // ---
    Router::new()
        .route("/summary/{city}", get(daily_summary::<S, T>))
        .route("/historical/{city}", get(historical_trend::<S, T>))
}

/// `GET /summary/{city}`: rollup of the last 24 hours.
async fn daily_summary<S, T>(
    Path(city): Path<String>,
    State(service): State<WeatherService<S, T>>,
) -> Result<Json<DailySummary>, AppError>
where
    S: ReadingSource,
    T: ReadingStore,
{
    // ---
    info!(city = %city, "GET /summary");
    let now = Utc::now().timestamp();
    Ok(Json(service.daily_summary(&city, now).await?))
}

/// `GET /historical/{city}`: trend over the last 7 days.
async fn historical_trend<S, T>(
    Path(city): Path<String>,
    State(service): State<WeatherService<S, T>>,
) -> Result<Json<HistoricalTrend>, AppError>
where
    S: ReadingSource,
    T: ReadingStore,
{
    // ---
    info!(city = %city, "GET /historical");
    let now = Utc::now().timestamp();
    Ok(Json(service.historical_trend(&city, now).await?))
}
