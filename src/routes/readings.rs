use axum::{extract::Path, extract::State, routing::get, Json, Router};
use tracing::info;

use crate::{AppError, Reading, ReadingSource, ReadingStore, WeatherService};

// ---

pub fn router<S, T>() -> Router<WeatherService<S, T>>
where
    S: ReadingSource,
    T: ReadingStore,
{
    // ---
    Router::new()
        .route("/fetch/{city}", get(fetch_current::<S, T>))
        .route("/latest/{city}", get(latest::<S, T>))
}

/// `GET /fetch/{city}`: live reading from the provider, not stored.
async fn fetch_current<S, T>(
    Path(city): Path<String>,
    State(service): State<WeatherService<S, T>>,
) -> Result<Json<Reading>, AppError>
where
    S: ReadingSource,
    T: ReadingStore,
{
    // ---
    info!(city = %city, "GET /fetch");
    Ok(Json(service.current(&city).await?))
}

/// `GET /latest/{city}`: most recent stored reading.
async fn latest<S, T>(
    Path(city): Path<String>,
    State(service): State<WeatherService<S, T>>,
) -> Result<Json<Reading>, AppError>
where
    S: ReadingSource,
    T: ReadingStore,
{
    // ---
    info!(city = %city, "GET /latest");
    Ok(Json(service.latest(&city).await?))
}
