use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{AlertCheck, AppError, ReadingSource, ReadingStore, WeatherService};

// ---

pub fn router<S, T>() -> Router<WeatherService<S, T>>
where
    S: ReadingSource,
    T: ReadingStore,
{
    // ---
    Router::new()
        .route("/alerts", get(list_alerts::<S, T>).post(set_alert::<S, T>))
        .route("/alerts/{city}/check", get(check_alert::<S, T>))
        .route("/alert_visualization", get(alert_visualization::<S, T>))
}

/// Query parameters for `POST /alerts`
#[derive(Debug, Deserialize)]
pub struct SetAlertQuery {
    city: String,
    threshold: f64,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Serialize)]
struct ChartResponse {
    chart: String,
}

/// `POST /alerts?city=..&threshold=..`
async fn set_alert<S, T>(
    Query(params): Query<SetAlertQuery>,
    State(service): State<WeatherService<S, T>>,
) -> Result<Json<MessageResponse>, AppError>
where
    S: ReadingSource,
    T: ReadingStore,
{
    // ---
    info!(city = %params.city, threshold = params.threshold, "POST /alerts");
    service.set_alert(&params.city, params.threshold)?;
    Ok(Json(MessageResponse {
        message: format!("Alert set for {} at {}°C", params.city, params.threshold),
    }))
}

/// `GET /alerts`: every configured threshold by city.
async fn list_alerts<S, T>(
    State(service): State<WeatherService<S, T>>,
) -> Json<BTreeMap<String, f64>>
where
    S: ReadingSource,
    T: ReadingStore,
{
    Json(service.alerts())
}

/// `GET /alerts/{city}/check`: evaluate the latest stored reading now.
async fn check_alert<S, T>(
    Path(city): Path<String>,
    State(service): State<WeatherService<S, T>>,
) -> Result<Json<AlertCheck>, AppError>
where
    S: ReadingSource,
    T: ReadingStore,
{
    // ---
    info!(city = %city, "GET /alerts/check");
    Ok(Json(service.check_alert(&city).await?))
}

/// `GET /alert_visualization`
async fn alert_visualization<S, T>(
    State(service): State<WeatherService<S, T>>,
) -> Result<Json<ChartResponse>, AppError>
where
    S: ReadingSource,
    T: ReadingStore,
{
    Ok(Json(ChartResponse {
        chart: service.alert_chart()?,
    }))
}
