//! Error types for the weather pipeline.
//!
//! Boundary errors (`FetchError`, `StoreError`, `RenderError`) stay local to
//! their collaborator. `AppError` is what query-facing operations return and
//! maps onto HTTP status codes for the `routes` gateway.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

// ---

/// Failure to obtain a reading from the provider.
#[derive(Debug, Error)]
pub enum FetchError {
    // ---
    #[error("weather provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("weather provider returned HTTP {0}")]
    Status(u16),

    #[error("weather provider does not know location '{0}'")]
    UnknownLocation(String),

    #[error("malformed weather payload: {0}")]
    Malformed(String),

    #[error("weather fetch timed out after {0}s")]
    Timeout(u64),
}

/// Failure of the time-series store.
#[derive(Debug, Error)]
pub enum StoreError {
    // ---
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Failure to render a chart.
#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    // ---
    #[error("cannot chart an empty series")]
    EmptySeries,

    #[error("cannot chart non-finite value {0}")]
    NonFinite(f64),

    #[error("chart backend failed: {0}")]
    Backend(String),
}

impl<E> From<plotters::drawing::DrawingAreaErrorKind<E>> for RenderError
where
    E: std::error::Error + Send + Sync,
{
    fn from(err: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        RenderError::Backend(err.to_string())
    }
}

/// Errors surfaced by query-facing operations.
#[derive(Debug, Error)]
pub enum AppError {
    // ---
    #[error("City not found: {0}")]
    UnknownLocation(String),

    #[error("No data available for {0}")]
    NoData(String),

    #[error("No alert configured for {0}")]
    NoAlert(String),

    #[error("Invalid threshold: {0}")]
    InvalidThreshold(f64),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Persistence(#[from] StoreError),

    #[error("Error creating chart: {0}")]
    Rendering(#[from] RenderError),
}

/// JSON body returned for every error response.
#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl AppError {
    // ---
    pub fn status_code(&self) -> StatusCode {
        // ---
        match self {
            AppError::UnknownLocation(_) | AppError::NoData(_) | AppError::NoAlert(_) => {
                StatusCode::NOT_FOUND
            }
            AppError::InvalidThreshold(_) => StatusCode::BAD_REQUEST,
            AppError::Fetch(FetchError::UnknownLocation(_)) => StatusCode::NOT_FOUND,
            AppError::Fetch(_) => StatusCode::BAD_GATEWAY,
            AppError::Persistence(_) | AppError::Rendering(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // ---
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        (
            status,
            Json(ErrorBody {
                detail: self.to_string(),
            }),
        )
            .into_response()
    }
}
