//! Reading Source: fetches a normalized reading for one location.
//!
//! [`ReadingSource`] is the seam the scheduler and the query layer depend
//! on. [`OpenWeatherSource`] is the production implementation backed by the
//! OpenWeatherMap current-weather endpoint.

use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;

use crate::{FetchError, RawObservation, Reading};

// ---

/// Anything that can produce a fresh [`Reading`] for a location.
pub trait ReadingSource: Send + Sync + 'static {
    /// Fetch the current reading for `location`.
    fn fetch(&self, location: &str) -> impl Future<Output = Result<Reading, FetchError>> + Send;
}

/// OpenWeatherMap-backed reading source.
#[derive(Debug, Clone)]
pub struct OpenWeatherSource {
    // ---
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl OpenWeatherSource {
    // ---
    /// Build a source whose HTTP requests give up after `timeout`.
    pub fn new(api_url: &str, api_key: &str, timeout: Duration) -> Result<Self, FetchError> {
        // ---
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

impl ReadingSource for OpenWeatherSource {
    // ---
    async fn fetch(&self, location: &str) -> Result<Reading, FetchError> {
        // ---
        tracing::debug!(location, url = %self.api_url, "Fetching current weather");

        let response = self
            .client
            .get(&self.api_url)
            .query(&[("q", location), ("appid", self.api_key.as_str())])
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => return Err(FetchError::UnknownLocation(location.to_string())),
            status => return Err(FetchError::Status(status.as_u16())),
        }

        let body = response.text().await?;
        let raw: RawObservation =
            serde_json::from_str(&body).map_err(|e| FetchError::Malformed(e.to_string()))?;

        let reading = raw.to_reading(location)?;
        tracing::debug!(
            location,
            temperature = reading.temperature,
            condition = %reading.condition,
            observed_at = reading.observed_at,
            "Fetched reading"
        );
        Ok(reading)
    }
}
