//! Data models for the weather sampling pipeline.

use serde::{Deserialize, Serialize};

use crate::FetchError;

// ---

/// Offset between Kelvin (provider units) and Celsius.
const KELVIN_OFFSET: f64 = 273.15;

/// Label used by the empty-window summary.
pub const NO_DATA_CONDITION: &str = "No data";

/// One normalized weather observation for a location.
///
/// `observed_at` is the provider's observation time (Unix seconds), never
/// the local clock. Readings are immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reading {
    // ---
    pub location: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub condition: String,
    pub observed_at: i64,
}

/// Aggregate statistics over a window of readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    // ---
    pub avg_temp: f64,
    pub max_temp: f64,
    pub min_temp: f64,
    pub dominant_condition: String,
}

impl Summary {
    /// Sentinel returned for a window without readings.
    pub fn no_data() -> Self {
        // ---
        Summary {
            avg_temp: 0.0,
            max_temp: 0.0,
            min_temp: 0.0,
            dominant_condition: NO_DATA_CONDITION.to_string(),
        }
    }
}

/// Payload handed to the alert sink when a reading crosses its threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertNotification {
    // ---
    pub location: String,
    pub threshold: f64,
    pub observed_temp: f64,
}

/// Current-weather payload as returned by the provider API
#[derive(Debug, Deserialize)]
pub struct RawObservation {
    // ---
    pub main: RawMain,
    pub weather: Vec<RawCondition>,
    pub dt: i64,
}

#[derive(Debug, Deserialize)]
pub struct RawMain {
    pub temp: f64,
    pub feels_like: f64,
}

#[derive(Debug, Deserialize)]
pub struct RawCondition {
    pub main: String,
}

impl RawObservation {
    // ---
    /// Normalize the provider payload into a [`Reading`] for `location`.
    pub fn to_reading(&self, location: &str) -> Result<Reading, FetchError> {
        // ---
        let condition = self
            .weather
            .first()
            .map(|w| w.main.clone())
            .ok_or_else(|| FetchError::Malformed("payload has no weather condition".into()))?;

        Ok(Reading {
            location: location.to_string(),
            temperature: self.main.temp - KELVIN_OFFSET,
            feels_like: self.main.feels_like - KELVIN_OFFSET,
            condition,
            observed_at: self.dt,
        })
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn sample_payload() -> serde_json::Value {
        // ---
        serde_json::json!({
            "dt": 1729290347,
            "main": { "temp": 293.15, "feels_like": 292.15, "humidity": 40 },
            "weather": [{ "main": "Clear", "description": "clear sky" }],
            "name": "Delhi"
        })
    }

    #[test]
    fn test_kelvin_conversion() {
        // ---
        let raw: RawObservation = serde_json::from_value(sample_payload()).unwrap();
        let reading = raw.to_reading("Delhi").unwrap();

        // 293.15K is 20°C, 292.15K is 19°C
        assert!((reading.temperature - 20.0).abs() < 1e-9);
        assert!((reading.feels_like - 19.0).abs() < 1e-9);
    }

    #[test]
    fn test_provider_timestamp_preserved() {
        // ---
        let raw: RawObservation = serde_json::from_value(sample_payload()).unwrap();
        let reading = raw.to_reading("Delhi").unwrap();

        assert_eq!(reading.observed_at, 1729290347);
        assert_eq!(reading.location, "Delhi");
        assert_eq!(reading.condition, "Clear");
    }

    #[test]
    fn test_missing_condition_is_malformed() {
        // ---
        let mut payload = sample_payload();
        payload["weather"] = serde_json::json!([]);
        let raw: RawObservation = serde_json::from_value(payload).unwrap();

        assert!(matches!(
            raw.to_reading("Delhi"),
            Err(FetchError::Malformed(_))
        ));
    }

    #[test]
    fn test_no_data_sentinel() {
        // ---
        let summary = Summary::no_data();
        assert_eq!(summary.avg_temp, 0.0);
        assert_eq!(summary.max_temp, 0.0);
        assert_eq!(summary.min_temp, 0.0);
        assert_eq!(summary.dominant_condition, "No data");
    }
}
