//! Query-facing operations over the shared pipeline components.
//!
//! [`WeatherService`] is the state handed to the `routes` gateway. It shares
//! its source, store and threshold registry with the [`Scheduler`], so
//! alerts configured here take effect on the next tick.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::aggregate::{summarize_or_sentinel, Window};
use crate::{
    charts, AlertSink, AppError, RangeOrder, Reading, ReadingSource, ReadingStore, Scheduler,
    Summary, ThresholdRegistry,
};

// ---

/// Daily view: summary plus an optional bar chart.
#[derive(Debug, Serialize)]
pub struct DailySummary {
    pub summary: Summary,
    pub chart: Option<String>,
}

/// Historical view: summary, ordered points and an optional line chart.
#[derive(Debug, Serialize)]
pub struct HistoricalTrend {
    pub summary: Summary,
    pub points: Vec<Reading>,
    pub chart: Option<String>,
}

/// Result of an ad-hoc alert evaluation against the latest stored reading.
#[derive(Debug, Serialize, PartialEq)]
pub struct AlertCheck {
    pub location: String,
    pub threshold: f64,
    pub observed_temp: f64,
    pub observed_at: i64,
    pub triggered: bool,
}

/// Shared handle over the pipeline components.
pub struct WeatherService<S, T> {
    // ---
    source: Arc<S>,
    store: Arc<T>,
    alerts: ThresholdRegistry,
    locations: Arc<[String]>,
}

// Manual impl: cloning only bumps reference counts, no `S: Clone` needed.
impl<S, T> Clone for WeatherService<S, T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            store: Arc::clone(&self.store),
            alerts: self.alerts.clone(),
            locations: Arc::clone(&self.locations),
        }
    }
}

impl<S: ReadingSource, T: ReadingStore> WeatherService<S, T> {
    // ---
    pub fn new(source: S, store: T, locations: Vec<String>) -> Self {
        // ---
        Self {
            source: Arc::new(source),
            store: Arc::new(store),
            alerts: ThresholdRegistry::new(),
            locations: locations.into(),
        }
    }

    /// Build a scheduler that shares this service's components.
    pub fn scheduler(&self, sink: Arc<dyn AlertSink>) -> Scheduler<S, T> {
        // ---
        Scheduler::new(
            Arc::clone(&self.source),
            Arc::clone(&self.store),
            self.alerts.clone(),
            sink,
            Arc::clone(&self.locations),
        )
    }

    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    fn check_location(&self, location: &str) -> Result<(), AppError> {
        // ---
        if self.locations.iter().any(|l| l == location) {
            Ok(())
        } else {
            Err(AppError::UnknownLocation(location.to_string()))
        }
    }

    /// Live reading from the provider. Not persisted.
    pub async fn current(&self, location: &str) -> Result<Reading, AppError> {
        // ---
        self.check_location(location)?;
        Ok(self.source.fetch(location).await?)
    }

    /// Most recent stored reading.
    pub async fn latest(&self, location: &str) -> Result<Reading, AppError> {
        // ---
        self.check_location(location)?;
        self.store
            .latest(location)
            .await?
            .ok_or_else(|| AppError::NoData(location.to_string()))
    }

    /// Summary of the last 24 hours ending at `now`.
    pub async fn daily_summary(&self, location: &str, now: i64) -> Result<DailySummary, AppError> {
        // ---
        self.check_location(location)?;
        let readings = self
            .store
            .range(location, Window::Daily.min_timestamp(now), RangeOrder::Ascending)
            .await?;

        tracing::debug!(location, count = readings.len(), "Daily window loaded");
        let summary = summarize_or_sentinel(&readings);
        let chart = if readings.is_empty() {
            None
        } else {
            Some(charts::daily_summary_chart(&summary)?)
        };
        Ok(DailySummary { summary, chart })
    }

    /// Trend over the last 7 days ending at `now`.
    pub async fn historical_trend(
        &self,
        location: &str,
        now: i64,
    ) -> Result<HistoricalTrend, AppError> {
        // ---
        self.check_location(location)?;
        let points = self
            .store
            .range(location, Window::Historical.min_timestamp(now), RangeOrder::Ascending)
            .await?;

        if points.is_empty() {
            tracing::warn!(location, "No historical data available");
        } else {
            tracing::info!(location, count = points.len(), "Historical window loaded");
        }

        let summary = summarize_or_sentinel(&points);
        let chart = if points.is_empty() {
            None
        } else {
            Some(charts::historical_trend_chart(location, &points)?)
        };
        Ok(HistoricalTrend {
            summary,
            points,
            chart,
        })
    }

    /// Set (or overwrite) the alert threshold for `location`.
    pub fn set_alert(&self, location: &str, threshold: f64) -> Result<(), AppError> {
        // ---
        self.check_location(location)?;
        if !threshold.is_finite() {
            return Err(AppError::InvalidThreshold(threshold));
        }
        self.alerts.set(location, threshold);
        Ok(())
    }

    /// Snapshot of all configured thresholds.
    pub fn alerts(&self) -> BTreeMap<String, f64> {
        self.alerts.get_all()
    }

    /// Bar chart of all configured thresholds.
    pub fn alert_chart(&self) -> Result<String, AppError> {
        Ok(charts::alert_thresholds_chart(&self.alerts.get_all())?)
    }

    /// Evaluate the latest stored reading against the configured threshold.
    pub async fn check_alert(&self, location: &str) -> Result<AlertCheck, AppError> {
        // ---
        self.check_location(location)?;
        let threshold = self
            .alerts
            .get(location)
            .ok_or_else(|| AppError::NoAlert(location.to_string()))?;
        let reading = self.latest(location).await?;

        Ok(AlertCheck {
            location: location.to_string(),
            threshold,
            observed_temp: reading.temperature,
            observed_at: reading.observed_at,
            triggered: crate::alerts::exceeds(&reading, threshold),
        })
    }
}
