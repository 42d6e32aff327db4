//! Alert Evaluator: threshold registry, predicate and notification sink.
//!
//! The registry is an explicit, cloneable handle shared by the scheduler and
//! the query layer. All handles point at the same map, guarded by a single
//! mutex that is never held across an `.await`. Configuration lives for the
//! lifetime of the process only.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};

use crate::{AlertNotification, Reading};

// ---

/// True iff the reading is strictly above `threshold`.
pub fn exceeds(reading: &Reading, threshold: f64) -> bool {
    reading.temperature > threshold
}

/// Per-location alert thresholds in °C.
#[derive(Debug, Clone, Default)]
pub struct ThresholdRegistry {
    thresholds: Arc<Mutex<HashMap<String, f64>>>,
}

impl ThresholdRegistry {
    // ---
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or overwrite) the threshold for `location`.
    pub fn set(&self, location: &str, threshold: f64) {
        // ---
        let mut thresholds = self.thresholds.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = thresholds.insert(location.to_string(), threshold);
        tracing::info!(location, threshold, ?previous, "Alert threshold set");
    }

    pub fn get(&self, location: &str) -> Option<f64> {
        // ---
        let thresholds = self.thresholds.lock().unwrap_or_else(PoisonError::into_inner);
        thresholds.get(location).copied()
    }

    /// Snapshot of every configured threshold, keyed by location.
    pub fn get_all(&self) -> BTreeMap<String, f64> {
        // ---
        let thresholds = self.thresholds.lock().unwrap_or_else(PoisonError::into_inner);
        thresholds
            .iter()
            .map(|(location, threshold)| (location.clone(), *threshold))
            .collect()
    }

    /// Evaluate `reading` against its location's threshold, if one is set.
    pub fn evaluate(&self, reading: &Reading) -> Option<AlertNotification> {
        // ---
        let threshold = self.get(&reading.location)?;
        exceeds(reading, threshold).then(|| AlertNotification {
            location: reading.location.clone(),
            threshold,
            observed_temp: reading.temperature,
        })
    }
}

/// Fire-and-forget destination for triggered alerts.
pub trait AlertSink: Send + Sync {
    fn notify(&self, alert: &AlertNotification);
}

/// Sink that reports alerts as `tracing` warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlertSink;

impl AlertSink for LogAlertSink {
    fn notify(&self, alert: &AlertNotification) {
        // ---
        tracing::warn!(
            location = %alert.location,
            threshold = alert.threshold,
            observed_temp = alert.observed_temp,
            "ALERT: temperature in {} exceeded {}°C",
            alert.location,
            alert.threshold
        );
    }
}
