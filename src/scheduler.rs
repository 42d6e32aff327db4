//! Sampling Scheduler: the long-lived loop that samples every monitored
//! location once per tick, persists the readings and evaluates alerts.
//!
//! The loop is an explicit state machine:
//!
//! ```text
//! Idle ──► FetchingLocation(0) ──► … ──► FetchingLocation(n) ──► Sleeping ──► Idle
//!   │              │                                                │
//!   └──────────────┴───────────── cancel ───────────────────────────┴──► Cancelled
//! ```
//!
//! Per-location failures (fetch, timeout, persistence) are reported and the
//! tick moves on to the next location. Cancellation is observed at tick
//! start, between locations and during the sleep; an in-flight fetch is
//! never abandoned half way, but it is bounded by the fetch timeout.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::{AlertSink, FetchError, ReadingSource, ReadingStore, StoreError, ThresholdRegistry};

// ---

/// Where the scheduler loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    // ---
    Idle,
    /// Working on the location at this index of the configured list.
    FetchingLocation(usize),
    Sleeping,
    Cancelled,
}

/// Why a location produced no stored reading this tick.
#[derive(Debug, thiserror::Error)]
pub enum SampleFailure {
    // ---
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("persist failed: {0}")]
    Persist(#[from] StoreError),
}

/// Outcome of one tick over all locations.
#[derive(Debug, Default)]
pub struct TickReport {
    // ---
    pub recorded: usize,
    pub alerts: usize,
    pub failures: Vec<(String, SampleFailure)>,
}

/// Periodic sampler over a fixed, ordered set of locations.
pub struct Scheduler<S, T> {
    // ---
    source: Arc<S>,
    store: Arc<T>,
    alerts: ThresholdRegistry,
    sink: Arc<dyn AlertSink>,
    locations: Arc<[String]>,
    period: Duration,
    fetch_timeout: Duration,
}

impl<S: ReadingSource, T: ReadingStore> Scheduler<S, T> {
    // ---
    pub fn new(
        source: Arc<S>,
        store: Arc<T>,
        alerts: ThresholdRegistry,
        sink: Arc<dyn AlertSink>,
        locations: Arc<[String]>,
    ) -> Self {
        // ---
        Self {
            source,
            store,
            alerts,
            sink,
            locations,
            period: Duration::from_secs(crate::config::DEFAULT_SAMPLE_INTERVAL_SECS),
            fetch_timeout: Duration::from_secs(crate::config::DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }

    /// Time to sleep between ticks.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Upper bound on a single location's fetch.
    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    /// Run the sampling loop until `cancel` fires.
    ///
    /// Never returns an error: every per-location failure is contained
    /// inside the tick.
    pub async fn run(self, cancel: CancellationToken) {
        // ---
        tracing::info!(
            locations = self.locations.len(),
            period_secs = self.period.as_secs(),
            fetch_timeout_secs = self.fetch_timeout.as_secs(),
            "Sampling scheduler started"
        );

        let mut state = SchedulerState::Idle;
        let mut report = TickReport::default();
        let mut tick: u64 = 0;

        loop {
            let next = match state {
                SchedulerState::Idle => {
                    if cancel.is_cancelled() {
                        SchedulerState::Cancelled
                    } else {
                        tick += 1;
                        SchedulerState::FetchingLocation(0)
                    }
                }
                SchedulerState::FetchingLocation(i) if i < self.locations.len() => {
                    if cancel.is_cancelled() {
                        let skipped = &self.locations[i..];
                        tracing::warn!(
                            tick,
                            ?skipped,
                            "Shutdown requested mid-tick, remaining locations not sampled"
                        );
                        SchedulerState::Cancelled
                    } else {
                        self.sample_into(&self.locations[i], &mut report).await;
                        SchedulerState::FetchingLocation(i + 1)
                    }
                }
                SchedulerState::FetchingLocation(_) => {
                    let done = std::mem::take(&mut report);
                    tracing::info!(
                        tick,
                        recorded = done.recorded,
                        alerts = done.alerts,
                        failed = done.failures.len(),
                        "Tick complete"
                    );
                    SchedulerState::Sleeping
                }
                SchedulerState::Sleeping => {
                    tokio::select! {
                        _ = cancel.cancelled() => SchedulerState::Cancelled,
                        _ = tokio::time::sleep(self.period) => SchedulerState::Idle,
                    }
                }
                SchedulerState::Cancelled => break,
            };

            tracing::trace!(from = ?state, to = ?next, "Scheduler transition");
            state = next;
        }

        tracing::info!(ticks = tick, "Sampling scheduler stopped");
    }

    /// Sample every location once and report what happened.
    pub async fn run_tick(&self) -> TickReport {
        // ---
        let mut report = TickReport::default();
        for location in self.locations.iter() {
            self.sample_into(location, &mut report).await;
        }
        report
    }

    /// Sample one location and fold the outcome into `report`.
    async fn sample_into(&self, location: &str, report: &mut TickReport) {
        // ---
        match self.sample(location).await {
            Ok(alerted) => {
                report.recorded += 1;
                report.alerts += usize::from(alerted);
            }
            Err(failure) => {
                tracing::error!(location, error = %failure, "Sampling failed");
                report.failures.push((location.to_string(), failure));
            }
        }
    }

    /// Fetch, persist and evaluate one location. Returns whether an alert
    /// was raised.
    async fn sample(&self, location: &str) -> Result<bool, SampleFailure> {
        // ---
        let reading = tokio::time::timeout(self.fetch_timeout, self.source.fetch(location))
            .await
            .map_err(|_| FetchError::Timeout(self.fetch_timeout.as_secs()))??;

        self.store.append(&reading).await?;

        tracing::debug!(
            location,
            temperature = reading.temperature,
            observed_at = reading.observed_at,
            "Reading recorded"
        );

        match self.alerts.evaluate(&reading) {
            Some(alert) => {
                self.sink.notify(&alert);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::{AlertNotification, MemoryReadingStore, Reading};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    const DOWN: &str = "Atlantis";

    /// Returns a fixed temperature per location; fails for [`DOWN`].
    #[derive(Default)]
    struct StubSource {
        calls: AtomicUsize,
    }

    impl ReadingSource for StubSource {
        async fn fetch(&self, location: &str) -> Result<Reading, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) as i64;
            if location == DOWN {
                return Err(FetchError::Status(503));
            }
            Ok(Reading {
                location: location.to_string(),
                temperature: if location == "Delhi" { 30.0 } else { 20.0 },
                feels_like: 20.0,
                condition: "Clear".to_string(),
                observed_at: 1_000 + n,
            })
        }
    }

    /// Never answers for "Slow", immediately for everything else.
    struct HangingSource;

    impl ReadingSource for HangingSource {
        async fn fetch(&self, location: &str) -> Result<Reading, FetchError> {
            if location == "Slow" {
                std::future::pending::<()>().await;
            }
            Ok(Reading {
                location: location.to_string(),
                temperature: 15.0,
                feels_like: 15.0,
                condition: "Mist".to_string(),
                observed_at: 1_000,
            })
        }
    }

    /// Answers every location after a fixed delay.
    struct SlowSource(Duration);

    impl ReadingSource for SlowSource {
        async fn fetch(&self, location: &str) -> Result<Reading, FetchError> {
            tokio::time::sleep(self.0).await;
            Ok(Reading {
                location: location.to_string(),
                temperature: 18.0,
                feels_like: 18.0,
                condition: "Rain".to_string(),
                observed_at: 1_000,
            })
        }
    }

    /// Rejects every write.
    struct BrokenStore;

    impl ReadingStore for BrokenStore {
        async fn append(&self, _reading: &Reading) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("disk full".into()))
        }

        async fn range(
            &self,
            _location: &str,
            _min_timestamp: i64,
            _order: crate::RangeOrder,
        ) -> Result<Vec<Reading>, StoreError> {
            Ok(Vec::new())
        }

        async fn latest(&self, _location: &str) -> Result<Option<Reading>, StoreError> {
            Ok(None)
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        alerts: Mutex<Vec<AlertNotification>>,
    }

    impl AlertSink for RecordingSink {
        fn notify(&self, alert: &AlertNotification) {
            self.alerts.lock().unwrap().push(alert.clone());
        }
    }

    fn locations(names: &[&str]) -> Arc<[String]> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_failing_location_does_not_abort_tick() {
        // ---
        let store = Arc::new(MemoryReadingStore::new());
        let scheduler = Scheduler::new(
            Arc::new(StubSource::default()),
            store.clone(),
            ThresholdRegistry::new(),
            Arc::new(RecordingSink::default()),
            locations(&["Delhi", DOWN, "Mumbai"]),
        );

        for _ in 0..3 {
            let report = scheduler.run_tick().await;
            assert_eq!(report.recorded, 2);
            assert_eq!(report.failures.len(), 1);
            assert_eq!(report.failures[0].0, DOWN);
            assert!(matches!(report.failures[0].1, SampleFailure::Fetch(_)));
        }

        assert_eq!(store.count("Delhi"), 3);
        assert_eq!(store.count("Mumbai"), 3);
        assert_eq!(store.count(DOWN), 0);
    }

    #[tokio::test]
    async fn test_alerts_fire_every_tick() {
        // ---
        let registry = ThresholdRegistry::new();
        registry.set("Delhi", 25.0);
        registry.set("Mumbai", 20.0); // equal, must not fire
        let sink = Arc::new(RecordingSink::default());

        let scheduler = Scheduler::new(
            Arc::new(StubSource::default()),
            Arc::new(MemoryReadingStore::new()),
            registry,
            sink.clone(),
            locations(&["Delhi", "Mumbai"]),
        );

        scheduler.run_tick().await;
        let report = scheduler.run_tick().await;
        assert_eq!(report.alerts, 1);

        let alerts = sink.alerts.lock().unwrap();
        assert_eq!(alerts.len(), 2, "no deduplication across ticks");
        assert!(alerts.iter().all(|a| a.location == "Delhi"));
        assert_eq!(alerts[0].observed_temp, 30.0);
        assert_eq!(alerts[0].threshold, 25.0);
    }

    #[tokio::test]
    async fn test_persistence_failure_is_contained() {
        // ---
        let sink = Arc::new(RecordingSink::default());
        let registry = ThresholdRegistry::new();
        registry.set("Delhi", 0.0);

        let scheduler = Scheduler::new(
            Arc::new(StubSource::default()),
            Arc::new(BrokenStore),
            registry,
            sink.clone(),
            locations(&["Delhi", "Mumbai"]),
        );

        let report = scheduler.run_tick().await;
        assert_eq!(report.recorded, 0);
        assert_eq!(report.failures.len(), 2);
        assert!(matches!(report.failures[1].1, SampleFailure::Persist(_)));
        // Unpersisted readings are not evaluated
        assert!(sink.alerts.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_fetch_times_out() {
        // ---
        let store = Arc::new(MemoryReadingStore::new());
        let scheduler = Scheduler::new(
            Arc::new(HangingSource),
            store.clone(),
            ThresholdRegistry::new(),
            Arc::new(RecordingSink::default()),
            locations(&["Slow", "Fast"]),
        )
        .with_fetch_timeout(Duration::from_secs(5));

        let report = scheduler.run_tick().await;
        assert_eq!(report.recorded, 1);
        assert!(matches!(
            report.failures[0].1,
            SampleFailure::Fetch(FetchError::Timeout(5))
        ));
        assert_eq!(store.count("Fast"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_survives_failures_across_ticks() {
        // ---
        let store = Arc::new(MemoryReadingStore::new());
        let scheduler = Scheduler::new(
            Arc::new(StubSource::default()),
            store.clone(),
            ThresholdRegistry::new(),
            Arc::new(RecordingSink::default()),
            locations(&["Delhi", DOWN, "Mumbai"]),
        )
        .with_period(Duration::from_secs(300));

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(cancel.clone()));

        // Ticks at t = 0, 300, 600 and 900
        tokio::time::sleep(Duration::from_secs(950)).await;
        assert!(!handle.is_finished(), "loop must still be alive");

        cancel.cancel();
        handle.await.unwrap();

        let delhi = store.count("Delhi");
        assert_eq!(delhi, 4);
        assert_eq!(store.count("Mumbai"), delhi);
        assert_eq!(store.count(DOWN), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_sleep() {
        // ---
        let store = Arc::new(MemoryReadingStore::new());
        let scheduler = Scheduler::new(
            Arc::new(StubSource::default()),
            store.clone(),
            ThresholdRegistry::new(),
            Arc::new(RecordingSink::default()),
            locations(&["Delhi", "Mumbai"]),
        )
        .with_period(Duration::from_secs(300));

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(cancel.clone()));

        // Let the first tick finish; the loop is now asleep
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(store.count("Delhi"), 1);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler did not stop promptly")
            .unwrap();

        // No further ticks after shutdown
        tokio::time::sleep(Duration::from_secs(1_000)).await;
        assert_eq!(store.count("Delhi"), 1);
        assert_eq!(store.count("Mumbai"), 1);
    }

    #[test]
    fn test_sample_failure_wraps_source_error() {
        // ---
        let failure = SampleFailure::from(FetchError::Status(503));
        assert_eq!(
            failure.to_string(),
            "fetch failed: weather provider returned HTTP 503"
        );

        let failure: Box<dyn std::error::Error> =
            Box::new(SampleFailure::from(StoreError::Unavailable("disk full".into())));
        assert_eq!(failure.to_string(), "persist failed: store unavailable: disk full");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_mid_tick_finishes_current_location_only() {
        // ---
        let store = Arc::new(MemoryReadingStore::new());
        let scheduler = Scheduler::new(
            Arc::new(SlowSource(Duration::from_secs(2))),
            store.clone(),
            ThresholdRegistry::new(),
            Arc::new(RecordingSink::default()),
            locations(&["A", "B", "C"]),
        );

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(scheduler.run(cancel.clone()));

        // A completes at t=2; B is in flight at t=3 and completes at t=4
        tokio::time::sleep(Duration::from_secs(3)).await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler did not stop after the in-flight location")
            .unwrap();

        assert_eq!(store.count("A"), 1);
        assert_eq!(store.count("B"), 1);
        assert_eq!(store.count("C"), 0);
    }

    #[tokio::test]
    async fn test_cancel_before_start_runs_no_tick() {
        // ---
        let store = Arc::new(MemoryReadingStore::new());
        let scheduler = Scheduler::new(
            Arc::new(StubSource::default()),
            store.clone(),
            ThresholdRegistry::new(),
            Arc::new(RecordingSink::default()),
            locations(&["Delhi"]),
        );

        let cancel = CancellationToken::new();
        cancel.cancel();
        scheduler.run(cancel).await;

        assert_eq!(store.count("Delhi"), 0);
    }
}
