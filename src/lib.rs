//! `codemetal-weatherflow`: weather sampling, aggregation and alerting.
//!
//! A background [`Scheduler`] samples every monitored location at a fixed
//! cadence, appends the readings to a [`ReadingStore`] and evaluates them
//! against the [`ThresholdRegistry`]. The [`WeatherService`] answers
//! queries (daily summary, historical trend, alert configuration) over the
//! same components, and the `routes` gateway exposes it over HTTP.
//!
//! Modules follow the Explicit Module Boundary Pattern (EMBP): siblings
//! import each other only through the re-exports below, never by reaching
//! into another module's internals.

pub mod aggregate;
pub mod alerts;
pub mod charts;
pub mod config;
mod error;
mod models;
pub mod routes;
mod scheduler;
pub mod schema;
mod service;
mod source;
mod store;

pub use alerts::{AlertSink, LogAlertSink, ThresholdRegistry};
pub use config::Config;
pub use error::{AppError, FetchError, RenderError, StoreError};
pub use models::{AlertNotification, RawObservation, Reading, Summary};
pub use scheduler::{SampleFailure, Scheduler, SchedulerState, TickReport};
pub use service::{AlertCheck, DailySummary, HistoricalTrend, WeatherService};
pub use source::{OpenWeatherSource, ReadingSource};
pub use store::{MemoryReadingStore, PgReadingStore, RangeOrder, ReadingStore};
