//! HTTP gateway: merges the per-endpoint subrouters and attaches the shared
//! [`WeatherService`] state.

use axum::Router;

use crate::{ReadingSource, ReadingStore, WeatherService};

mod alerts;
mod health;
mod readings;
mod summary;

// ---

pub fn router<S, T>(service: WeatherService<S, T>) -> Router
where
    S: ReadingSource,
    T: ReadingStore,
{
    // ---
    Router::new()
        .merge(readings::router())
        .merge(summary::router())
        .merge(alerts::router())
        .merge(health::router())
        .with_state(service)
}
