//! Application entry point for the `codemetal-weatherflow` service.
//!
//! This binary orchestrates the full startup sequence, including:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Selecting the time-series store (PostgreSQL, or in-memory when no
//!   `DATABASE_URL` is configured) and creating the schema if needed
//! - Spawning the sampling scheduler as a background task
//! - Mounting all API routes via the `routes` gateway (EMBP pattern)
//! - Serving HTTP until Ctrl-C, then stopping the scheduler cleanly
//!
//! # Environment Variables
//! - `OPENWEATHER_API_KEY` (**required**) – weather provider API key
//! - `DATABASE_URL` (optional) – PostgreSQL connection string
//! - `MONITORED_LOCATIONS`, `SAMPLE_INTERVAL_SECS`, `FETCH_TIMEOUT_SECS`,
//!   `HTTP_PORT`, `DB_POOL_MAX` (optional) – see `config`
//! - `AXUM_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `AXUM_SPAN_EVENTS` (optional) – span event mode for tracing
use std::{env, io::IsTerminal, net::SocketAddr, sync::Arc};

use anyhow::Result;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use codemetal_weatherflow::{
    config, routes, schema, Config, LogAlertSink, MemoryReadingStore, OpenWeatherSource,
    PgReadingStore, ReadingStore, WeatherService,
};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    init_tracing();
    dotenv().ok();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    let source = OpenWeatherSource::new(&cfg.api_url, &cfg.api_key, cfg.fetch_timeout)?;

    match cfg.db_url.clone() {
        Some(db_url) => {
            tracing::info!("Attempting to connect to database");

            let pool = PgPoolOptions::new()
                .max_connections(cfg.db_pool_max)
                .connect(&db_url)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;

            tracing::info!("Successfully connected to database");
            schema::create_schema(&pool).await?;

            serve(cfg, source, PgReadingStore::new(pool)).await
        }
        None => {
            tracing::warn!("DATABASE_URL not set, readings will not survive a restart");
            serve(cfg, source, MemoryReadingStore::new()).await
        }
    }
}

/// Run the scheduler and the HTTP server over `store` until shutdown.
async fn serve<T: ReadingStore>(cfg: Config, source: OpenWeatherSource, store: T) -> Result<()> {
    // ---
    let service = WeatherService::new(source, store, cfg.locations.clone());

    let cancel = CancellationToken::new();
    let scheduler = service
        .scheduler(Arc::new(LogAlertSink))
        .with_period(cfg.sample_interval)
        .with_fetch_timeout(cfg.fetch_timeout);
    let scheduler_task = tokio::spawn(scheduler.run(cancel.clone()));

    // Build app from routes gateway (EMBP)
    let app = routes::router(service);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.http_port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let shutdown = cancel.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown requested");
            shutdown.cancel();
        })
        .await?;

    // The server may also stop on its own; make sure the scheduler follows.
    cancel.cancel();
    scheduler_task.await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `AXUM_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by the `AXUM_LOG_LEVEL` env var
///
/// This should be called once at application startup before any logging
/// or tracing macros are invoked.
fn init_tracing() {
    // ---
    let span_events = match env::var("AXUM_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to AXUM_LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("AXUM_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn,hyper=info,reqwest=info"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
