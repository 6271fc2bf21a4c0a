//! Application entry point for the `esp8266-telemetry` backend service.
//!
//! This binary orchestrates the full startup sequence for the reading
//! ingestion API, including:
//! - Loading configuration from flags, `APP_*` variables and `.env`
//! - Initializing structured logging/tracing
//! - Establishing a PostgreSQL connection pool
//! - Migrating the `readings` table to its current shape
//! - Mounting all API routes via the `routes` gateway
//! - Binding the Axum HTTP server and serving requests until shutdown
//!
//! # Environment Variables
//! - `APP_SECRET_KEY` (**required**) – shared secret for `POST /data`
//! - `APP_HOST`, `APP_PORT`, `APP_DB_*` (optional) – override the CLI flags
//! - `APP_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `APP_LOG_FORMAT` (optional) – `json` for JSON lines
//! - `APP_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! Any startup failure (bad config, unreachable database, failed migration)
//! exits non-zero before the listener is bound.
use std::{env, net::SocketAddr};

use anyhow::{Context, Result};
use clap::Parser;
use dotenvy::dotenv;
use is_terminal::IsTerminal;
use sqlx::postgres::PgPoolOptions;
use tokio::signal;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

mod config;
mod error;
mod metrics;
mod models;
mod routes;
mod schema;
mod state;
mod store;

pub use config::Config;
pub use state::AppState;

// Imported here for routes/*.rs and store.rs so they depend on their parent
// module rather than on models.rs directly.
pub use models::{NewReading, Reading};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    dotenv().ok();
    init_tracing();

    let cli = config::Cli::parse();
    let cfg = config::load(cli)?;
    cfg.log_config();

    tracing::info!("Attempting to connect to database: {}", cfg.masked_db_url());

    let pool = PgPoolOptions::new()
        .max_connections(cfg.db_pool_max)
        .connect_with(cfg.connect_options())
        .await
        .with_context(|| format!("Failed to connect to database '{}'", cfg.masked_db_url()))?;

    tracing::info!("Successfully connected to database");

    schema::run_migrations(&pool)
        .await
        .context("Failed to apply migrations")?;

    let metrics = metrics::Metrics::new().context("Failed to register metrics")?;
    let state = AppState::new(pool.clone(), &cfg, metrics);
    let app = routes::router(state);

    let addr = cfg.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(%addr, "starting server at http://{}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    pool.close().await;
    tracing::info!("Server shutdown complete");
    Ok(())
}

// ---

/// Resolve when the process is asked to stop (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    // ---
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "Ctrl+C handler installation failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler installation failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Output format controlled by `APP_LOG_FORMAT`:
///   - `"json"`: one JSON object per line, including the current span
///     (and so the `request_id`)
///   - unset or other values: compact human-readable lines (default)
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `APP_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by the `APP_LOG_LEVEL` env var
///
/// This should be called once at application startup before any logging
/// or tracing macros are invoked. It installs the subscriber globally
/// for the lifetime of the process.
fn init_tracing() {
    // ---
    let span_events = match env::var("APP_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    // Determine if we should use colors
    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to APP_LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("APP_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn"))
    };

    let builder = tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter);

    match env::var("APP_LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().with_current_span(true).init(),
        _ => builder.with_ansi(use_color).compact().init(),
    }
}
