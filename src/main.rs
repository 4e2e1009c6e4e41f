//! Application entry point for the `codemetal-sensorgen` service.
//!
//! This binary orchestrates the full startup sequence:
//! - Loading `.env` so it can also set the logging variables
//! - Initializing structured logging/tracing
//! - Loading configuration from the environment
//! - Validating the generator configuration before any I/O
//! - Establishing a PostgreSQL connection pool
//! - Creating the database schema if it does not exist
//! - Seeding the fact table with generated readings when it is empty
//! - Mounting all API routes via the `routes` gateway (EMBP pattern)
//! - Binding the Axum HTTP server and serving requests
//!
//! # Environment Variables
//! - `DATABASE_URL` (**required**) – PostgreSQL connection string
//! - `SENSORGEN_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `SENSORGEN_SPAN_EVENTS` (optional) – span event mode for tracing
//! - see `config.rs` for the generator settings
use std::{env, net::SocketAddr};

use dotenvy::dotenv;
use is_terminal::IsTerminal;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use anyhow::Result;

use sensorgen::{config, models, routes, schema, store};
use sensorgen::{Config, GenerationRun, Generator, SeededSource};

// ---

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    // Must precede init_tracing so `.env` can set SENSORGEN_LOG_LEVEL
    dotenv().ok();
    init_tracing();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    // Reject bad customer bands or tuning before touching the database
    let generator = Generator::new(cfg.customers.clone(), cfg.generator.clone())?;

    tracing::info!("Attempting to connect to database: {}", cfg.masked_db_url());

    let pool = PgPoolOptions::new()
        .max_connections(cfg.db_pool_max)
        .connect(&cfg.db_url)
        .await
        .map_err(|e| {
            anyhow::anyhow!(
                "Failed to connect to database '{}': {}",
                cfg.masked_db_url(),
                e
            )
        })?;

    tracing::info!("Successfully connected to database");

    schema::create_schema(&pool).await?;

    seed_readings(&pool, &cfg, &generator).await?;

    // Build app from routes gateway (EMBP)
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.listen_port));
    let app = routes::router(pool);

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ---

/// Populate the fact table unless it already holds a data set.
///
/// The stored data set is left alone once generated; set
/// `REGENERATE_ON_STARTUP` to replace it. The seed used is always recorded
/// in `generation_runs`, so a run can be reproduced with `GENERATOR_SEED`.
async fn seed_readings(pool: &PgPool, cfg: &Config, generator: &Generator) -> Result<()> {
    // ---
    let existing = store::reading_count(pool).await?;
    if existing > 0 && !cfg.regenerate_on_startup {
        tracing::info!(
            "Fact table already holds {} readings, skipping generation",
            existing
        );
        return Ok(());
    }

    let seed = cfg.seed.unwrap_or_else(rand::random::<u64>);
    tracing::info!("Generating readings with seed {}", seed);

    let mut source = SeededSource::from_seed(seed);
    let output = generator.generate(&mut source);

    for s in models::summarize(generator.customers(), &output.readings) {
        tracing::debug!(
            "  {:<14} rows={} avg={:.2} min={:.2} max={:.2} excursions={}",
            s.customer_id,
            s.reading_count,
            s.avg_temperature_celsius,
            s.min_temperature_celsius,
            s.max_temperature_celsius,
            s.excursion_count
        );
    }

    let run = GenerationRun::new(seed, generator.settings(), output.stats);
    store::replace_dataset(pool, generator.customers(), &output, &run).await?;

    Ok(())
}

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `SENSORGEN_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by `RUST_LOG`, falling back to `SENSORGEN_LOG_LEVEL`
///
/// Call once at startup, after `.env` is loaded and before any logging
/// macros are invoked.
fn init_tracing() {
    // ---
    let span_events = match env::var("SENSORGEN_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(default_log_directives())
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

/// Filter directives used when `RUST_LOG` is unset.
fn default_log_directives() -> String {
    // ---
    let level = match env::var("SENSORGEN_LOG_LEVEL").ok().as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") => "warn",
        Some("error") => "error",
        _ => "debug",
    };
    format!("{level},sqlx::query=warn")
}
