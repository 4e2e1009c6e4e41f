//! Configuration loader for the `codemetal-sensorgen` service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller). Generator tuning lives here too, so the customer
//! list and generation parameters are fixed once at startup.
//!
use std::{env, fs};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};

use crate::generator::{
    default_anchor, GeneratorSettings, DEFAULT_EXCURSION_MAGNITUDE, DEFAULT_EXCURSION_PER_MILLE,
    DEFAULT_NUM_HOURS, DEFAULT_SENSOR_COUNT,
};
use crate::models::Customer;

/// Parse an optional numeric environment variable with a default value.
macro_rules! parse_env_num {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .map_err(|_| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// HTTP listen port.
    pub listen_port: u16,

    /// Monitored facilities to generate readings for.
    pub customers: Vec<Customer>,

    /// Where `customers` came from, for logging.
    pub customers_source: String,

    /// Generation parameters.
    pub generator: GeneratorSettings,

    /// Fixed seed; a fresh one is drawn per run when unset.
    pub seed: Option<u64>,

    /// Replace an already populated fact table on startup.
    pub regenerate_on_startup: bool,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string
///
/// Optional:
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `LISTEN_PORT` – HTTP port (default: 8080)
/// - `CUSTOMERS_FILE` – JSON array of customers (default: demo fleet)
/// - `GENERATOR_NUM_HOURS` – hourly readings per customer (default: 7704)
/// - `GENERATOR_ANCHOR` – first timestamp (default: 2025-01-01T00:00:00Z)
/// - `GENERATOR_SEED` – u64 seed (default: random per run)
/// - `EXCURSION_PER_MILLE` – excursion chance in 1000 (default: 15)
/// - `EXCURSION_MAGNITUDE_MIN` / `EXCURSION_MAGNITUDE_MAX` (default: 8 / 12)
/// - `SENSOR_COUNT` – sensors per customer (default: 5)
/// - `REGENERATE_ON_STARTUP` – replace existing readings (default: false)
///
/// Returns an error if any required variable is missing or invalid. Range
/// checks on the generator values happen in `Generator::new`.
pub fn load_from_env() -> Result<Config> {
    // ---
    let db_url = require_env!("DATABASE_URL");
    let db_pool_max = parse_env_num!("DB_POOL_MAX", u32, 5);
    let listen_port = parse_env_num!("LISTEN_PORT", u16, 8080);

    let (customers, customers_source) = match env::var("CUSTOMERS_FILE") {
        Ok(path) => {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read CUSTOMERS_FILE '{path}'"))?;
            let customers = parse_customers(&raw)
                .with_context(|| format!("Invalid CUSTOMERS_FILE '{path}'"))?;
            (customers, path)
        }
        Err(_) => (Customer::demo_fleet(), "built-in demo fleet".to_string()),
    };

    let anchor_timestamp = match env::var("GENERATOR_ANCHOR") {
        Ok(raw) => parse_anchor(&raw)?,
        Err(_) => default_anchor(),
    };

    let generator = GeneratorSettings {
        num_hours: parse_env_num!("GENERATOR_NUM_HOURS", i64, DEFAULT_NUM_HOURS),
        anchor_timestamp,
        excursion_probability_per_mille: parse_env_num!(
            "EXCURSION_PER_MILLE",
            u32,
            DEFAULT_EXCURSION_PER_MILLE
        ),
        excursion_magnitude_range: [
            parse_env_num!("EXCURSION_MAGNITUDE_MIN", i64, DEFAULT_EXCURSION_MAGNITUDE[0]),
            parse_env_num!("EXCURSION_MAGNITUDE_MAX", i64, DEFAULT_EXCURSION_MAGNITUDE[1]),
        ],
        sensor_count: parse_env_num!("SENSOR_COUNT", u32, DEFAULT_SENSOR_COUNT),
    };

    let seed = env::var("GENERATOR_SEED")
        .ok()
        .map(|v| v.trim().parse::<u64>())
        .transpose()
        .map_err(|e| anyhow!("Invalid GENERATOR_SEED: {}", e))?;

    let regenerate_on_startup = match env::var("REGENERATE_ON_STARTUP") {
        Ok(raw) => parse_flag(&raw)
            .ok_or_else(|| anyhow!("Invalid REGENERATE_ON_STARTUP: {}", raw))?,
        Err(_) => false,
    };

    Ok(Config {
        db_url,
        db_pool_max,
        listen_port,
        customers,
        customers_source,
        generator,
        seed,
        regenerate_on_startup,
    })
}

/// Parse a JSON array of `{customer_id, customer_name, min_temp, max_temp}`.
pub fn parse_customers(raw: &str) -> Result<Vec<Customer>> {
    // ---
    let customers: Vec<Customer> = serde_json::from_str(raw)?;
    Ok(customers)
}

/// Accept RFC 3339, or a naive `YYYY-MM-DDTHH:MM:SS` taken as UTC.
pub fn parse_anchor(raw: &str) -> Result<DateTime<Utc>> {
    // ---
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| anyhow!("Invalid GENERATOR_ANCHOR '{}': {}", raw, e))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks sensitive information like database passwords while showing
    /// all configuration values that were loaded.
    pub fn log_config(&self) {
        // ---
        let g = &self.generator;
        let seed = self
            .seed
            .map_or_else(|| "random per run".to_string(), |s| s.to_string());

        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL          : {}", self.masked_db_url());
        tracing::info!("  DB_POOL_MAX           : {}", self.db_pool_max);
        tracing::info!("  LISTEN_PORT           : {}", self.listen_port);
        tracing::info!(
            "  CUSTOMERS             : {} ({})",
            self.customers.len(),
            self.customers_source
        );
        tracing::info!("  GENERATOR_NUM_HOURS   : {}", g.num_hours);
        tracing::info!("  GENERATOR_ANCHOR      : {}", g.anchor_timestamp);
        tracing::info!("  GENERATOR_SEED        : {}", seed);
        tracing::info!(
            "  EXCURSION_PER_MILLE   : {}",
            g.excursion_probability_per_mille
        );
        tracing::info!(
            "  EXCURSION_MAGNITUDE   : [{}, {}]",
            g.excursion_magnitude_range[0],
            g.excursion_magnitude_range[1]
        );
        tracing::info!("  SENSOR_COUNT          : {}", g.sensor_count);
        tracing::info!("  REGENERATE_ON_STARTUP : {}", self.regenerate_on_startup);
    }

    /// Database URL with the password replaced by `****`.
    pub fn masked_db_url(&self) -> String {
        // ---
        if let Some(at_pos) = self.db_url.rfind('@') {
            if let Some(colon_pos) = self.db_url[..at_pos].rfind(':') {
                // `postgres://host@...` has its only colon in the scheme
                if !self.db_url[colon_pos..].starts_with("://") {
                    return format!(
                        "{}:****{}",
                        &self.db_url[..colon_pos],
                        &self.db_url[at_pos..]
                    );
                }
            }
        }
        self.db_url.clone()
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    fn config_with_url(db_url: &str) -> Config {
        Config {
            db_url: db_url.to_string(),
            db_pool_max: 5,
            listen_port: 8080,
            customers: Customer::demo_fleet(),
            customers_source: "test".to_string(),
            generator: GeneratorSettings::default(),
            seed: None,
            regenerate_on_startup: false,
        }
    }

    #[test]
    fn test_masks_password() {
        // ---
        let cfg = config_with_url("postgres://sensor:hunter2@db:5432/sensorgen");
        assert_eq!(cfg.masked_db_url(), "postgres://sensor:****@db:5432/sensorgen");
    }

    #[test]
    fn test_leaves_passwordless_url_alone() {
        // ---
        let cfg = config_with_url("postgres://sensor@db/sensorgen");
        assert_eq!(cfg.masked_db_url(), "postgres://sensor@db/sensorgen");

        let cfg = config_with_url("postgres://localhost/sensorgen");
        assert_eq!(cfg.masked_db_url(), "postgres://localhost/sensorgen");
    }

    #[test]
    fn test_parse_anchor_formats() {
        // ---
        let expected = default_anchor();
        assert_eq!(parse_anchor("2025-01-01T00:00:00Z").unwrap(), expected);
        assert_eq!(parse_anchor("2025-01-01T00:00:00").unwrap(), expected);
        assert_eq!(parse_anchor("2025-01-01T02:00:00+02:00").unwrap(), expected);
        assert!(parse_anchor("first of january").is_err());
    }

    #[test]
    fn test_parse_customers() {
        // ---
        let raw = r#"[
            {"customer_id": "CUST-DC-8472", "customer_name": "Northgate Data Center",
             "min_temp": 18.0, "max_temp": 21.0}
        ]"#;
        let customers = parse_customers(raw).unwrap();
        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].customer_id, "CUST-DC-8472");
        assert_eq!(customers[0].max_temp, 21.0);

        assert!(parse_customers(r#"[{"customer_id": "X"}]"#).is_err());
    }

    #[test]
    fn test_parse_flag() {
        // ---
        assert_eq!(parse_flag("TRUE"), Some(true));
        assert_eq!(parse_flag(" no "), Some(false));
        assert_eq!(parse_flag("maybe"), None);
    }
}
