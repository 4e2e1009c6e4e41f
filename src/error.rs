//! Error types for the sensor data generator and document tagging.
//!
//! Every variant here is a validation failure detected before any work
//! starts. Nothing is retried: generation is deterministic for a given
//! configuration and seed, so a retry would fail the same way.

use chrono::{DateTime, Utc};

/// Rejected generator configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeneratorError {
    /// No customers to generate readings for
    #[error("customer set is empty")]
    EmptyCustomerSet,

    /// `num_hours` must be at least one and keep the series inside the
    /// representable timestamp range
    #[error("invalid row count: num_hours = {0}")]
    InvalidRowCount(i64),

    /// Normal band is empty, inverted or not finite
    #[error("invalid bounds for customer {customer_id}: min_temp {min_temp} must be below max_temp {max_temp}")]
    InvalidCustomerBounds {
        customer_id: String,
        min_temp: f64,
        max_temp: f64,
    },

    /// Two customers share an id, so `(customer_id, sensor_id, timestamp)`
    /// would no longer identify a single reading
    #[error("duplicate customer id: {0}")]
    DuplicateCustomer(String),

    #[error("excursion probability must be within 0..=1000 per mille, got {0}")]
    InvalidExcursionProbability(u32),

    #[error("invalid excursion magnitude range [{low}, {high}]")]
    InvalidMagnitudeRange { low: i64, high: i64 },

    #[error("sensor count must be within 1..=999, got {0}")]
    InvalidSensorCount(u32),

    #[error("anchor timestamp {0} is not on an exact hour")]
    UnalignedAnchor(DateTime<Utc>),
}

/// Rejected document during customer tagging.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DocumentError {
    #[error("unsupported file type: {0} (expected a .pdf)")]
    UnsupportedFile(String),

    #[error("no customer matches file name {0}")]
    NoMatchingCustomer(String),

    #[error("file name {file_name} matches several customers: {}", .candidates.join(", "))]
    AmbiguousCustomer {
        file_name: String,
        candidates: Vec<String>,
    },
}
