//! Synthetic sensor readings for the anomaly analytics demo.
//!
//! The `generator` module is the core: it produces hourly temperature
//! readings per customer with rare injected excursions. The remaining
//! modules persist the data set, roll it up per customer, tag parsed
//! documents to customers and serve everything over HTTP.
//!
//! Modules talk to each other through the re-exports below (EMBP), so a
//! route only needs `crate::{Reading, TemperatureSummary, ...}`.

pub mod config;
pub mod documents;
pub mod error;
pub mod generator;
pub mod models;
pub mod routes;
pub mod schema;
pub mod store;

pub use config::Config;
pub use documents::{ParsedDocument, TaggedDocument};
pub use error::{DocumentError, GeneratorError};
pub use generator::{
    GenerationOutput, GenerationStats, Generator, GeneratorSettings, SeededSource, UniformSource,
};
pub use models::{Customer, Reading, TemperatureSummary};
pub use store::GenerationRun;
