//! Synthetic sensor reading generator.
//!
//! Produces one reading per `(customer, hour)` pair for a fixed list of
//! customers, starting at an anchor timestamp. Each row independently either
//! lands uniformly inside the customer's normal band or, with a configured
//! per-mille probability, becomes an excursion pushed above the band:
//!
//! - excursion: `midpoint(min_temp, max_temp) + magnitude`
//! - normal:    `min_temp + variation * (max_temp - min_temp) / 1000`
//!
//! Random draws are made through [`UniformSource`], in a fixed order per row
//! (spike check, magnitude or variation, sensor number), so a seeded source
//! reproduces the same data set exactly.

use std::collections::HashSet;

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::GeneratorError;
use crate::models::{sensor_label, Customer, Reading};

// ---

pub const DEFAULT_NUM_HOURS: i64 = 7704;
pub const DEFAULT_EXCURSION_PER_MILLE: u32 = 15;
pub const DEFAULT_EXCURSION_MAGNITUDE: [i64; 2] = [8, 12];
pub const DEFAULT_SENSOR_COUNT: u32 = 5;

const PER_MILLE: i64 = 1000;
/// Upper bound on the up-front allocation in `generate`; larger data sets
/// grow the vector as rows arrive.
const MAX_PREALLOCATED_ROWS: u64 = 1 << 20;
const MAX_SENSOR_COUNT: u32 = 999;

/// Source of uniformly distributed integers.
pub trait UniformSource {
    /// Draw from `[low, high]`, both ends inclusive.
    fn uniform(&mut self, low: i64, high: i64) -> i64;
}

/// [`UniformSource`] backed by a seedable [`StdRng`].
#[derive(Debug, Clone)]
pub struct SeededSource {
    rng: StdRng,
}

impl SeededSource {
    // ---
    pub fn from_seed(seed: u64) -> Self {
        SeededSource {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        SeededSource {
            rng: StdRng::from_entropy(),
        }
    }
}

impl UniformSource for SeededSource {
    fn uniform(&mut self, low: i64, high: i64) -> i64 {
        self.rng.gen_range(low..=high)
    }
}

/// Tunable generation parameters. Customers are passed separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorSettings {
    // ---
    /// Number of hourly timestamps per customer.
    pub num_hours: i64,

    /// First timestamp of the series; must sit on an exact hour.
    pub anchor_timestamp: DateTime<Utc>,

    /// Chance in 1000 that a row is an excursion.
    pub excursion_probability_per_mille: u32,

    /// Inclusive `[low, high]` offset in °C added to the band midpoint.
    pub excursion_magnitude_range: [i64; 2],

    /// Sensors per customer; each row picks one uniformly.
    pub sensor_count: u32,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        GeneratorSettings {
            num_hours: DEFAULT_NUM_HOURS,
            anchor_timestamp: default_anchor(),
            excursion_probability_per_mille: DEFAULT_EXCURSION_PER_MILLE,
            excursion_magnitude_range: DEFAULT_EXCURSION_MAGNITUDE,
            sensor_count: DEFAULT_SENSOR_COUNT,
        }
    }
}

/// `2025-01-01T00:00:00Z`
pub fn default_anchor() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

/// Counters collected while generating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GenerationStats {
    pub rows: u64,
    pub excursions: u64,
}

/// A fully generated data set.
#[derive(Debug, Clone)]
pub struct GenerationOutput {
    pub readings: Vec<Reading>,
    pub stats: GenerationStats,
}

/// Validated generator, ready to produce readings.
#[derive(Debug, Clone)]
pub struct Generator {
    customers: Vec<Customer>,
    settings: GeneratorSettings,
}

impl Generator {
    /// Validate the configuration. Nothing is generated if this fails.
    ///
    /// Customers are reordered by `customer_id` so output follows
    /// `(customer_id, reading_timestamp)` order.
    pub fn new(
        customers: Vec<Customer>,
        settings: GeneratorSettings,
    ) -> Result<Self, GeneratorError> {
        // ---
        if customers.is_empty() {
            return Err(GeneratorError::EmptyCustomerSet);
        }
        if settings.num_hours <= 0 {
            return Err(GeneratorError::InvalidRowCount(settings.num_hours));
        }
        // Last timestamp must be representable
        Duration::try_hours(settings.num_hours - 1)
            .and_then(|span| settings.anchor_timestamp.checked_add_signed(span))
            .ok_or(GeneratorError::InvalidRowCount(settings.num_hours))?;

        let anchor = settings.anchor_timestamp;
        if anchor.minute() != 0 || anchor.second() != 0 || anchor.nanosecond() != 0 {
            return Err(GeneratorError::UnalignedAnchor(anchor));
        }

        let mut seen = HashSet::new();
        for c in &customers {
            let finite = c.min_temp.is_finite() && c.max_temp.is_finite();
            if !finite || c.min_temp >= c.max_temp {
                return Err(GeneratorError::InvalidCustomerBounds {
                    customer_id: c.customer_id.clone(),
                    min_temp: c.min_temp,
                    max_temp: c.max_temp,
                });
            }
            if !seen.insert(c.customer_id.as_str()) {
                return Err(GeneratorError::DuplicateCustomer(c.customer_id.clone()));
            }
        }

        if i64::from(settings.excursion_probability_per_mille) > PER_MILLE {
            return Err(GeneratorError::InvalidExcursionProbability(
                settings.excursion_probability_per_mille,
            ));
        }

        let [low, high] = settings.excursion_magnitude_range;
        if low < 0 || low > high {
            return Err(GeneratorError::InvalidMagnitudeRange { low, high });
        }

        if settings.sensor_count == 0 || settings.sensor_count > MAX_SENSOR_COUNT {
            return Err(GeneratorError::InvalidSensorCount(settings.sensor_count));
        }

        let mut customers = customers;
        customers.sort_by(|a, b| a.customer_id.cmp(&b.customer_id));

        Ok(Generator {
            customers,
            settings,
        })
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    /// `len(customers) * num_hours`
    pub fn expected_rows(&self) -> u64 {
        self.customers.len() as u64 * self.settings.num_hours as u64
    }

    /// Lazily produce readings, drawing from `source` as rows are pulled.
    pub fn stream<'a, S: UniformSource>(&'a self, source: &'a mut S) -> ReadingStream<'a, S> {
        ReadingStream {
            generator: self,
            source,
            customer_idx: 0,
            hour: 0,
            stats: GenerationStats::default(),
        }
    }

    /// Generate the full data set.
    pub fn generate<S: UniformSource>(&self, source: &mut S) -> GenerationOutput {
        // ---
        tracing::info!(
            customers = self.customers.len(),
            num_hours = self.settings.num_hours,
            anchor = %self.settings.anchor_timestamp,
            "Generating sensor readings"
        );

        let mut stream = self.stream(source);
        let mut readings = Vec::with_capacity(initial_capacity(self.expected_rows()));
        readings.extend(&mut stream);
        let stats = stream.stats();

        tracing::info!(
            rows = stats.rows,
            excursions = stats.excursions,
            "Generated sensor readings"
        );
        GenerationOutput { readings, stats }
    }

    fn reading<S: UniformSource>(
        &self,
        customer: &Customer,
        hour: i64,
        source: &mut S,
    ) -> Reading {
        // ---
        let s = &self.settings;

        let spike_check = source.uniform(1, PER_MILLE);
        let excursion = spike_check <= i64::from(s.excursion_probability_per_mille);

        let temperature_celsius = if excursion {
            let [low, high] = s.excursion_magnitude_range;
            let magnitude = source.uniform(low, high);
            customer.midpoint() + magnitude as f64
        } else {
            let variation = source.uniform(0, PER_MILLE);
            customer.min_temp
                + variation as f64 * (customer.max_temp - customer.min_temp) / PER_MILLE as f64
        };

        let sensor_num = source.uniform(1, i64::from(s.sensor_count));

        Reading {
            customer_id: customer.customer_id.clone(),
            customer_name: customer.customer_name.clone(),
            reading_timestamp: s.anchor_timestamp + Duration::hours(hour),
            temperature_celsius,
            sensor_id: sensor_label(&customer.customer_id, sensor_num as u32),
            is_excursion: excursion,
        }
    }
}

fn initial_capacity(expected_rows: u64) -> usize {
    usize::try_from(expected_rows.min(MAX_PREALLOCATED_ROWS)).unwrap_or(0)
}

/// Iterator over generated readings, customer by customer.
pub struct ReadingStream<'a, S> {
    generator: &'a Generator,
    source: &'a mut S,
    customer_idx: usize,
    hour: i64,
    stats: GenerationStats,
}

impl<S> ReadingStream<'_, S> {
    /// Counts for the rows produced so far.
    pub fn stats(&self) -> GenerationStats {
        self.stats
    }
}

impl<S: UniformSource> Iterator for ReadingStream<'_, S> {
    type Item = Reading;

    fn next(&mut self) -> Option<Reading> {
        // ---
        let generator = self.generator;
        if self.hour >= generator.settings.num_hours {
            self.customer_idx += 1;
            self.hour = 0;
        }
        let customer = generator.customers.get(self.customer_idx)?;

        let reading = generator.reading(customer, self.hour, self.source);
        self.hour += 1;
        self.stats.rows += 1;
        if reading.is_excursion {
            self.stats.excursions += 1;
        }
        Some(reading)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.generator.expected_rows() - self.stats.rows;
        match usize::try_from(remaining) {
            Ok(n) => (n, Some(n)),
            Err(_) => (usize::MAX, None),
        }
    }
}
