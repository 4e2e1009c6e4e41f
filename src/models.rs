//! Data models for the sensor reading fact table.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---

/// A monitored facility and its normal operating band in °C.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Customer {
    // ---
    pub customer_id: String,
    pub customer_name: String,
    pub min_temp: f64,
    pub max_temp: f64,
}

/// One synthetic hourly observation.
///
/// `(customer_id, sensor_id, reading_timestamp)` is the natural key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reading {
    // ---
    pub customer_id: String,
    pub customer_name: String,
    pub reading_timestamp: DateTime<Utc>,
    pub temperature_celsius: f64,
    pub sensor_id: String,
    /// Set when the generator injected this reading as an excursion
    pub is_excursion: bool,
}

/// Per-customer metrics exposed to the semantic layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TemperatureSummary {
    // ---
    pub customer_id: String,
    pub customer_name: String,
    pub reading_count: i64,
    pub avg_temperature_celsius: f64,
    pub min_temperature_celsius: f64,
    pub max_temperature_celsius: f64,
    /// Readings the generator injected as excursions
    pub excursion_count: i64,
}

impl Customer {
    // ---
    pub fn new(customer_id: &str, customer_name: &str, min_temp: f64, max_temp: f64) -> Self {
        Customer {
            customer_id: customer_id.to_string(),
            customer_name: customer_name.to_string(),
            min_temp,
            max_temp,
        }
    }

    /// Centre of the normal band; excursions are offset from here.
    pub fn midpoint(&self) -> f64 {
        (self.min_temp + self.max_temp) / 2.0
    }

    /// The three facilities used by the demo environment.
    pub fn demo_fleet() -> Vec<Customer> {
        // ---
        vec![
            Customer::new("CUST-CS-1936", "Polar Cold Storage", 2.0, 8.0),
            Customer::new("CUST-DC-8472", "Northgate Data Center", 18.0, 21.0),
            Customer::new("CUST-PH-5520", "Meridian Pharma Warehouse", 15.0, 25.0),
        ]
    }
}

/// Sensor label for a customer, e.g. `SENSOR-CUST-DC-8472-003`.
pub fn sensor_label(customer_id: &str, sensor_num: u32) -> String {
    format!("SENSOR-{customer_id}-{sensor_num:03}")
}

/// Roll readings up into one summary per customer, ordered by customer id.
///
/// Readings whose customer is not in `customers` are ignored, and customers
/// without readings produce no row. Excursions are counted from the
/// generator's flag, not from a threshold: an excursion on a wide band can
/// land inside the band. This mirrors the SQL roll-up in
/// `store::refresh_summaries`.
pub fn summarize(customers: &[Customer], readings: &[Reading]) -> Vec<TemperatureSummary> {
    // ---
    let bands: BTreeMap<&str, &Customer> = customers
        .iter()
        .map(|c| (c.customer_id.as_str(), c))
        .collect();

    let mut acc: BTreeMap<&str, (i64, f64, f64, f64, i64)> = BTreeMap::new();
    for r in readings {
        let Some(customer) = bands.get(r.customer_id.as_str()) else {
            continue;
        };
        let t = r.temperature_celsius;
        let entry = acc
            .entry(customer.customer_id.as_str())
            .or_insert((0, 0.0, f64::INFINITY, f64::NEG_INFINITY, 0));
        entry.0 += 1;
        entry.1 += t;
        entry.2 = entry.2.min(t);
        entry.3 = entry.3.max(t);
        if r.is_excursion {
            entry.4 += 1;
        }
    }

    acc.into_iter()
        .map(|(id, (count, sum, min, max, excursions))| TemperatureSummary {
            customer_id: id.to_string(),
            customer_name: bands[id].customer_name.clone(),
            reading_count: count,
            avg_temperature_celsius: sum / count as f64,
            min_temperature_celsius: min,
            max_temperature_celsius: max,
            excursion_count: excursions,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use chrono::TimeZone;

    fn create_test_reading(customer_id: &str, hour: u32, temp_c: f64) -> Reading {
        // ---
        create_flagged_reading(customer_id, hour, temp_c, false)
    }

    fn create_flagged_reading(
        customer_id: &str,
        hour: u32,
        temp_c: f64,
        is_excursion: bool,
    ) -> Reading {
        // ---
        Reading {
            customer_id: customer_id.to_string(),
            customer_name: format!("{customer_id} facility"),
            reading_timestamp: Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0).unwrap(),
            temperature_celsius: temp_c,
            sensor_id: sensor_label(customer_id, 1),
            is_excursion,
        }
    }

    #[test]
    fn test_midpoint() {
        // ---
        let dc = Customer::new("CUST-DC-8472", "Northgate Data Center", 18.0, 21.0);
        assert_eq!(dc.midpoint(), 19.5);
    }

    #[test]
    fn test_sensor_label_is_zero_padded() {
        // ---
        assert_eq!(sensor_label("CUST-DC-8472", 3), "SENSOR-CUST-DC-8472-003");
        assert_eq!(sensor_label("X", 42), "SENSOR-X-042");
        assert_eq!(sensor_label("X", 999), "SENSOR-X-999");
    }

    #[test]
    fn test_demo_fleet_is_valid() {
        // ---
        let fleet = Customer::demo_fleet();
        assert_eq!(fleet.len(), 3);
        for c in &fleet {
            assert!(c.min_temp < c.max_temp, "{} has an inverted band", c.customer_id);
        }
        assert!(fleet.iter().any(|c| c.customer_id == "CUST-DC-8472"));
    }

    #[test]
    fn test_summarize_counts_and_extremes() {
        // ---
        let customers = vec![
            Customer::new("A", "Alpha", 18.0, 21.0),
            Customer::new("B", "Beta", 2.0, 8.0),
        ];
        let readings = vec![
            create_test_reading("B", 0, 4.0),
            create_test_reading("A", 0, 18.0),
            create_test_reading("A", 1, 21.0),
            create_flagged_reading("A", 2, 29.5, true),
            create_test_reading("B", 1, 6.0),
        ];

        let summaries = summarize(&customers, &readings);
        assert_eq!(summaries.len(), 2);

        let a = &summaries[0];
        assert_eq!(a.customer_id, "A");
        assert_eq!(a.customer_name, "Alpha");
        assert_eq!(a.reading_count, 3);
        assert_eq!(a.min_temperature_celsius, 18.0);
        assert_eq!(a.max_temperature_celsius, 29.5);
        assert!((a.avg_temperature_celsius - 22.833_333).abs() < 1e-5);
        assert_eq!(a.excursion_count, 1);

        let b = &summaries[1];
        assert_eq!(b.customer_id, "B");
        assert_eq!(b.reading_count, 2);
        assert_eq!(b.avg_temperature_celsius, 5.0);
        assert_eq!(b.excursion_count, 0);
    }

    #[test]
    fn test_summarize_counts_in_band_excursions() {
        // ---
        // Midpoint 15 plus 8 stays below max_temp 30
        let customers = vec![Customer::new("WIDE", "Wide band", 0.0, 30.0)];
        let readings = vec![
            create_flagged_reading("WIDE", 0, 23.0, true),
            create_test_reading("WIDE", 1, 29.0),
        ];

        let summaries = summarize(&customers, &readings);
        assert_eq!(summaries[0].excursion_count, 1);
        assert_eq!(summaries[0].max_temperature_celsius, 29.0);
    }

    #[test]
    fn test_summarize_skips_unknown_and_idle_customers() {
        // ---
        let customers = vec![
            Customer::new("A", "Alpha", 18.0, 21.0),
            Customer::new("IDLE", "Idle", 0.0, 1.0),
        ];
        let readings = vec![
            create_test_reading("A", 0, 19.0),
            create_test_reading("GHOST", 0, 100.0),
        ];

        let summaries = summarize(&customers, &readings);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].customer_id, "A");
        assert_eq!(summaries[0].max_temperature_celsius, 19.0);
    }

    #[test]
    fn test_reading_serializes_with_column_names() {
        // ---
        let reading = create_test_reading("CUST-DC-8472", 5, 19.25);
        let json = serde_json::to_value(&reading).unwrap();

        assert_eq!(json["customer_id"], "CUST-DC-8472");
        assert_eq!(json["sensor_id"], "SENSOR-CUST-DC-8472-001");
        assert_eq!(json["temperature_celsius"], 19.25);
        assert_eq!(json["reading_timestamp"], "2025-01-01T05:00:00Z");
        assert_eq!(json["is_excursion"], false);
    }
}
