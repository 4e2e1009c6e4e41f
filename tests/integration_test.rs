//! Live tests against a running service (`BASE_URL`, default
//! `http://localhost:8080`) backed by a seeded database.
//!
//! Run with `cargo test -- --ignored` once the service is up.

use anyhow::Result;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct Reading {
    customer_id: String,
    sensor_id: String,
    reading_timestamp: DateTime<Utc>,
    temperature_celsius: f64,
    is_excursion: bool,
}

#[derive(Debug, Deserialize)]
struct Customer {
    customer_id: String,
    min_temp: f64,
    max_temp: f64,
}

#[derive(Debug, Deserialize)]
struct Summary {
    customer_id: String,
    reading_count: i64,
    min_temperature_celsius: f64,
    max_temperature_celsius: f64,
    avg_temperature_celsius: f64,
    excursion_count: i64,
}

fn base_url() -> String {
    std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:8080".into())
}

#[tokio::test]
#[ignore = "requires a running service at BASE_URL"]
async fn health_endpoint_ok() -> Result<()> {
    // ---
    let body: serde_json::Value = Client::new()
        .get(format!("{}/health", base_url()))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(body["status"], "ok");
    Ok(())
}

#[tokio::test]
#[ignore = "requires a running service at BASE_URL"]
async fn readings_respect_customer_bands() -> Result<()> {
    // ---
    let base = base_url();
    let client = Client::new();

    let customers: Vec<Customer> = client
        .get(format!("{base}/customers"))
        .send()
        .await?
        .json()
        .await?;
    assert!(!customers.is_empty(), "No customers returned from {base}");

    for c in &customers {
        let url = format!("{base}/readings?customer_id={}&limit=200", c.customer_id);
        let readings: Vec<Reading> = client.get(&url).send().await?.json().await?;
        assert!(!readings.is_empty(), "No readings returned from {url}");

        let midpoint = (c.min_temp + c.max_temp) / 2.0;
        for r in &readings {
            assert_eq!(r.customer_id, c.customer_id, "customer filter failed");
            assert!(
                r.sensor_id.starts_with(&format!("SENSOR-{}-", c.customer_id)),
                "bad sensor id {}",
                r.sensor_id
            );
            assert!(r.temperature_celsius >= c.min_temp);
            assert!(r.temperature_celsius <= midpoint + 12.0);
        }

        for pair in readings.windows(2) {
            assert_eq!(
                pair[1].reading_timestamp - pair[0].reading_timestamp,
                chrono::Duration::hours(1),
                "readings are not hourly"
            );
        }
    }

    Ok(())
}

#[tokio::test]
#[ignore = "requires a running service at BASE_URL"]
async fn excursion_filter_and_summary_agree() -> Result<()> {
    // ---
    let base = base_url();
    let client = Client::new();

    let summaries: Vec<Summary> = client
        .get(format!("{base}/summary"))
        .send()
        .await?
        .json()
        .await?;
    assert!(!summaries.is_empty());

    for s in &summaries {
        assert!(s.reading_count > 0);
        assert!(s.min_temperature_celsius <= s.avg_temperature_celsius);
        assert!(s.avg_temperature_celsius <= s.max_temperature_celsius);

        let url = format!(
            "{base}/readings?customer_id={}&excursions_only=true&limit=10000",
            s.customer_id
        );
        let excursions: Vec<Reading> = client.get(&url).send().await?.json().await?;
        assert!(excursions.iter().all(|r| r.is_excursion));
        assert_eq!(excursions.len() as i64, s.excursion_count.min(10_000));
    }

    Ok(())
}

#[tokio::test]
#[ignore = "requires a running service at BASE_URL"]
async fn documents_are_tagged_by_file_name() -> Result<()> {
    // ---
    let base = base_url();
    let client = Client::new();

    let customers: Vec<Customer> = client
        .get(format!("{base}/customers"))
        .send()
        .await?
        .json()
        .await?;
    let target = &customers[0].customer_id;
    let file_name = format!("{target}_hvac_service_report.pdf");

    let resp = client
        .post(format!("{base}/documents"))
        .json(&json!({ "file_name": file_name, "document_content": "Compressor replaced." }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let tagged: serde_json::Value = resp.json().await?;
    assert_eq!(tagged["customer_id"], target.as_str());

    let resp = client
        .post(format!("{base}/documents"))
        .json(&json!({ "file_name": "unrelated.pdf", "document_content": "" }))
        .send()
        .await?;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    Ok(())
}
