//! Persistence of generated data sets.
//!
//! A generation run replaces the fact table as a whole: customers are
//! upserted, previous readings removed, the new readings inserted in chunks,
//! summaries recomputed and the run recorded, all in one transaction.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::documents::TaggedDocument;
use crate::generator::{GenerationOutput, GenerationStats, GeneratorSettings};
use crate::models::Customer;

// ---

/// PostgreSQL accepts at most 65535 bind parameters per statement and each
/// reading binds six.
const INSERT_CHUNK_ROWS: usize = 10_000;

/// Record of one generation, enough to reproduce it.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct GenerationRun {
    // ---
    pub run_id: Uuid,
    /// Stored as the `u64` seed's bit pattern; see [`GenerationRun::seed`].
    #[serde(serialize_with = "serialize_seed")]
    pub seed: i64,
    pub num_hours: i64,
    pub anchor_timestamp: DateTime<Utc>,
    pub row_count: i64,
    pub excursion_count: i64,
    pub generated_at: DateTime<Utc>,
}

impl GenerationRun {
    // ---
    pub fn new(seed: u64, settings: &GeneratorSettings, stats: GenerationStats) -> Self {
        GenerationRun {
            run_id: Uuid::new_v4(),
            seed: seed as i64,
            num_hours: settings.num_hours,
            anchor_timestamp: settings.anchor_timestamp,
            row_count: stats.rows as i64,
            excursion_count: stats.excursions as i64,
            generated_at: Utc::now(),
        }
    }

    /// The seed to pass back to `SeededSource::from_seed`.
    pub fn seed(&self) -> u64 {
        self.seed as u64
    }
}

fn serialize_seed<S: serde::Serializer>(seed: &i64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(*seed as u64)
}

/// Number of rows currently in the fact table.
pub async fn reading_count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    // ---
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sensor_readings")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Replace the stored data set with `output` and record `run`.
pub async fn replace_dataset(
    pool: &PgPool,
    customers: &[Customer],
    output: &GenerationOutput,
    run: &GenerationRun,
) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    upsert_customers(&mut tx, customers).await?;

    let deleted = sqlx::query("DELETE FROM sensor_readings")
        .execute(&mut *tx)
        .await?
        .rows_affected();
    tracing::debug!("Removed {} previous readings", deleted);

    for (i, chunk) in output.readings.chunks(INSERT_CHUNK_ROWS).enumerate() {
        let mut qb = QueryBuilder::<Postgres>::new(
            "INSERT INTO sensor_readings \
             (customer_id, customer_name, sensor_id, reading_timestamp, \
              temperature_celsius, is_excursion) ",
        );
        qb.push_values(chunk, |mut row, r| {
            row.push_bind(&r.customer_id)
                .push_bind(&r.customer_name)
                .push_bind(&r.sensor_id)
                .push_bind(r.reading_timestamp)
                .push_bind(r.temperature_celsius)
                .push_bind(r.is_excursion);
        });
        qb.build().execute(&mut *tx).await?;
        tracing::debug!("Inserted chunk {} ({} readings)", i + 1, chunk.len());
    }

    refresh_summaries(&mut tx).await?;

    sqlx::query(
        r#"
        INSERT INTO generation_runs (
            run_id, seed, num_hours, anchor_timestamp,
            row_count, excursion_count, generated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(run.run_id)
    .bind(run.seed)
    .bind(run.num_hours)
    .bind(run.anchor_timestamp)
    .bind(run.row_count)
    .bind(run.excursion_count)
    .bind(run.generated_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        run_id = %run.run_id,
        rows = run.row_count,
        "Stored generated readings"
    );
    Ok(())
}

async fn upsert_customers(
    tx: &mut Transaction<'_, Postgres>,
    customers: &[Customer],
) -> Result<(), sqlx::Error> {
    // ---
    for c in customers {
        sqlx::query(
            r#"
            INSERT INTO customers (customer_id, customer_name, min_temp, max_temp)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (customer_id) DO UPDATE SET
                customer_name = EXCLUDED.customer_name,
                min_temp      = EXCLUDED.min_temp,
                max_temp      = EXCLUDED.max_temp
            "#,
        )
        .bind(&c.customer_id)
        .bind(&c.customer_name)
        .bind(c.min_temp)
        .bind(c.max_temp)
        .execute(&mut **tx)
        .await?;
    }
    Ok(())
}

/// Recompute `customer_temperature_summary` from the fact table.
///
/// Same roll-up as `models::summarize`: excursions are the rows the
/// generator flagged, so the count matches `generation_runs.excursion_count`.
pub async fn refresh_summaries(tx: &mut Transaction<'_, Postgres>) -> Result<(), sqlx::Error> {
    // ---
    sqlx::query("DELETE FROM customer_temperature_summary")
        .execute(&mut **tx)
        .await?;

    sqlx::query(
        r#"
        INSERT INTO customer_temperature_summary (
            customer_id, customer_name, reading_count,
            avg_temperature_celsius, min_temperature_celsius, max_temperature_celsius,
            excursion_count
        )
        SELECT
            r.customer_id,
            c.customer_name,
            COUNT(*),
            AVG(r.temperature_celsius),
            MIN(r.temperature_celsius),
            MAX(r.temperature_celsius),
            COUNT(*) FILTER (WHERE r.is_excursion)
        FROM sensor_readings r
        JOIN customers c ON c.customer_id = r.customer_id
        GROUP BY r.customer_id, c.customer_name
        "#,
    )
    .execute(&mut **tx)
    .await?;

    Ok(())
}

/// All known customers, ordered by id.
pub async fn load_customers(pool: &PgPool) -> Result<Vec<Customer>, sqlx::Error> {
    // ---
    sqlx::query_as::<_, Customer>(
        "SELECT customer_id, customer_name, min_temp, max_temp FROM customers ORDER BY customer_id",
    )
    .fetch_all(pool)
    .await
}

/// Insert or replace a tagged document, keyed by file name.
pub async fn upsert_document(pool: &PgPool, doc: &TaggedDocument) -> Result<(), sqlx::Error> {
    // ---
    sqlx::query(
        r#"
        INSERT INTO customer_documents (file_name, document_content, customer_id, customer_name)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (file_name) DO UPDATE SET
            document_content = EXCLUDED.document_content,
            customer_id      = EXCLUDED.customer_id,
            customer_name    = EXCLUDED.customer_name
        "#,
    )
    .bind(&doc.file_name)
    .bind(&doc.document_content)
    .bind(&doc.customer_id)
    .bind(&doc.customer_name)
    .execute(pool)
    .await?;

    Ok(())
}
