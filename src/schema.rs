//! Database schema management for `codemetal-sensorgen`.
//!
//! Ensures required tables and indexes exist before seeding or serving
//! requests. Applied once on startup from `main.rs` (EMBP: single gateway call).

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create or update the database schema (idempotent).
///
/// Creates `customers`, the `sensor_readings` fact table keyed by
/// `(customer_id, sensor_id, reading_timestamp)`, the per-customer
/// `customer_temperature_summary`, the `generation_runs` log and
/// `customer_documents`. Safe to call on every startup; no-op if objects
/// already exist.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS customers (
            customer_id   TEXT PRIMARY KEY,
            customer_name TEXT             NOT NULL,
            min_temp      DOUBLE PRECISION NOT NULL,
            max_temp      DOUBLE PRECISION NOT NULL,
            CHECK (min_temp < max_temp)
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Fact table; one row per customer per hour
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sensor_readings (
            customer_id         TEXT             NOT NULL REFERENCES customers (customer_id),
            customer_name       TEXT             NOT NULL,
            sensor_id           TEXT             NOT NULL,
            reading_timestamp   TIMESTAMPTZ      NOT NULL,
            temperature_celsius DOUBLE PRECISION NOT NULL,
            is_excursion        BOOLEAN          NOT NULL DEFAULT FALSE,
            PRIMARY KEY (customer_id, sensor_id, reading_timestamp)
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Metrics exposed to the semantic layer
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS customer_temperature_summary (
            customer_id             TEXT PRIMARY KEY,
            customer_name           TEXT             NOT NULL,
            reading_count           BIGINT           NOT NULL,
            avg_temperature_celsius DOUBLE PRECISION NOT NULL,
            min_temperature_celsius DOUBLE PRECISION NOT NULL,
            max_temperature_celsius DOUBLE PRECISION NOT NULL,
            excursion_count         BIGINT           NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS generation_runs (
            run_id           UUID PRIMARY KEY,
            seed             BIGINT      NOT NULL,
            num_hours        BIGINT      NOT NULL,
            anchor_timestamp TIMESTAMPTZ NOT NULL,
            row_count        BIGINT      NOT NULL,
            excursion_count  BIGINT      NOT NULL,
            generated_at     TIMESTAMPTZ NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS customer_documents (
            file_name        TEXT PRIMARY KEY,
            document_content TEXT NOT NULL,
            customer_id      TEXT NOT NULL REFERENCES customers (customer_id),
            customer_name    TEXT NOT NULL
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Tables created before the excursion flag existed
    sqlx::query(
        r#"
        ALTER TABLE sensor_readings
            ADD COLUMN IF NOT EXISTS is_excursion BOOLEAN NOT NULL DEFAULT FALSE;
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sensor_readings_customer_ts
            ON sensor_readings (customer_id, reading_timestamp);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_customer_documents_customer_id
            ON customer_documents (customer_id);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
