use axum::{
    extract::Query, extract::State, http::StatusCode, response::IntoResponse, routing::get, Json,
    Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, error, info};

use crate::Reading;

// ---

const DEFAULT_LIMIT: u32 = 1000;
const MAX_LIMIT: u32 = 10_000;

pub fn router() -> Router<PgPool> {
    // ---
    Router::new().route("/readings", get(handler))
}

async fn handler(
    Query(params): Query<ReadingsQuery>,
    State(pool): State<PgPool>,
) -> impl IntoResponse {
    // ---
    info!("GET /readings - {:?}", params);

    match fetch_readings(&pool, &params).await {
        Ok(readings) => {
            debug!("GET /readings - returning {} readings", readings.len());
            (StatusCode::OK, Json(readings)).into_response()
        }
        Err(e) => {
            error!("Failed to query readings: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json("Failed to query readings"),
            )
                .into_response()
        }
    }
}

/// Query parameters for filtering sensor readings
#[derive(Debug, Default, Deserialize)]
pub struct ReadingsQuery {
    customer_id: Option<String>,
    sensor_id: Option<String>,
    /// Inclusive lower bound, RFC 3339 (e.g. "2025-03-21T00:00:00Z")
    from: Option<DateTime<Utc>>,
    /// Exclusive upper bound, RFC 3339
    to: Option<DateTime<Utc>>,
    /// Only readings the generator injected as excursions
    excursions_only: Option<bool>,
    limit: Option<u32>,
}

impl ReadingsQuery {
    fn effective_limit(&self) -> i64 {
        i64::from(self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT))
    }
}

async fn fetch_readings(
    pool: &PgPool,
    params: &ReadingsQuery,
) -> Result<Vec<Reading>, sqlx::Error> {
    // ---
    let mut qb = build_query(params);
    qb.build_query_as::<Reading>().fetch_all(pool).await
}

fn build_query(params: &ReadingsQuery) -> QueryBuilder<'_, Postgres> {
    // ---
    let mut qb = QueryBuilder::<Postgres>::new(
        r#"
        SELECT r.customer_id, r.customer_name, r.reading_timestamp,
               r.temperature_celsius, r.sensor_id, r.is_excursion
        FROM sensor_readings r
        WHERE TRUE"#,
    );

    if let Some(customer_id) = &params.customer_id {
        qb.push(" AND r.customer_id = ").push_bind(customer_id);
    }
    if let Some(sensor_id) = &params.sensor_id {
        qb.push(" AND r.sensor_id = ").push_bind(sensor_id);
    }
    if let Some(from) = params.from {
        qb.push(" AND r.reading_timestamp >= ").push_bind(from);
    }
    if let Some(to) = params.to {
        qb.push(" AND r.reading_timestamp < ").push_bind(to);
    }
    if params.excursions_only.unwrap_or(false) {
        qb.push(" AND r.is_excursion");
    }

    qb.push(" ORDER BY r.customer_id, r.reading_timestamp LIMIT ")
        .push_bind(params.effective_limit());
    qb
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_limit_defaults_and_caps() {
        // ---
        let params = ReadingsQuery::default();
        assert_eq!(params.effective_limit(), 1000);

        let params = ReadingsQuery {
            limit: Some(50_000),
            ..ReadingsQuery::default()
        };
        assert_eq!(params.effective_limit(), 10_000);
    }

    #[test]
    fn test_query_applies_filters_in_order() {
        // ---
        let params = ReadingsQuery {
            customer_id: Some("CUST-DC-8472".to_string()),
            excursions_only: Some(true),
            limit: Some(10),
            ..ReadingsQuery::default()
        };
        let qb = build_query(&params);
        let sql = qb.sql();

        assert!(sql.contains("AND r.customer_id = $1"));
        assert!(!sql.contains("r.sensor_id = "));
        assert!(sql.contains("AND r.is_excursion"));
        assert!(sql.contains("r.sensor_id, r.is_excursion"));
        assert!(!sql.contains("max_temp"));
        assert!(sql.ends_with("ORDER BY r.customer_id, r.reading_timestamp LIMIT $2"));
    }
}
