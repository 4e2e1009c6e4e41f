use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use sqlx::PgPool;
use tracing::{error, info};

use crate::TemperatureSummary;

// ---

pub fn router() -> Router<PgPool> {
    // ---
    Router::new().route("/summary", get(handler))
}

/// Handle `GET /summary`: per-customer average, minimum, maximum, reading
/// count and excursion count.
async fn handler(State(pool): State<PgPool>) -> impl IntoResponse {
    // ---
    info!("GET /summary");

    let result = sqlx::query_as::<_, TemperatureSummary>(
        r#"
        SELECT customer_id, customer_name, reading_count,
               avg_temperature_celsius, min_temperature_celsius, max_temperature_celsius,
               excursion_count
        FROM customer_temperature_summary
        ORDER BY customer_id
        "#,
    )
    .fetch_all(&pool)
    .await;

    match result {
        Ok(summaries) => (StatusCode::OK, Json(summaries)).into_response(),
        Err(e) => {
            error!("Failed to query summaries: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json("Failed to query summaries"),
            )
                .into_response()
        }
    }
}
