use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use sqlx::PgPool;
use tracing::{error, info};

use crate::GenerationRun;

// ---

pub fn router() -> Router<PgPool> {
    // ---
    Router::new().route("/runs", get(handler))
}

/// Handle `GET /runs`: generation history, newest first.
async fn handler(State(pool): State<PgPool>) -> impl IntoResponse {
    // ---
    info!("GET /runs");

    let result = sqlx::query_as::<_, GenerationRun>(
        r#"
        SELECT run_id, seed, num_hours, anchor_timestamp,
               row_count, excursion_count, generated_at
        FROM generation_runs
        ORDER BY generated_at DESC
        "#,
    )
    .fetch_all(&pool)
    .await;

    match result {
        Ok(runs) => (StatusCode::OK, Json(runs)).into_response(),
        Err(e) => {
            error!("Failed to query generation runs: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json("Failed to query generation runs"),
            )
                .into_response()
        }
    }
}
