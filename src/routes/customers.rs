use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use sqlx::PgPool;
use tracing::{error, info};

use crate::store;

// ---

pub fn router() -> Router<PgPool> {
    // ---
    Router::new().route("/customers", get(handler))
}

async fn handler(State(pool): State<PgPool>) -> impl IntoResponse {
    // ---
    info!("GET /customers");

    match store::load_customers(&pool).await {
        Ok(customers) => (StatusCode::OK, Json(customers)).into_response(),
        Err(e) => {
            error!("Failed to load customers: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json("Failed to load customers"),
            )
                .into_response()
        }
    }
}
