// src/routes/health.rs
//! Health check endpoint for the sensor generator service.
//!
//! Used by container orchestrators and CI to check that the service is up.
//! Follows the Explicit Module Boundary Pattern (EMBP): the handler stays
//! private to this file and only the subrouter is exported to the gateway.

use axum::{routing::get, Json, Router};
use serde::Serialize;

/// JSON response body for the `/health` endpoint.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Handle `GET /health`.
///
/// Does not touch the database.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Subrouter with the `/health` route, generic over the gateway state.
pub fn router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health))
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[tokio::test]
    async fn test_health_reports_ok_and_version() {
        // ---
        let Json(body) = health().await;
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["status"], "ok");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }
}
