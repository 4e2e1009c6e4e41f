use axum::Router;
use sqlx::PgPool;

mod customers;
mod documents;
mod health;
mod readings;
mod runs;
mod summary;

// ---

pub fn router(pool: PgPool) -> Router {
    // ---
    Router::new()
        .merge(customers::router())
        .merge(readings::router())
        .merge(summary::router())
        .merge(documents::router())
        .merge(runs::router())
        .merge(health::router())
        .with_state(pool)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    #[tokio::test]
    async fn test_router_needs_only_a_pool() {
        // ---
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://sensorgen@localhost/sensorgen")
            .unwrap();
        let _app: Router = router(pool);
    }
}
