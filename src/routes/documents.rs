use axum::{
    extract::Query, extract::State, http::StatusCode, response::IntoResponse, routing::get, Json,
    Router,
};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{error, info, warn};

use crate::{documents, store, ParsedDocument, TaggedDocument};

// ---

pub fn router() -> Router<PgPool> {
    // ---
    Router::new().route("/documents", get(list_handler).post(ingest_handler))
}

/// Handle `POST /documents`: attribute a parsed document to its customer and
/// store it.
async fn ingest_handler(
    State(pool): State<PgPool>,
    Json(doc): Json<ParsedDocument>,
) -> impl IntoResponse {
    // ---
    info!("POST /documents - {}", doc.file_name);

    let customers = match store::load_customers(&pool).await {
        Ok(customers) => customers,
        Err(e) => {
            error!("Failed to load customers: {}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json("Failed to load customers".to_string()),
            )
                .into_response();
        }
    };

    let tagged = match documents::tag_document(doc, &customers) {
        Ok(tagged) => tagged,
        Err(e) => {
            warn!("Rejected document: {}", e);
            return (StatusCode::UNPROCESSABLE_ENTITY, Json(e.to_string())).into_response();
        }
    };

    if let Err(e) = store::upsert_document(&pool, &tagged).await {
        error!("Failed to store document {}: {}", tagged.file_name, e);
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json("Failed to store document".to_string()),
        )
            .into_response();
    }

    info!(
        "Tagged {} as {} ({})",
        tagged.file_name, tagged.customer_id, tagged.customer_name
    );
    (StatusCode::CREATED, Json(tagged)).into_response()
}

#[derive(Debug, Deserialize)]
pub struct DocumentsQuery {
    customer_id: Option<String>,
}

/// Handle `GET /documents`, optionally filtered by customer.
async fn list_handler(
    Query(params): Query<DocumentsQuery>,
    State(pool): State<PgPool>,
) -> impl IntoResponse {
    // ---
    info!("GET /documents - {:?}", params);

    let result = sqlx::query_as::<_, TaggedDocument>(
        r#"
        SELECT file_name, document_content, customer_id, customer_name
        FROM customer_documents
        WHERE $1::TEXT IS NULL OR customer_id = $1
        ORDER BY customer_id, file_name
        "#,
    )
    .bind(params.customer_id)
    .fetch_all(&pool)
    .await;

    match result {
        Ok(docs) => (StatusCode::OK, Json(docs)).into_response(),
        Err(e) => {
            error!("Failed to query documents: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json("Failed to query documents".to_string()),
            )
                .into_response()
        }
    }
}
