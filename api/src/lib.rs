// ============================================================================
// POSTS API
// ============================================================================

// - Paginated, filterable post listing backed by PostgreSQL
// - Post creation with an image uploaded to S3
// - Typed validation and error responses
// - CORS configuration
// - Structured logging

pub mod config;
pub mod db;
pub mod dto;
pub mod errors;
pub mod models;
pub mod routes;
pub mod states;
pub mod storage;
pub mod upload;

pub use states::AppState;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::get,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Build the router with every route and middleware layer attached.
///
/// `max_upload_bytes` caps the multipart body of `POST /posts`.
pub fn app(state: AppState, max_upload_bytes: usize) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route(
            "/posts",
            get(routes::post::get_posts).post(routes::post::create_post),
        )
        .route("/posts/{id}", get(routes::post::get_post))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}
