//! API Routes
//!
//! Configures the Axum router with the cache and queue endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    cache_metrics_handler, delete_handler, delete_tag_handler, dequeue_handler, enqueue_handler,
    export_handler, get_handler, get_operation_handler, get_tag_handler, health_handler,
    import_handler, list_queue_handler, network_handler, queue_metrics_handler, set_handler,
};
use super::state::AppState;

/// Creates the main router with all endpoints configured.
///
/// # Endpoints
/// - `PUT /cache` - Store a value
/// - `GET|DELETE /cache/:key` - Read or delete one key
/// - `GET|DELETE /cache/tags/:tag` - Read or delete by tag
/// - `GET /cache/metrics` - Cache metrics
/// - `GET /cache/export` - Snapshot envelope
/// - `POST /cache/import?merge=bool` - Load a snapshot envelope
/// - `POST /queue` - Enqueue an operation
/// - `GET /queue` - List live operations (filterable)
/// - `GET|DELETE /queue/:id` - Inspect or cancel an operation
/// - `GET /queue/metrics` - Queue metrics
/// - `PUT /network` - Push a network status change
/// - `GET /health` - Health check endpoint
///
/// # Middleware
/// - CORS: Allows any origin
/// - Tracing: Logs all requests
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Static segments take precedence over the :key / :id captures
    Router::new()
        .route("/cache", put(set_handler))
        .route("/cache/metrics", get(cache_metrics_handler))
        .route("/cache/export", get(export_handler))
        .route("/cache/import", post(import_handler))
        .route(
            "/cache/tags/:tag",
            get(get_tag_handler).delete(delete_tag_handler),
        )
        .route("/cache/:key", get(get_handler).delete(delete_handler))
        .route("/queue", post(enqueue_handler).get(list_queue_handler))
        .route("/queue/metrics", get(queue_metrics_handler))
        .route(
            "/queue/:id",
            get(get_operation_handler).delete(dequeue_handler),
        )
        .route("/network", put(network_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
