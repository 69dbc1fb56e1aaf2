//! API Handlers
//!
//! HTTP request handlers for the cache and queue inspection endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::Value;

use super::state::AppState;
use crate::cache::{CacheMetrics, CacheSnapshot, ImportOptions};
use crate::error::{Error, Result};
use crate::models::{
    DeleteResponse, DequeueResponse, EnqueueRequest, EnqueueResponse, GetResponse,
    HealthResponse, ImportQuery, ImportResponse, NetworkResponse, SetRequest, SetResponse,
    TagDeleteResponse, TagResponse,
};
use crate::network::NetworkStatus;
use crate::queue::{MessageFilter, QueueMetrics, QueuedOperation};

// == Cache Handlers ==

/// Handler for PUT /cache
///
/// Stores a JSON value with optional TTL, priority, tags and forced
/// compression.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(Error::Validation(error_msg));
    }

    let stored = {
        let mut cache = state.cache.write().await;
        cache.set(&req.key, &req.value, req.write_options())
    };
    if !stored {
        return Err(Error::Validation(format!(
            "Value for '{}' does not fit the cache budget",
            req.key
        )));
    }

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /cache/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    // Write lock: a read updates access statistics
    let mut cache = state.cache.write().await;
    let value = cache
        .get::<Value>(&key)
        .ok_or_else(|| Error::NotFound(format!("Key '{}'", key)))?;

    Ok(Json(GetResponse::new(key, value)))
}

/// Handler for DELETE /cache/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<DeleteResponse>> {
    let mut cache = state.cache.write().await;
    if !cache.delete(&key) {
        return Err(Error::NotFound(format!("Key '{}'", key)));
    }

    Ok(Json(DeleteResponse::new(key)))
}

/// Handler for GET /cache/tags/:tag
pub async fn get_tag_handler(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Json<TagResponse> {
    let entries = state.cache.read().await.get_by_tag::<Value>(&tag);
    Json(TagResponse::new(tag, entries))
}

/// Handler for DELETE /cache/tags/:tag
pub async fn delete_tag_handler(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> Json<TagDeleteResponse> {
    let deleted = state.cache.write().await.delete_by_tag(&tag);
    Json(TagDeleteResponse { tag, deleted })
}

/// Handler for GET /cache/metrics
pub async fn cache_metrics_handler(State(state): State<AppState>) -> Json<CacheMetrics> {
    Json(state.cache.read().await.metrics())
}

/// Handler for GET /cache/export
pub async fn export_handler(State(state): State<AppState>) -> Json<CacheSnapshot> {
    Json(state.cache.read().await.export())
}

/// Handler for POST /cache/import?merge=bool
///
/// Takes the raw envelope so malformed input surfaces as a validation
/// error rather than an extractor rejection.
pub async fn import_handler(
    State(state): State<AppState>,
    Query(query): Query<ImportQuery>,
    body: String,
) -> Result<Json<ImportResponse>> {
    let options = ImportOptions { merge: query.merge };
    let imported = state.cache.write().await.import_json(&body, options)?;
    Ok(Json(ImportResponse { imported }))
}

// == Queue Handlers ==

/// Handler for POST /queue
pub async fn enqueue_handler(
    State(state): State<AppState>,
    Json(req): Json<EnqueueRequest>,
) -> Result<(StatusCode, Json<EnqueueResponse>)> {
    let id = state
        .queue
        .enqueue(req.kind, req.payload.clone(), req.options())
        .await?;
    Ok((StatusCode::ACCEPTED, Json(EnqueueResponse { id })))
}

/// Handler for GET /queue?kind=&priority=&status=
pub async fn list_queue_handler(
    State(state): State<AppState>,
    Query(filter): Query<MessageFilter>,
) -> Json<Vec<QueuedOperation>> {
    Json(state.queue.get_messages(&filter).await)
}

/// Handler for GET /queue/:id
pub async fn get_operation_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<QueuedOperation>> {
    state
        .queue
        .get_message(&id)
        .await
        .map(Json)
        .ok_or_else(|| Error::NotFound(format!("Operation '{}'", id)))
}

/// Handler for DELETE /queue/:id
///
/// Only pending operations can be cancelled.
pub async fn dequeue_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DequeueResponse>> {
    if state.queue.dequeue(&id).await {
        return Ok(Json(DequeueResponse::new(id)));
    }

    match state.queue.get_message(&id).await {
        Some(_) => Err(Error::Validation(format!(
            "Operation '{}' is already dispatching",
            id
        ))),
        None => Err(Error::NotFound(format!("Operation '{}'", id))),
    }
}

/// Handler for GET /queue/metrics
pub async fn queue_metrics_handler(State(state): State<AppState>) -> Json<QueueMetrics> {
    Json(state.queue.metrics().await)
}

// == Network / Health ==

/// Handler for PUT /network
///
/// Publishes the status on the monitor and applies it to the queue
/// directly so the response reflects any reconnect tick.
pub async fn network_handler(
    State(state): State<AppState>,
    Json(status): Json<NetworkStatus>,
) -> Json<NetworkResponse> {
    state.network.set_status(status.clone());
    let tick = state.queue.set_network_status(status).await;

    Json(NetworkResponse {
        status: state.queue.network_status().await,
        tick,
    })
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let online = state.queue.network_status().await.online;
    Json(HealthResponse::healthy(online))
}
