//! Integration Tests for API Endpoints
//!
//! Tests full request/response cycle for the cache, queue and network
//! endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use resilio::{api::create_router, config::Config, AppState, ManualClock};
use serde_json::{json, Value};
use tower::ServiceExt;

// == Helper Functions ==

fn create_test_app() -> Router {
    create_router(AppState::from_config(&Config::default()))
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

// == Cache Endpoint Tests ==

#[tokio::test]
async fn test_set_endpoint_success() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/cache")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"key":"test_key","value":"test_value"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_to_json(response.into_body()).await;
    assert!(json["message"].as_str().unwrap().contains("test_key"));
}

#[tokio::test]
async fn test_set_then_get_structured_value() {
    let app = create_test_app();
    let value = json!({"user": {"id": 7, "roles": ["admin"]}});

    let (status, _) = send(
        &app,
        "PUT",
        "/cache",
        Some(json!({"key": "profile", "value": value})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, "GET", "/cache/profile", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["key"], "profile");
    assert_eq!(body["value"], value);
}

#[tokio::test]
async fn test_get_missing_key_returns_404() {
    let app = create_test_app();

    let (status, body) = send(&app, "GET", "/cache/missing", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("missing"));
}

#[tokio::test]
async fn test_set_empty_key_returns_400() {
    let app = create_test_app();

    let (status, body) = send(&app, "PUT", "/cache", Some(json!({"key": "", "value": 1}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("error").is_some());
}

#[tokio::test]
async fn test_set_invalid_json_is_rejected() {
    let app = create_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/cache")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_delete_endpoint() {
    let app = create_test_app();
    send(&app, "PUT", "/cache", Some(json!({"key": "gone", "value": 1}))).await;

    let (status, _) = send(&app, "DELETE", "/cache/gone", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "DELETE", "/cache/gone", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "GET", "/cache/gone", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ttl_expiry_through_api() {
    let clock = Arc::new(ManualClock::new(1_000));
    let app = create_router(AppState::with_clock(&Config::default(), clock.clone()));

    send(
        &app,
        "PUT",
        "/cache",
        Some(json!({"key": "session", "value": "abc", "ttlMs": 500})),
    )
    .await;

    let (status, _) = send(&app, "GET", "/cache/session", None).await;
    assert_eq!(status, StatusCode::OK);

    clock.advance(Duration::from_millis(501));

    let (status, _) = send(&app, "GET", "/cache/session", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, metrics) = send(&app, "GET", "/cache/metrics", None).await;
    assert_eq!(metrics["expirations"], 1);
    assert_eq!(metrics["entryCount"], 0);
}

#[tokio::test]
async fn test_tag_endpoints() {
    let app = create_test_app();
    for (key, tags) in [("a", vec!["users"]), ("b", vec!["users", "hot"]), ("c", vec![])] {
        send(
            &app,
            "PUT",
            "/cache",
            Some(json!({"key": key, "value": key, "tags": tags})),
        )
        .await;
    }

    let (status, body) = send(&app, "GET", "/cache/tags/users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entries"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, "DELETE", "/cache/tags/users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"], 2);

    let (status, _) = send(&app, "GET", "/cache/c", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", "/cache/a", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_cache_metrics_endpoint() {
    let app = create_test_app();
    send(&app, "PUT", "/cache", Some(json!({"key": "k", "value": 1}))).await;
    send(&app, "GET", "/cache/k", None).await;
    send(&app, "GET", "/cache/nope", None).await;

    let (status, body) = send(&app, "GET", "/cache/metrics", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["entryCount"], 1);
    assert_eq!(body["hits"], 1);
    assert_eq!(body["misses"], 1);
    assert_eq!(body["hitRate"], 0.5);
}

#[tokio::test]
async fn test_export_import_roundtrip() {
    let source = create_test_app();
    send(&source, "PUT", "/cache", Some(json!({"key": "x", "value": [1, 2, 3]}))).await;
    send(
        &source,
        "PUT",
        "/cache",
        Some(json!({"key": "y", "value": {"nested": true}, "tags": ["t"]})),
    )
    .await;

    let (status, snapshot) = send(&source, "GET", "/cache/export", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["metadata"]["entryCount"], 2);

    let target = create_test_app();
    send(&target, "PUT", "/cache", Some(json!({"key": "stale", "value": 0}))).await;

    let (status, body) = send(&target, "POST", "/cache/import", Some(snapshot)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["imported"], 2);

    let (_, body) = send(&target, "GET", "/cache/x", None).await;
    assert_eq!(body["value"], json!([1, 2, 3]));
    let (status, _) = send(&target, "GET", "/cache/stale", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_import_merge_keeps_existing() {
    let source = create_test_app();
    send(&source, "PUT", "/cache", Some(json!({"key": "x", "value": 1}))).await;
    let (_, snapshot) = send(&source, "GET", "/cache/export", None).await;

    let target = create_test_app();
    send(&target, "PUT", "/cache", Some(json!({"key": "kept", "value": 0}))).await;

    let (status, _) = send(&target, "POST", "/cache/import?merge=true", Some(snapshot)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&target, "GET", "/cache/kept", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&target, "GET", "/cache/x", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_malformed_import_returns_400() {
    let app = create_test_app();
    send(&app, "PUT", "/cache", Some(json!({"key": "kept", "value": 0}))).await;

    let (status, _) = send(&app, "POST", "/cache/import", Some(json!({"entries": 5}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // A rejected import leaves the cache untouched
    let (status, _) = send(&app, "GET", "/cache/kept", None).await;
    assert_eq!(status, StatusCode::OK);
}

// == Queue Endpoint Tests ==

#[tokio::test]
async fn test_enqueue_inspect_and_cancel() {
    let app = create_test_app();

    let (status, body) = send(
        &app,
        "POST",
        "/queue",
        Some(json!({"kind": "background", "payload": {"job": 1}, "priority": "high"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    let id = body["id"].as_str().unwrap().to_string();

    let (status, op) = send(&app, "GET", &format!("/queue/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(op["kind"], "background");
    assert_eq!(op["priority"], "high");
    assert_eq!(op["status"], "pending");

    let (_, listed) = send(&app, "GET", "/queue?kind=background", None).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
    let (_, listed) = send(&app, "GET", "/queue?kind=transport", None).await;
    assert!(listed.as_array().unwrap().is_empty());

    let (status, _) = send(&app, "DELETE", &format!("/queue/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "GET", &format!("/queue/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_enqueue_zero_attempts_returns_400() {
    let app = create_test_app();

    let (status, _) = send(
        &app,
        "POST",
        "/queue",
        Some(json!({"kind": "background", "maxAttempts": 0})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_enqueue_with_maximum_expiry_is_accepted() {
    let app = create_test_app();

    let (status, body) = send(
        &app,
        "POST",
        "/queue",
        Some(json!({"kind": "background", "expiresInMs": u64::MAX})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let id = body["id"].as_str().unwrap();
    let (status, op) = send(&app, "GET", &format!("/queue/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(op["expiresAt"], json!(u64::MAX));
}

#[tokio::test]
async fn test_enqueue_unknown_kind_is_rejected() {
    let app = create_test_app();

    let (status, _) = send(&app, "POST", "/queue", Some(json!({"kind": "carrier-pigeon"}))).await;

    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_queue_metrics_endpoint() {
    let app = create_test_app();
    for _ in 0..3 {
        send(&app, "POST", "/queue", Some(json!({"kind": "background"}))).await;
    }

    let (status, body) = send(&app, "GET", "/queue/metrics", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalMessages"], 3);
    assert_eq!(body["pendingMessages"], 3);
    assert_eq!(body["queueSize"], 3);
    assert_eq!(body["successRate"], 0.0);
}

#[tokio::test]
async fn test_reconnect_dispatches_storage_operations() {
    let app = create_test_app();

    let (status, body) = send(&app, "PUT", "/network", Some(json!({"online": false}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"]["online"], false);

    send(
        &app,
        "POST",
        "/queue",
        Some(json!({"kind": "storage", "payload": {"key": "draft", "value": "offline edit"}})),
    )
    .await;

    let (_, health) = send(&app, "GET", "/health", None).await;
    assert_eq!(health["online"], false);

    let (status, body) = send(
        &app,
        "PUT",
        "/network",
        Some(json!({"online": true, "connectionType": "wifi"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tick"]["completed"], 1);

    let (_, value) = send(&app, "GET", "/cache/draft", None).await;
    assert_eq!(value["value"], "offline edit");

    let (_, metrics) = send(&app, "GET", "/queue/metrics", None).await;
    assert_eq!(metrics["completedMessages"], 1);
    assert_eq!(metrics["queueSize"], 0);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app();

    let (status, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["online"], true);
    assert!(body.get("timestamp").is_some());
}
