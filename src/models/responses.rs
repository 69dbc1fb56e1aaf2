//! Response DTOs for the inspection API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::network::NetworkStatus;
use crate::queue::TickReport;

/// Response body for GET /cache/:key
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub key: String,
    pub value: Value,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for PUT /cache
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    pub key: String,
}

impl SetResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }
}

/// Response body for DELETE /cache/:key
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub message: String,
    pub key: String,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' deleted successfully", key),
            key,
        }
    }
}

/// One value returned by GET /cache/tags/:tag
#[derive(Debug, Clone, Serialize)]
pub struct TaggedValue {
    pub key: String,
    pub value: Value,
}

/// Response body for GET /cache/tags/:tag
#[derive(Debug, Clone, Serialize)]
pub struct TagResponse {
    pub tag: String,
    pub entries: Vec<TaggedValue>,
}

impl TagResponse {
    pub fn new(tag: impl Into<String>, entries: Vec<(String, Value)>) -> Self {
        Self {
            tag: tag.into(),
            entries: entries
                .into_iter()
                .map(|(key, value)| TaggedValue { key, value })
                .collect(),
        }
    }
}

/// Response body for DELETE /cache/tags/:tag
#[derive(Debug, Clone, Serialize)]
pub struct TagDeleteResponse {
    pub tag: String,
    pub deleted: usize,
}

/// Response body for POST /cache/import
#[derive(Debug, Clone, Serialize)]
pub struct ImportResponse {
    pub imported: usize,
}

/// Response body for POST /queue
#[derive(Debug, Clone, Serialize)]
pub struct EnqueueResponse {
    pub id: String,
}

/// Response body for DELETE /queue/:id
#[derive(Debug, Clone, Serialize)]
pub struct DequeueResponse {
    pub message: String,
    pub id: String,
}

impl DequeueResponse {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            message: format!("Operation '{}' cancelled", id),
            id,
        }
    }
}

/// Response body for PUT /network
#[derive(Debug, Clone, Serialize)]
pub struct NetworkResponse {
    pub status: NetworkStatus,
    /// Present when the change brought the queue back online
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tick: Option<TickReport>,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    pub online: bool,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(online: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            online,
        }
    }
}
