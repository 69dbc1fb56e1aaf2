//! Request DTOs for the inspection API
//!
//! Defines the structure of incoming HTTP request bodies and query strings.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;

use crate::cache::WriteOptions;
use crate::priority::Priority;
use crate::queue::{EnqueueOptions, OperationKind, Target};

/// Maximum accepted key length
pub const MAX_KEY_LENGTH: usize = 256;

/// Request body for PUT /cache
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetRequest {
    pub key: String,
    /// Any JSON value
    pub value: Value,
    /// Optional TTL in milliseconds (uses the cache default if not specified)
    #[serde(default)]
    pub ttl_ms: Option<u64>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Force compression regardless of size
    #[serde(default)]
    pub compress: bool,
}

impl SetRequest {
    /// Validates the request data
    ///
    /// Returns an error message if validation fails, None if valid.
    pub fn validate(&self) -> Option<String> {
        if self.key.is_empty() {
            return Some("Key cannot be empty".to_string());
        }
        if self.key.len() > MAX_KEY_LENGTH {
            return Some(format!(
                "Key exceeds maximum length of {} characters",
                MAX_KEY_LENGTH
            ));
        }
        None
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            ttl: self.ttl_ms.map(Duration::from_millis),
            priority: self.priority,
            tags: self.tags.clone(),
            force_compression: self.compress,
        }
    }
}

/// Query string for POST /cache/import
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportQuery {
    #[serde(default)]
    pub merge: bool,
}

/// Request body for POST /queue
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueRequest {
    pub kind: OperationKind,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub max_attempts: Option<u32>,
    /// Expiry in milliseconds from now
    #[serde(default)]
    pub expires_in_ms: Option<u64>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub target: Option<Target>,
}

impl EnqueueRequest {
    pub fn options(&self) -> EnqueueOptions {
        EnqueueOptions {
            priority: self.priority,
            max_attempts: self.max_attempts,
            expires_in: self.expires_in_ms.map(Duration::from_millis),
            depends_on: self.depends_on.clone(),
            metadata: self.metadata.clone(),
            target: self.target.clone(),
        }
    }
}
