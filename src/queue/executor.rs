//! Executor seam between the queue and the caller's transport/storage code

use std::future::Future;

use async_trait::async_trait;
use serde_json::Value;

use super::operation::QueuedOperation;
use crate::error::Error;

/// Failure reported by an executor.
///
/// `retryable` failures are rescheduled with backoff until the attempt
/// budget runs out. Non-retryable ones fail the operation immediately.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ExecutionError {
    pub message: String,
    pub retryable: bool,
}

impl ExecutionError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

impl From<ExecutionError> for Error {
    fn from(err: ExecutionError) -> Self {
        if err.retryable {
            Error::TransientExecution(err.message)
        } else {
            Error::TerminalExecution(err.message)
        }
    }
}

/// Runs operations of one kind.
///
/// Timeouts are the executor's concern; the queue waits for every call to
/// return.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(&self, operation: &QueuedOperation) -> Result<Value, ExecutionError>;

    /// Whether `execute_batch` sends several same-target operations in one call.
    fn supports_batching(&self) -> bool {
        false
    }

    /// Sends `operations` (all sharing one target) as a single call.
    async fn execute_batch(&self, operations: &[QueuedOperation]) -> Result<Value, ExecutionError> {
        let _ = operations;
        Err(ExecutionError::transient("batch dispatch not supported"))
    }
}

// == Closure Adapter ==
/// Wraps an async closure as an `Executor`.
///
/// ```ignore
/// let executor = FnExecutor::new(|op: QueuedOperation| async move {
///     send(op.payload).await.map_err(|e| ExecutionError::transient(e.to_string()))
/// });
/// ```
pub struct FnExecutor<F> {
    f: F,
}

impl<F> FnExecutor<F> {
    pub fn new<Fut>(f: F) -> Self
    where
        F: Fn(QueuedOperation) -> Fut + Send + Sync,
        Fut: Future<Output = Result<Value, ExecutionError>> + Send,
    {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Executor for FnExecutor<F>
where
    F: Fn(QueuedOperation) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, ExecutionError>> + Send,
{
    async fn execute(&self, operation: &QueuedOperation) -> Result<Value, ExecutionError> {
        (self.f)(operation.clone()).await
    }
}
