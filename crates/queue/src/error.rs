use thiserror::Error;

/// Failures from the durable offline queue. An I/O error on any operation
/// propagates up and aborts the current dispatch (spec.md §7); statement-level
/// atomicity of the embedded store means no partial state is ever visible.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serialisation error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("no such pending row: {0}")]
    PendingRowNotFound(i64),
    #[error("no such dead-letter row: {0}")]
    DeadLetterRowNotFound(i64),
}
