//! What happened to one dispatched `FileEvent` (spec.md §4.7).

/// Result of routing a single `FileEvent` through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Delivered to the remote store (immediate path) or buffered without
    /// crossing a flush threshold (batch path).
    Success,
    /// Buffered and later flushed as part of a batch.
    Batched,
    /// Delivery failed and the record was persisted to the offline queue.
    Queued,
    /// Observable but non-retriable at this layer: `file_not_found` or
    /// `parse_error`. Carries the failure kind (spec.md §4.7's taxonomy).
    NonFatal(&'static str),
}
