use thiserror::Error;

/// Outcome of an `upsert` call, distinguishing rate-limiting from other
/// recoverable failures so the Dispatcher can react differently (spec.md §4.6).
#[derive(Debug, Error)]
pub enum UpsertError {
    #[error("rate limited")]
    RateLimit { retry_after: Option<u64> },
    #[error("client error {status}: {body}")]
    ClientError { status: u16, body: String },
}

/// A transport-level or server-level failure. Carries enough detail for the
/// caller to decide whether to retry.
#[derive(Debug, Clone, PartialEq)]
pub struct UpsertResult {
    pub success: bool,
    pub count: usize,
    pub error: Option<String>,
}

impl UpsertResult {
    pub fn success(count: usize) -> Self {
        Self { success: true, count, error: None }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self { success: false, count: 0, error: Some(error.into()) }
    }
}
