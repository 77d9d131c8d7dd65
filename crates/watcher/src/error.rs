use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatcherError {
    #[error("invalid file pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}
