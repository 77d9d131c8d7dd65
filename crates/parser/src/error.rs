use std::path::PathBuf;
use thiserror::Error;

/// Parser failure kinds (spec.md §4.3, §7). The `Display` of each variant
/// is the exact "kind" string the Dispatcher and operator-facing logs use.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("file_not_found")]
    FileNotFound { path: PathBuf },
    #[error("decode_error: {detail}")]
    DecodeError { detail: String },
    #[error("encoding_error: {detail}")]
    EncodingError { detail: String },
    #[error("schema_error: {detail}")]
    SchemaError { detail: String },
    #[error("internal: {detail}")]
    Internal { detail: String },
}

impl ParseError {
    /// The bare kind string, independent of the detail payload.
    pub fn kind(&self) -> &'static str {
        match self {
            ParseError::FileNotFound { .. } => "file_not_found",
            ParseError::DecodeError { .. } => "decode_error",
            ParseError::EncodingError { .. } => "encoding_error",
            ParseError::SchemaError { .. } => "schema_error",
            ParseError::Internal { .. } => "internal",
        }
    }
}
