//! Tunables the Dispatcher needs that the Agent otherwise owns (spec.md §6).

use std::path::PathBuf;
use std::time::Duration;

/// Which record shape the Parser should produce for every file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordMode {
    Aggregated,
    Normalised,
}

#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub mode: RecordMode,
    /// Target table for aggregated upserts (`remote table` in spec.md §6).
    pub table: String,
    pub error_dir: PathBuf,
    pub rate_limit_max_retries: u32,
    pub rate_limit_base_delay: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            mode: RecordMode::Aggregated,
            table: "gfx_sessions".to_string(),
            error_dir: PathBuf::from("_error"),
            rate_limit_max_retries: 3,
            rate_limit_base_delay: Duration::from_millis(100),
        }
    }
}
