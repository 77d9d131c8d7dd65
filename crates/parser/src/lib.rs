// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Decodes a producer's JSON file into either an aggregated row or a
//! normalised record set (spec.md §4.3).

mod aggregated;
mod duration;
mod error;
mod hash;
mod lookup;
mod normalised;

pub use aggregated::parse_aggregated;
pub use error::ParseError;
pub use normalised::parse_normalised;

use std::path::Path;
use ts_core::{AggregatedRecord, NormalisedData};

/// Reads `path` from disk and parses it as the aggregated variant.
/// Surfaces `file_not_found` distinctly so the caller can skip
/// quarantine (spec.md §4.7 step 1).
pub fn parse_aggregated_file(path: &Path, producer_id: &str) -> Result<AggregatedRecord, ParseError> {
    let bytes = read_file(path)?;
    let file_name = file_name_of(path);
    parse_aggregated(&bytes, &file_name, producer_id)
}

/// Reads `path` from disk and parses it as the normalised variant.
pub fn parse_normalised_file(path: &Path, producer_id: &str) -> Result<NormalisedData, ParseError> {
    let bytes = read_file(path)?;
    let file_name = file_name_of(path);
    parse_normalised(&bytes, &file_name, producer_id)
}

fn read_file(path: &Path) -> Result<Vec<u8>, ParseError> {
    std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ParseError::FileNotFound { path: path.to_path_buf() }
        } else {
            ParseError::Internal { detail: e.to_string() }
        }
    })
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_aggregated_file_reports_file_not_found() {
        let err = parse_aggregated_file(Path::new("/nonexistent/path/a.json"), "PC01").unwrap_err();
        assert_eq!(err.kind(), "file_not_found");
    }

    #[test]
    fn parse_aggregated_file_reads_and_parses() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(br#"{"ID": 5}"#).unwrap();
        let record = parse_aggregated_file(tmp.path(), "PC01").unwrap();
        assert_eq!(record.session_id.as_deref(), Some("5"));
    }
}
