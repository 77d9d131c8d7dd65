//! The aggregated (single-row) record: one row representing an entire file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Normalised table-type classification (spec.md §4.3 step 4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableType {
    FeatureTable,
    MainTable,
    FinalTable,
    SideTable,
    #[default]
    Unknown,
}

impl TableType {
    /// Normalise a free-form string (case-insensitive, PokerGFX or
    /// human-readable spellings) into one of the fixed variants.
    pub fn normalise(raw: &str) -> Self {
        let key: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        match key.as_str() {
            "FEATURETABLE" => TableType::FeatureTable,
            "MAINTABLE" => TableType::MainTable,
            "FINALTABLE" => TableType::FinalTable,
            "SIDETABLE" => TableType::SideTable,
            _ => TableType::Unknown,
        }
    }
}

/// The single-row variant produced for a whole file (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatedRecord {
    pub session_id: Option<String>,
    pub file_hash: String,
    pub file_name: String,
    pub nas_path: String,
    pub table_type: TableType,
    pub event_title: Option<String>,
    pub software_version: Option<String>,
    pub hand_count: Option<u32>,
    pub player_count: Option<u32>,
    pub payouts: Option<Vec<i64>>,
    pub raw_json: Value,
    pub sync_source: String,
    pub gfx_pc_id: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalise_is_case_insensitive_and_ignores_punctuation() {
        assert_eq!(TableType::normalise("feature_table"), TableType::FeatureTable);
        assert_eq!(TableType::normalise("Feature Table"), TableType::FeatureTable);
        assert_eq!(TableType::normalise("MAIN-TABLE"), TableType::MainTable);
        assert_eq!(TableType::normalise("finalTable"), TableType::FinalTable);
        assert_eq!(TableType::normalise("sidetable"), TableType::SideTable);
    }

    #[test]
    fn normalise_defaults_to_unknown() {
        assert_eq!(TableType::normalise("banana"), TableType::Unknown);
        assert_eq!(TableType::normalise(""), TableType::Unknown);
    }
}
