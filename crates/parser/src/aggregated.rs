//! Aggregated-variant parse pipeline (spec.md §4.3, steps 1-9): turns a
//! whole file into a single `AggregatedRecord`.

use crate::error::ParseError;
use crate::hash::file_hash;
use crate::lookup::{lookup_array, lookup_i64, lookup_str};
use chrono::Utc;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::LazyLock;
use ts_core::{AggregatedRecord, TableType};

const SESSION_ID_CANDIDATES: &[&str] = &["ID", "session_id", "session.id", "id"];
const TABLE_TYPE_CANDIDATES: &[&str] =
    &["Type", "TableType", "table_type", "session.type", "session.table_type"];
const EVENT_TITLE_CANDIDATES: &[&str] =
    &["EventTitle", "event_title", "session.event_title", "session.EventTitle"];
const SOFTWARE_VERSION_CANDIDATES: &[&str] = &[
    "SoftwareVersion",
    "software_version",
    "session.software_version",
    "session.SoftwareVersion",
];
const HANDS_CANDIDATES: &[&str] = &["Hands", "hands"];
const HAND_COUNT_CANDIDATES: &[&str] = &["hand_count", "handCount"];
const PAYOUTS_CANDIDATES: &[&str] = &["Payouts", "payouts"];
const PLAYERS_IN_HAND_CANDIDATES: &[&str] = &["Players", "players"];
const PLAYER_NAME_CANDIDATES: &[&str] = &["Name", "name"];
const PLAYER_NUM_CANDIDATES: &[&str] = &["PlayerNum", "player_num"];

// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static GAME_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"GameID=(\d+)").expect("constant regex pattern is valid"));

/// Parses a file's raw bytes into the single-row aggregated record.
pub fn parse_aggregated(
    bytes: &[u8],
    file_name: &str,
    producer_id: &str,
) -> Result<AggregatedRecord, ParseError> {
    let file_hash = file_hash(bytes);

    let text = std::str::from_utf8(bytes).map_err(|e| ParseError::EncodingError {
        detail: e.to_string(),
    })?;
    let doc: Value = serde_json::from_str(text).map_err(|e| ParseError::DecodeError {
        detail: e.to_string(),
    })?;

    let session_id = lookup_str(&doc, SESSION_ID_CANDIDATES).or_else(|| {
        GAME_ID_PATTERN
            .captures(file_name)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    });

    let table_type = lookup_str(&doc, TABLE_TYPE_CANDIDATES)
        .map(|raw| TableType::normalise(&raw))
        .unwrap_or_default();

    let event_title = lookup_str(&doc, EVENT_TITLE_CANDIDATES);
    let software_version = lookup_str(&doc, SOFTWARE_VERSION_CANDIDATES);

    let hand_count = lookup_array(&doc, HANDS_CANDIDATES)
        .map(|hands| hands.len() as u32)
        .or_else(|| lookup_i64(&doc, HAND_COUNT_CANDIDATES).map(|n| n as u32))
        .or(Some(0));

    let player_count = count_unique_players(&doc);

    let payouts = lookup_array(&doc, PAYOUTS_CANDIDATES).map(|arr| {
        arr.iter()
            .filter_map(|v| v.as_i64().or_else(|| v.as_f64().map(|f| f as i64)))
            .collect::<Vec<_>>()
    });

    Ok(AggregatedRecord {
        session_id,
        file_hash,
        file_name: file_name.to_string(),
        nas_path: format!("/nas/{}/{}", producer_id, file_name),
        table_type,
        event_title,
        software_version,
        hand_count,
        player_count,
        payouts,
        raw_json: doc,
        sync_source: "tablesync".to_string(),
        gfx_pc_id: producer_id.to_string(),
        created_at: Utc::now(),
    })
}

fn count_unique_players(doc: &Value) -> Option<u32> {
    let hands = lookup_array(doc, HANDS_CANDIDATES)?;
    let mut seen = HashSet::new();
    for hand in hands {
        let Some(players) = lookup_array(hand, PLAYERS_IN_HAND_CANDIDATES) else {
            continue;
        };
        for player in players {
            if let Some(name) = lookup_str(player, PLAYER_NAME_CANDIDATES) {
                seen.insert(name);
            } else if let Some(num) = lookup_str(player, PLAYER_NUM_CANDIDATES) {
                seen.insert(num);
            }
        }
    }
    Some(seen.len() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bytes_of(v: &Value) -> Vec<u8> {
        serde_json::to_vec(v).unwrap()
    }

    #[test]
    fn happy_path_extracts_all_fields() {
        let doc = json!({
            "ID": 1,
            "Type": "FEATURE_TABLE",
            "EventTitle": "T",
            "Hands": [{"HandNum": 1, "Players": [{"Name": "Alice"}, {"Name": "Bob"}]}],
        });
        let record = parse_aggregated(&bytes_of(&doc), "a.json", "PC01").unwrap();
        assert_eq!(record.session_id.as_deref(), Some("1"));
        assert_eq!(record.table_type, TableType::FeatureTable);
        assert_eq!(record.event_title.as_deref(), Some("T"));
        assert_eq!(record.hand_count, Some(1));
        assert_eq!(record.player_count, Some(2));
        assert_eq!(record.nas_path, "/nas/PC01/a.json");
        assert_eq!(record.file_name, "a.json");
    }

    #[test]
    fn session_id_falls_back_to_filename_game_id() {
        let doc = json!({"Type": "MAIN_TABLE"});
        let record = parse_aggregated(&bytes_of(&doc), "GameID=42.json", "PC01").unwrap();
        assert_eq!(record.session_id.as_deref(), Some("42"));
    }

    #[test]
    fn session_id_is_null_when_nothing_matches() {
        let doc = json!({});
        let record = parse_aggregated(&bytes_of(&doc), "mystery.json", "PC01").unwrap();
        assert_eq!(record.session_id, None);
        assert_eq!(record.table_type, TableType::Unknown);
    }

    #[test]
    fn hand_count_falls_back_to_scalar_field() {
        let doc = json!({"handCount": 7});
        let record = parse_aggregated(&bytes_of(&doc), "a.json", "PC01").unwrap();
        assert_eq!(record.hand_count, Some(7));
    }

    #[test]
    fn malformed_json_is_decode_error() {
        let err = parse_aggregated(b"{not json", "bad.json", "PC01").unwrap_err();
        assert_eq!(err.kind(), "decode_error");
    }

    #[test]
    fn non_utf8_bytes_is_encoding_error() {
        let err = parse_aggregated(&[0xff, 0xfe, 0xfd], "bad.json", "PC01").unwrap_err();
        assert_eq!(err.kind(), "encoding_error");
    }

    #[test]
    fn payouts_coerced_to_integers() {
        let doc = json!({"Payouts": [100, 50.7, 25]});
        let record = parse_aggregated(&bytes_of(&doc), "a.json", "PC01").unwrap();
        assert_eq!(record.payouts, Some(vec![100, 50, 25]));
    }
}
