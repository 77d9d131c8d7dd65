//! Normalised-variant parse pipeline (spec.md §4.3): turns `Hands[]` into
//! the five related record kinds, deduplicating players by `player_hash`.

use crate::error::ParseError;
use crate::hash::{file_hash, player_hash};
use crate::lookup::{lookup, lookup_array, lookup_f64, lookup_i64, lookup_str};
use crate::duration::parse_iso8601_duration_secs;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use ts_core::{ActionEvent, Hand, HandPlayer, NormalisedData, Player, PlayerId, Session};

const SESSION_ID_CANDIDATES: &[&str] = &["ID", "session_id", "session.id", "id"];
const EVENT_TITLE_CANDIDATES: &[&str] =
    &["EventTitle", "event_title", "session.event_title", "session.EventTitle"];
const SOFTWARE_VERSION_CANDIDATES: &[&str] = &[
    "SoftwareVersion",
    "software_version",
    "session.software_version",
    "session.SoftwareVersion",
];
const HANDS_CANDIDATES: &[&str] = &["Hands", "hands"];
const HAND_PLAYERS_CANDIDATES: &[&str] = &["Players", "players"];
const EVENTS_CANDIDATES: &[&str] = &["Events", "events"];
const PLAYER_NAME_CANDIDATES: &[&str] = &["Name", "name"];
const PLAYER_LONG_NAME_CANDIDATES: &[&str] = &["LongName", "long_name"];

/// Parses a file's raw bytes into the multi-row normalised record set.
pub fn parse_normalised(
    bytes: &[u8],
    file_name: &str,
    producer_id: &str,
) -> Result<NormalisedData, ParseError> {
    let file_hash = file_hash(bytes);

    let text = std::str::from_utf8(bytes).map_err(|e| ParseError::EncodingError {
        detail: e.to_string(),
    })?;
    let doc: Value = serde_json::from_str(text).map_err(|e| ParseError::DecodeError {
        detail: e.to_string(),
    })?;

    let session_id = lookup_str(&doc, SESSION_ID_CANDIDATES).ok_or_else(|| ParseError::SchemaError {
        detail: "missing session_id".to_string(),
    })?;

    let session = Session {
        session_id: session_id.clone(),
        file_hash,
        file_name: file_name.to_string(),
        nas_path: format!("/nas/{}/{}", producer_id, file_name),
        event_title: lookup_str(&doc, EVENT_TITLE_CANDIDATES),
        software_version: lookup_str(&doc, SOFTWARE_VERSION_CANDIDATES),
        raw_json: doc.clone(),
        created_at: Utc::now(),
    };

    let mut data = NormalisedData {
        session: Some(session),
        ..Default::default()
    };

    let mut player_cache: HashMap<String, PlayerId> = HashMap::new();

    let Some(hands) = lookup_array(&doc, HANDS_CANDIDATES) else {
        return Ok(data);
    };

    for hand_json in hands {
        let hand = build_hand(hand_json, &session_id);
        let hand_id = hand.local_id();
        data.hands.push(hand);

        if let Some(players) = lookup_array(hand_json, HAND_PLAYERS_CANDIDATES) {
            for player_json in players {
                let hand_player = build_hand_player(player_json, &hand_id, &mut player_cache, &mut data.players);
                data.hand_players.push(hand_player);
            }
        }

        if let Some(events) = lookup_array(hand_json, EVENTS_CANDIDATES) {
            for (order, event_json) in events.iter().enumerate() {
                data.events.push(build_event(event_json, &hand_id, order as u32));
            }
        }
    }

    Ok(data)
}

fn build_hand(hand_json: &Value, session_id: &str) -> Hand {
    let blinds = lookup(hand_json, &["FlopDrawBlinds", "flop_draw_blinds"])
        .cloned()
        .unwrap_or(Value::Null);
    let small_blind = lookup_i64(&blinds, &["SmallBlind", "small_blind"]);
    let big_blind = lookup_i64(&blinds, &["BigBlind", "big_blind"]);

    let player_count = lookup_array(hand_json, HAND_PLAYERS_CANDIDATES)
        .map(|p| p.len() as u32)
        .unwrap_or(0);

    Hand {
        session_id: session_id.to_string(),
        hand_num: lookup_i64(hand_json, &["HandNum", "hand_num"]).unwrap_or(0) as u32,
        game_variant: lookup_str(hand_json, &["GameVariant", "game_variant"]),
        game_class: lookup_str(hand_json, &["GameClass", "game_class"]),
        bet_structure: lookup_str(hand_json, &["BetStructure", "bet_structure"]),
        duration_secs: lookup_str(hand_json, &["Duration", "duration"])
            .and_then(|s| parse_iso8601_duration_secs(&s)),
        recording_offset_start_secs: lookup_str(hand_json, &["RecordingOffsetStart", "recording_offset_start"])
            .and_then(|s| parse_iso8601_duration_secs(&s)),
        start_date_time_utc: lookup_str(hand_json, &["StartDateTimeUTC", "start_date_time_utc"])
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        blinds,
        small_blind,
        big_blind,
        ante_amt: lookup_i64(hand_json, &["AnteAmt", "ante_amt"]),
        bomb_pot_amt: lookup_i64(hand_json, &["BombPotAmt", "bomb_pot_amt"]),
        player_count,
    }
}

fn build_hand_player(
    player_json: &Value,
    hand_id: &str,
    cache: &mut HashMap<String, PlayerId>,
    players: &mut Vec<Player>,
) -> HandPlayer {
    let name = lookup_str(player_json, PLAYER_NAME_CANDIDATES);
    let long_name = lookup_str(player_json, PLAYER_LONG_NAME_CANDIDATES);
    let hash = player_hash(name.as_deref().unwrap_or(""), long_name.as_deref().unwrap_or(""));

    let player_id = cache
        .entry(hash.clone())
        .or_insert_with(|| {
            let id = PlayerId::new(hash.clone());
            players.push(Player {
                id: id.clone(),
                player_hash: hash.clone(),
                name: name.clone(),
                long_name: long_name.clone(),
            });
            id
        })
        .clone();

    let hole_cards = lookup_str(player_json, &["HoleCards", "hole_cards"])
        .map(|s| s.split_whitespace().map(str::to_string).filter(|s| !s.is_empty()).collect())
        .unwrap_or_default();

    HandPlayer {
        hand_id: hand_id.to_string(),
        player_id,
        seat_num: lookup_i64(player_json, &["PlayerNum", "player_num"]).unwrap_or(0) as i32,
        hole_cards,
        stack: lookup_f64(player_json, &["Stack", "stack"]),
        winnings: lookup_f64(player_json, &["Winnings", "winnings"]),
        vpip_pct: lookup_f64(player_json, &["VPIP", "vpip_pct"]),
        pfr_pct: lookup_f64(player_json, &["PFR", "pfr_pct"]),
        aggression_pct: lookup_f64(player_json, &["Aggression", "aggression_pct"]),
        showdown_pct: lookup_f64(player_json, &["Showdown", "showdown_pct"]),
        sitting_out: crate::lookup::lookup_bool(player_json, &["SittingOut", "sitting_out"]).unwrap_or(false),
        is_winner: crate::lookup::lookup_bool(player_json, &["IsWinner", "is_winner"]).unwrap_or(false),
        elimination_rank: lookup_i64(player_json, &["EliminationRank", "elimination_rank"]).unwrap_or(-1) as i32,
    }
}

fn build_event(event_json: &Value, hand_id: &str, order: u32) -> ActionEvent {
    let event_type = lookup_str(event_json, &["EventType", "event_type"])
        .map(|raw| match raw.as_str() {
            "ALL IN" => "ALL_IN".to_string(),
            "BOARD CARD" => "BOARD_CARD".to_string(),
            other => other.to_string(),
        })
        .unwrap_or_default();

    let board_cards = lookup_array(event_json, &["BoardCards", "board_cards"])
        .and_then(|arr| arr.first())
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .or_else(|| lookup_str(event_json, &["BoardCards", "board_cards"]));

    ActionEvent {
        hand_id: hand_id.to_string(),
        event_order: order,
        event_type,
        player_num: lookup_i64(event_json, &["PlayerNum", "player_num"]).map(|n| n as i32),
        bet_amt: lookup_f64(event_json, &["BetAmt", "bet_amt"]),
        pot: lookup_f64(event_json, &["Pot", "pot"]),
        board_num: lookup_i64(event_json, &["BoardNum", "board_num"]).map(|n| n as i32),
        num_cards_drawn: lookup_i64(event_json, &["NumCardsDrawn", "num_cards_drawn"]).map(|n| n as i32),
        date_time_utc: lookup_str(event_json, &["DateTimeUTC", "date_time_utc"])
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        board_cards,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bytes_of(v: &Value) -> Vec<u8> {
        serde_json::to_vec(v).unwrap()
    }

    #[test]
    fn builds_session_hands_players_and_events() {
        let doc = json!({
            "ID": 1,
            "EventTitle": "T",
            "Hands": [
                {
                    "HandNum": 1,
                    "GameVariant": "NLHE",
                    "Duration": "PT1M30S",
                    "StartDateTimeUTC": "2026-01-01T00:00:00Z",
                    "FlopDrawBlinds": {"SmallBlind": 1, "BigBlind": 2},
                    "Players": [
                        {"Name": "Alice", "PlayerNum": 1, "HoleCards": "Ah Kd"},
                        {"Name": "Bob", "PlayerNum": 2}
                    ],
                    "Events": [
                        {"EventType": "ALL IN", "PlayerNum": 1},
                        {"EventType": "BOARD CARD", "BoardCards": ["Qs"]}
                    ]
                }
            ]
        });
        let data = parse_normalised(&bytes_of(&doc), "a.json", "PC01").unwrap();
        assert_eq!(data.session.as_ref().unwrap().session_id, "1");
        assert_eq!(data.hands.len(), 1);
        assert_eq!(data.hands[0].small_blind, Some(1));
        assert_eq!(data.hands[0].big_blind, Some(2));
        assert_eq!(data.hands[0].duration_secs, Some(90));
        assert_eq!(data.players.len(), 2);
        assert_eq!(data.hand_players.len(), 2);
        assert_eq!(data.hand_players[0].hole_cards, vec!["Ah", "Kd"]);
        assert_eq!(data.events.len(), 2);
        assert_eq!(data.events[0].event_type, "ALL_IN");
        assert_eq!(data.events[1].event_type, "BOARD_CARD");
        assert_eq!(data.events[1].board_cards.as_deref(), Some("Qs"));
        assert_eq!(data.events[0].event_order, 0);
        assert_eq!(data.events[1].event_order, 1);
    }

    #[test]
    fn deduplicates_players_by_hash_across_hands() {
        let doc = json!({
            "ID": 1,
            "Hands": [
                {"HandNum": 1, "Players": [{"Name": "Alice", "PlayerNum": 1}]},
                {"HandNum": 2, "Players": [{"Name": "Alice", "PlayerNum": 1}]}
            ]
        });
        let data = parse_normalised(&bytes_of(&doc), "a.json", "PC01").unwrap();
        assert_eq!(data.players.len(), 1);
        assert_eq!(data.hand_players.len(), 2);
        assert_eq!(data.hand_players[0].player_id, data.hand_players[1].player_id);
    }

    #[test]
    fn missing_session_id_is_schema_error() {
        let doc = json!({"Hands": []});
        let err = parse_normalised(&bytes_of(&doc), "a.json", "PC01").unwrap_err();
        assert_eq!(err.kind(), "schema_error");
    }

    #[test]
    fn missing_hands_yields_session_only() {
        let doc = json!({"ID": 1});
        let data = parse_normalised(&bytes_of(&doc), "a.json", "PC01").unwrap();
        assert!(data.session.is_some());
        assert!(data.hands.is_empty());
    }
}
