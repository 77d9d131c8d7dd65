//! Saves a normalised record set in FK-safe order (spec.md §4.8).

use serde_json::{json, Value};
use std::collections::HashMap;
use ts_core::NormalisedData;
use ts_remote::RemoteClient;

/// One upsert step of the unit of work, in write order.
struct Step {
    table: &'static str,
    on_conflict: &'static str,
    records: Vec<Value>,
}

/// Outcome of committing a `NormalisedData` set: per-table row counts and,
/// on the first failing step, its detail. Later steps are still attempted
/// so partial progress is visible, but `success` is false once any step
/// fails.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitOfWorkResult {
    pub success: bool,
    pub rows_written: HashMap<String, usize>,
    pub first_error: Option<String>,
}

/// Writes `players → session → hands → hand_players → events`, each as an
/// upsert keyed per spec.md §3. Order matters: downstream rows reference
/// upstream ones by the keys chosen, so reversing it risks an FK violation
/// at the remote store.
pub async fn commit(client: &RemoteClient, data: &NormalisedData) -> UnitOfWorkResult {
    let steps = build_steps(data);
    let mut result = UnitOfWorkResult {
        success: true,
        ..Default::default()
    };

    for step in steps {
        match client.upsert(step.table, &step.records, step.on_conflict).await {
            Ok(upsert) if upsert.success => {
                result.rows_written.insert(step.table.to_string(), upsert.count);
            }
            Ok(upsert) => {
                result.success = false;
                result
                    .first_error
                    .get_or_insert_with(|| upsert.error.unwrap_or_else(|| format!("{} upsert failed", step.table)));
            }
            Err(e) => {
                result.success = false;
                result.first_error.get_or_insert_with(|| e.to_string());
            }
        }
    }

    result
}

fn build_steps(data: &NormalisedData) -> Vec<Step> {
    let players: Vec<Value> = data.players.iter().filter_map(|p| serde_json::to_value(p).ok()).collect();
    let session: Vec<Value> = data.session.iter().filter_map(|s| serde_json::to_value(s).ok()).collect();
    let hands: Vec<Value> = data.hands.iter().map(hand_row).collect();
    let hand_players: Vec<Value> = data
        .hand_players
        .iter()
        .filter_map(|hp| serde_json::to_value(hp).ok())
        .collect();
    let events: Vec<Value> = data.events.iter().filter_map(|e| serde_json::to_value(e).ok()).collect();

    vec![
        Step { table: "gfx_players", on_conflict: "player_hash", records: players },
        Step { table: "gfx_sessions", on_conflict: "session_id", records: session },
        Step { table: "gfx_hands", on_conflict: "session_id,hand_num", records: hands },
        Step { table: "gfx_hand_players", on_conflict: "hand_id,seat_num", records: hand_players },
        Step { table: "gfx_events", on_conflict: "hand_id,event_order", records: events },
    ]
}

/// `Hand` carries no `hand_id` field of its own (it's derived via
/// `local_id()` for its children's foreign keys); the row sent upstream
/// includes it so the remote schema has something to key hand-children on.
fn hand_row(hand: &ts_core::Hand) -> Value {
    let mut row = serde_json::to_value(hand).unwrap_or_else(|_| json!({}));
    if let Value::Object(map) = &mut row {
        map.insert("hand_id".to_string(), json!(hand.local_id()));
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use ts_core::{Hand, HandPlayer, Player, PlayerId, Session};

    fn sample() -> NormalisedData {
        let session = Session {
            session_id: "S1".to_string(),
            file_hash: "abc".to_string(),
            file_name: "a.json".to_string(),
            nas_path: "/nas/PC01/a.json".to_string(),
            event_title: None,
            software_version: None,
            raw_json: json!({}),
            created_at: chrono::Utc::now(),
        };
        let hand = Hand {
            session_id: "S1".to_string(),
            hand_num: 1,
            game_variant: None,
            game_class: None,
            bet_structure: None,
            duration_secs: None,
            recording_offset_start_secs: None,
            start_date_time_utc: None,
            blinds: json!({}),
            small_blind: None,
            big_blind: None,
            ante_amt: None,
            bomb_pot_amt: None,
            player_count: 1,
        };
        let player = Player {
            id: PlayerId::new("hash1"),
            player_hash: "hash1".to_string(),
            name: Some("Alice".to_string()),
            long_name: None,
        };
        let hand_player = HandPlayer {
            hand_id: hand.local_id(),
            player_id: player.id.clone(),
            seat_num: 1,
            hole_cards: vec![],
            stack: None,
            winnings: None,
            vpip_pct: None,
            pfr_pct: None,
            aggression_pct: None,
            showdown_pct: None,
            sitting_out: false,
            is_winner: false,
            elimination_rank: -1,
        };
        NormalisedData {
            session: Some(session),
            hands: vec![hand],
            players: vec![player],
            hand_players: vec![hand_player],
            events: vec![],
        }
    }

    #[test]
    fn build_steps_preserves_fk_safe_order() {
        let data = sample();
        let steps = build_steps(&data);
        let order: Vec<&str> = steps.iter().map(|s| s.table).collect();
        assert_eq!(order, vec!["gfx_players", "gfx_sessions", "gfx_hands", "gfx_hand_players", "gfx_events"]);
    }

    #[test]
    fn hand_row_carries_a_derived_hand_id() {
        let data = sample();
        let row = hand_row(&data.hands[0]);
        assert_eq!(row["hand_id"], json!("S1#1"));
    }
}
