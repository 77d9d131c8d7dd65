//! The normalised (multi-row) record set: five related record kinds
//! derived from one file (spec.md §3).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

crate::define_id! {
    pub struct PlayerId;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub file_hash: String,
    pub file_name: String,
    pub nas_path: String,
    pub event_title: Option<String>,
    pub software_version: Option<String>,
    pub raw_json: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hand {
    pub session_id: String,
    pub hand_num: u32,
    pub game_variant: Option<String>,
    pub game_class: Option<String>,
    pub bet_structure: Option<String>,
    /// Whole seconds, parsed from an ISO-8601 duration.
    pub duration_secs: Option<i64>,
    pub recording_offset_start_secs: Option<i64>,
    pub start_date_time_utc: Option<DateTime<Utc>>,
    pub blinds: Value,
    pub small_blind: Option<i64>,
    pub big_blind: Option<i64>,
    pub ante_amt: Option<i64>,
    pub bomb_pot_amt: Option<i64>,
    pub player_count: u32,
}

impl Hand {
    /// Stable key a `HandPlayer`/`Event` references by `(session_id, hand_num)`.
    pub fn local_id(&self) -> String {
        format!("{}#{}", self.session_id, self.hand_num)
    }
}

/// Deduplicated across the entire file by `player_hash = MD5(name : long_name)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub player_hash: String,
    pub name: Option<String>,
    pub long_name: Option<String>,
}

/// The per-hand appearance of a player.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandPlayer {
    pub hand_id: String,
    pub player_id: PlayerId,
    pub seat_num: i32,
    pub hole_cards: Vec<String>,
    pub stack: Option<f64>,
    pub winnings: Option<f64>,
    pub vpip_pct: Option<f64>,
    pub pfr_pct: Option<f64>,
    pub aggression_pct: Option<f64>,
    pub showdown_pct: Option<f64>,
    pub sitting_out: bool,
    pub is_winner: bool,
    pub elimination_rank: i32,
}

/// Per-hand action, keyed by `(hand_id, event_order)` with a 0-based,
/// contiguous local index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionEvent {
    pub hand_id: String,
    pub event_order: u32,
    pub event_type: String,
    pub player_num: Option<i32>,
    pub bet_amt: Option<f64>,
    pub pot: Option<f64>,
    pub board_num: Option<i32>,
    pub num_cards_drawn: Option<i32>,
    pub date_time_utc: Option<DateTime<Utc>>,
    pub board_cards: Option<String>,
}

/// Everything produced by parsing one file in normalised mode. Invariants
/// (spec.md §3): every `HandPlayer.player_id` references a `Player` here;
/// every `Hand.session_id` equals `session.session_id`; every
/// `ActionEvent.hand_id` references a `Hand` here; `Player` uniqueness
/// holds by `player_hash`; `event_order` is 0-based and contiguous per hand.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NormalisedData {
    pub session: Option<Session>,
    pub hands: Vec<Hand>,
    pub players: Vec<Player>,
    pub hand_players: Vec<HandPlayer>,
    pub events: Vec<ActionEvent>,
}
