//! Room (lobby) and race result records.
//!
//! # Room lifecycle
//! 1. A host creates a room over HTTP (`/game/room/create`).
//! 2. Players join over the realtime channel with their selected car.
//! 3. Each player marks ready; the server pushes `LOBBY_UPDATE` on every change.
//! 4. Once everyone is ready the server pushes `GAME_START`.
//! 5. After the race, `/game/{roomUid}/result` holds the signed result.
//!
//! Room records are transient: every lobby update replaces the local copy.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Game mode used by the menu when it creates a room.
pub const DEFAULT_GAME_MODE: &str = "ENDLESS_RACE";
/// Entry fee sent with room creation, in the chain's smallest unit.
pub const DEFAULT_ENTRY_FEE: &str = "1000000";
/// Room capacity used by the menu (solo testing).
pub const DEFAULT_MAX_PLAYERS: u32 = 1;

/// Room phase as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    #[default]
    Waiting,
    Countdown,
    Racing,
    Finished,
    #[serde(other)]
    Other,
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoomStatus::Waiting => "WAITING",
            RoomStatus::Countdown => "COUNTDOWN",
            RoomStatus::Racing => "RACING",
            RoomStatus::Finished => "FINISHED",
            RoomStatus::Other => "UNKNOWN",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct UserRef {
    #[serde(default)]
    pub address: Option<String>,
}

/// A player slot in the lobby.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct LobbyPlayer {
    #[serde(default)]
    pub player_address: Option<String>,
    #[serde(default)]
    pub user: Option<UserRef>,
    #[serde(default)]
    pub is_ready: bool,
}

impl LobbyPlayer {
    /// Wallet address, whichever field the server filled in.
    pub fn address(&self) -> Option<&str> {
        self.player_address
            .as_deref()
            .or_else(|| self.user.as_ref().and_then(|u| u.address.as_deref()))
    }
}

/// Room record pushed with `LOBBY_UPDATE` and returned by `GET_ROOM_STATE`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RoomInfo {
    #[serde(default)]
    pub room_uid: Option<String>,
    #[serde(default)]
    pub game_mode: String,
    #[serde(default)]
    pub max_players: u32,
    #[serde(default)]
    pub current_players: u32,
    #[serde(default)]
    pub status: RoomStatus,
    #[serde(default)]
    pub players: Vec<LobbyPlayer>,
}

impl RoomInfo {
    pub fn ready_count(&self) -> usize {
        self.players.iter().filter(|p| p.is_ready).count()
    }

    pub fn is_full(&self) -> bool {
        self.max_players > 0 && self.current_players >= self.max_players
    }
}

/// Body of `POST /game/room/create`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoom {
    pub game_mode: String,
    pub max_players: u32,
    pub entry_fee: String,
    /// RFC 3339 timestamp after which the room expires.
    pub deadline: String,
}

/// Minimal view of a freshly created room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedRoom {
    #[serde(default)]
    pub room_uid: Option<String>,
}

/// Query filters for `GET /game/rooms`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoomFilter {
    pub game_mode: Option<String>,
    pub status: Option<String>,
}

impl RoomFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_game_mode(mut self, mode: &str) -> Self {
        self.game_mode = Some(mode.to_string());
        self
    }

    pub fn with_status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    /// Query pairs in a stable order, empty values omitted.
    pub fn query_pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = Vec::new();
        if let Some(mode) = self.game_mode.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("gameMode", mode));
        }
        if let Some(status) = self.status.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("status", status));
        }
        pairs
    }
}

/// One line of the final standings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ranking {
    pub rank: u32,
    #[serde(default)]
    pub player_id: Option<String>,
    #[serde(default)]
    pub distance: f64,
    /// Milliseconds.
    #[serde(default)]
    pub final_time: u64,
}

/// Final race result, either pushed with `GAME_END` or fetched over HTTP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RaceResult {
    #[serde(default)]
    pub winner: Option<String>,
    #[serde(default)]
    pub rankings: Vec<Ranking>,
    #[serde(default)]
    pub signature: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lobby_player_address_falls_back_to_user() {
        let direct: LobbyPlayer =
            serde_json::from_str(r#"{"playerAddress": "0xabc", "isReady": true}"#).unwrap();
        assert_eq!(direct.address(), Some("0xabc"));

        let nested: LobbyPlayer =
            serde_json::from_str(r#"{"user": {"address": "0xdef"}}"#).unwrap();
        assert_eq!(nested.address(), Some("0xdef"));
        assert!(!nested.is_ready);

        assert_eq!(LobbyPlayer::default().address(), None);
    }

    #[test]
    fn room_info_decodes_and_counts() {
        let json = r#"{
            "gameMode": "ENDLESS_RACE",
            "maxPlayers": 2,
            "currentPlayers": 2,
            "status": "COUNTDOWN",
            "players": [{"playerAddress": "0x1", "isReady": true}, {"playerAddress": "0x2"}]
        }"#;
        let room: RoomInfo = serde_json::from_str(json).unwrap();
        assert_eq!(room.status, RoomStatus::Countdown);
        assert_eq!(room.ready_count(), 1);
        assert!(room.is_full());
    }

    #[test]
    fn unknown_room_status_is_tolerated() {
        let room: RoomInfo = serde_json::from_str(r#"{"status": "CANCELLED"}"#).unwrap();
        assert_eq!(room.status, RoomStatus::Other);
    }

    #[test]
    fn filter_skips_empty_values() {
        let filter = RoomFilter::new().with_game_mode("ENDLESS_RACE").with_status("");
        assert_eq!(filter.query_pairs(), vec![("gameMode", "ENDLESS_RACE")]);
        assert!(RoomFilter::new().query_pairs().is_empty());
    }
}
