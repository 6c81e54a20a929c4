//! World snapshot model.
//!
//! The server pushes a complete snapshot up to 60 times per second. The
//! client never merges or predicts: each snapshot replaces the previous one.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::{TrackPos, TrackSize};

/// Race phase reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RaceStatus {
    #[default]
    Waiting,
    Countdown,
    Racing,
    Finished,
}

impl RaceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RaceStatus::Waiting => "WAITING",
            RaceStatus::Countdown => "COUNTDOWN",
            RaceStatus::Racing => "RACING",
            RaceStatus::Finished => "FINISHED",
        }
    }
}

impl fmt::Display for RaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One racer as seen in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub player_id: String,
    #[serde(default)]
    pub position: TrackPos,
    #[serde(default)]
    pub lane: u8,
    #[serde(default)]
    pub speed: f32,
    /// 1-based; absent or zero before the server has ranked anyone.
    #[serde(default)]
    pub rank: Option<u32>,
    #[serde(default, alias = "finished")]
    pub is_finished: bool,
}

/// Obstacle category. Unknown categories render with the hazard colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ObstacleKind {
    Barrier,
    Hazard,
    SlowZone,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: String,
    #[serde(default)]
    pub position: TrackPos,
    #[serde(default)]
    pub size: TrackSize,
    #[serde(rename = "type")]
    pub kind: ObstacleKind,
}

/// Power-up category. Unknown categories render with the boost colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PowerUpKind {
    Boost,
    Shield,
    SlowOthers,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerUp {
    pub id: String,
    #[serde(default)]
    pub position: TrackPos,
    #[serde(rename = "type")]
    pub kind: PowerUpKind,
    #[serde(default)]
    pub collected: bool,
}

/// Complete server-authoritative world state for one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    pub status: RaceStatus,
    #[serde(default)]
    pub players: Vec<PlayerState>,
    #[serde(default)]
    pub obstacles: Vec<Obstacle>,
    #[serde(default)]
    pub power_ups: Vec<PowerUp>,
}

impl WorldSnapshot {
    pub fn find_player(&self, player_id: &str) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.player_id == player_id)
    }

    /// Power-ups still on the track. Collected ones are treated as absent.
    pub fn live_power_ups(&self) -> impl Iterator<Item = &PowerUp> {
        self.power_ups.iter().filter(|p| !p.collected)
    }

    pub fn is_finished(&self) -> bool {
        self.status == RaceStatus::Finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_server_snapshot() {
        let json = r#"{
            "status": "RACING",
            "players": [
                {"playerId": "P1", "position": {"x": 0, "z": 120}, "lane": 1, "speed": 40, "rank": 1}
            ],
            "obstacles": [
                {"id": "o1", "position": {"x": -5, "z": 300}, "size": {"x": 5, "z": 2}, "type": "SLOW_ZONE"}
            ],
            "powerUps": [
                {"id": "u1", "position": {"x": 5, "z": 200}, "type": "SHIELD", "collected": true},
                {"id": "u2", "position": {"x": 0, "z": 250}, "type": "MAGNET"}
            ]
        }"#;

        let snap: WorldSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snap.status, RaceStatus::Racing);
        assert_eq!(snap.players[0].position.z, 120.0);
        assert_eq!(snap.players[0].rank, Some(1));
        assert!(!snap.players[0].is_finished);
        assert_eq!(snap.obstacles[0].kind, ObstacleKind::SlowZone);
        assert_eq!(snap.power_ups[1].kind, PowerUpKind::Other);

        let live: Vec<_> = snap.live_power_ups().map(|p| p.id.as_str()).collect();
        assert_eq!(live, vec!["u2"]);
    }

    #[test]
    fn missing_lists_decode_as_empty() {
        let snap: WorldSnapshot = serde_json::from_str(r#"{"status": "COUNTDOWN"}"#).unwrap();
        assert!(snap.players.is_empty());
        assert!(snap.obstacles.is_empty());
        assert!(snap.power_ups.is_empty());
        assert_eq!(snap.status.to_string(), "COUNTDOWN");
    }
}
