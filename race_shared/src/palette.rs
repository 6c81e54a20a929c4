//! Colour palette.
//!
//! Colours are `0xRRGGBB`. Mappings are deterministic so a given snapshot
//! always renders with the same colours.

use crate::{
    room::RoomStatus,
    world::{ObstacleKind, PowerUpKind},
};

/// Packed `0xRRGGBB` colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub u32);

impl Rgb {
    pub fn hex(self) -> String {
        format!("#{:06x}", self.0 & 0x00ff_ffff)
    }
}

pub const BACKGROUND: Rgb = Rgb(0x2d3436);
pub const TRACK: Rgb = Rgb(0x636e72);
pub const LANE_LINE: Rgb = Rgb(0xffffff);

pub const PLAYERS: [Rgb; 4] = [
    Rgb(0x00b894), // green
    Rgb(0x0984e3), // blue
    Rgb(0xfdcb6e), // yellow
    Rgb(0xe17055), // orange
];

pub const OBSTACLE_BARRIER: Rgb = Rgb(0xd63031);
pub const OBSTACLE_HAZARD: Rgb = Rgb(0xe17055);
pub const OBSTACLE_SLOW: Rgb = Rgb(0xfdcb6e);

pub const POWERUP_BOOST: Rgb = Rgb(0x00b894);
pub const POWERUP_SHIELD: Rgb = Rgb(0x74b9ff);
pub const POWERUP_SLOW: Rgb = Rgb(0xa29bfe);

pub const TEXT_PRIMARY: Rgb = Rgb(0xffffff);
pub const TEXT_SECONDARY: Rgb = Rgb(0xb2bec3);
pub const TEXT_MUTED: Rgb = Rgb(0x636e72);
pub const TEXT_SUCCESS: Rgb = Rgb(0x00b894);
pub const TEXT_DANGER: Rgb = Rgb(0xd63031);

pub const STATUS_WAITING: Rgb = Rgb(0xfdcb6e);
pub const STATUS_COUNTDOWN: Rgb = Rgb(0x00b894);
pub const STATUS_RACING: Rgb = Rgb(0x0984e3);

pub const OUTLINE_LOCAL: Rgb = Rgb(0xffffff);

/// Player colour by snapshot index, wrapping around the palette.
pub fn player_color(index: usize) -> Rgb {
    PLAYERS[index % PLAYERS.len()]
}

pub fn obstacle_color(kind: ObstacleKind) -> Rgb {
    match kind {
        ObstacleKind::Barrier => OBSTACLE_BARRIER,
        ObstacleKind::Hazard => OBSTACLE_HAZARD,
        ObstacleKind::SlowZone => OBSTACLE_SLOW,
        ObstacleKind::Other => OBSTACLE_HAZARD,
    }
}

pub fn power_up_color(kind: PowerUpKind) -> Rgb {
    match kind {
        PowerUpKind::Boost => POWERUP_BOOST,
        PowerUpKind::Shield => POWERUP_SHIELD,
        PowerUpKind::SlowOthers => POWERUP_SLOW,
        PowerUpKind::Other => POWERUP_BOOST,
    }
}

/// Lobby status badge colour.
pub fn room_status_color(status: RoomStatus) -> Rgb {
    match status {
        RoomStatus::Countdown => STATUS_COUNTDOWN,
        RoomStatus::Racing => STATUS_RACING,
        _ => STATUS_WAITING,
    }
}
