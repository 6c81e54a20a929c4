//! Math types.
//!
//! The track is a flat plane: `x` runs across the lanes, `z` runs along the
//! race direction. Screen space is a separate 2D pixel coordinate system.

use serde::{Deserialize, Serialize};

/// Position on the track plane, in game units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct TrackPos {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub z: f32,
}

impl TrackPos {
    pub const ZERO: Self = Self { x: 0.0, z: 0.0 };

    pub const fn new(x: f32, z: f32) -> Self {
        Self { x, z }
    }
}

/// Footprint of an object on the track plane, in game units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackSize {
    #[serde(default = "unit")]
    pub x: f32,
    #[serde(default = "unit")]
    pub z: f32,
}

fn unit() -> f32 {
    1.0
}

impl Default for TrackSize {
    fn default() -> Self {
        Self { x: 1.0, z: 1.0 }
    }
}

/// Pixel position on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPos {
    pub x: f32,
    pub y: f32,
}

impl ScreenPos {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}
