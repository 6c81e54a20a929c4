//! Track-to-screen projection.
//!
//! `x` maps across the canvas with a scale and a centring offset. `z` maps
//! linearly up the canvas relative to a camera reference, so the camera
//! target sits on a fixed screen row `camera_offset_y` pixels above the
//! bottom edge.

use serde::{Deserialize, Serialize};

use crate::math::{ScreenPos, TrackPos};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Viewport {
    pub canvas_width: f32,
    pub canvas_height: f32,
    /// Total track width in game units.
    pub track_width: f32,
    pub lane_count: u8,
    pub lane_width: f32,
    /// Pixels per game unit.
    pub scale: f32,
    /// Distance of the camera row from the bottom edge, in pixels.
    pub camera_offset_y: f32,
    /// Entities further than this outside the canvas are hidden.
    pub cull_margin: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            canvas_width: 800.0,
            canvas_height: 600.0,
            track_width: 15.0,
            lane_count: 3,
            lane_width: 5.0,
            scale: 20.0,
            camera_offset_y: 200.0,
            cull_margin: 50.0,
        }
    }
}

impl Viewport {
    pub fn track_width_px(&self) -> f32 {
        self.track_width * self.scale
    }

    /// Left edge of the track on screen.
    pub fn track_left(&self) -> f32 {
        (self.canvas_width - self.track_width_px()) / 2.0
    }

    pub fn screen_x(&self, x: f32) -> f32 {
        (x + self.track_width / 2.0) * self.scale + self.track_left()
    }

    pub fn screen_y(&self, z: f32, camera_z: f32) -> f32 {
        self.canvas_height - self.camera_offset_y - (z - camera_z) * self.scale
    }

    pub fn project(&self, pos: TrackPos, camera_z: f32) -> ScreenPos {
        ScreenPos::new(self.screen_x(pos.x), self.screen_y(pos.z, camera_z))
    }

    /// True while `y` lies within the canvas plus the cull margin.
    pub fn is_on_screen(&self, y: f32) -> bool {
        y > -self.cull_margin && y < self.canvas_height + self.cull_margin
    }

    /// Screen x of the dividers between lanes.
    pub fn lane_divider_xs(&self) -> Vec<f32> {
        (1..self.lane_count)
            .map(|i| self.track_left() + f32::from(i) * self.lane_width * self.scale)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_is_centred() {
        let vp = Viewport::default();
        assert_eq!(vp.track_left(), 250.0);
        assert_eq!(vp.screen_x(0.0), 400.0);
        assert_eq!(vp.screen_x(-7.5), 250.0);
        assert_eq!(vp.screen_x(7.5), 550.0);
    }

    #[test]
    fn camera_target_sits_on_fixed_row() {
        let vp = Viewport::default();
        assert_eq!(vp.screen_y(120.0, 120.0), 400.0);
        // Ten units ahead of the camera is 200px further up.
        assert_eq!(vp.screen_y(130.0, 120.0), 200.0);
    }

    #[test]
    fn culling_uses_margin() {
        let vp = Viewport::default();
        assert!(vp.is_on_screen(-49.0));
        assert!(!vp.is_on_screen(-51.0));
        assert!(vp.is_on_screen(649.0));
        assert!(!vp.is_on_screen(651.0));
    }

    #[test]
    fn lane_dividers() {
        assert_eq!(Viewport::default().lane_divider_xs(), vec![350.0, 450.0]);
    }
}
