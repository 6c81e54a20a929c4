//! Race heads-up display.

use race_shared::{
    math::ScreenPos,
    palette,
    render::TextItem,
    world::{PlayerState, WorldSnapshot},
};

use crate::labels;

#[derive(Debug, Clone, PartialEq)]
pub struct Hud {
    pub distance: String,
    pub rank: String,
    pub speed: String,
    pub status: String,
    /// Last `ERROR` push, shown in place of the status.
    pub error: Option<String>,
}

impl Default for Hud {
    fn default() -> Self {
        Self {
            distance: "0m".to_string(),
            rank: "-".to_string(),
            speed: "0".to_string(),
            status: "RACING".to_string(),
            error: None,
        }
    }
}

impl Hud {
    /// Refreshes from a snapshot. Player fields keep their last value when
    /// the local player is absent.
    pub fn update(&mut self, snapshot: &WorldSnapshot, local: Option<&PlayerState>) {
        if let Some(p) = local {
            self.distance = labels::distance_label(p.position.z);
            self.rank = labels::rank_label(p.rank);
            self.speed = labels::speed_label(p.speed);
        }
        self.status = snapshot.status.to_string();
    }

    pub fn show_error(&mut self, message: &str) {
        self.error = Some(message.to_string());
    }

    pub fn text_items(&self) -> Vec<TextItem> {
        let white = palette::TEXT_PRIMARY;
        let (status, status_color) = match &self.error {
            Some(e) => (format!("Error: {e}"), palette::TEXT_DANGER),
            None => (format!("Status: {}", self.status), palette::TEXT_SUCCESS),
        };
        vec![
            TextItem::new(
                format!("Distance: {}", self.distance),
                ScreenPos::new(20.0, 15.0),
                white,
            ),
            TextItem::new(
                format!("Rank: {}", self.rank),
                ScreenPos::new(200.0, 15.0),
                white,
            ),
            TextItem::new(
                format!("Speed: {}", self.speed),
                ScreenPos::new(350.0, 15.0),
                white,
            ),
            TextItem::new(status, ScreenPos::new(550.0, 15.0), status_color),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> WorldSnapshot {
        serde_json::from_str(
            r#"{"status":"RACING","players":[{"playerId":"P1","position":{"x":0,"z":120},
                "lane":1,"speed":40,"rank":1}],"obstacles":[],"powerUps":[]}"#,
        )
        .unwrap()
    }

    #[test]
    fn local_player_fields() {
        let snap = snapshot();
        let mut hud = Hud::default();
        hud.update(&snap, snap.find_player("P1"));
        assert_eq!(hud.distance, "120m");
        assert_eq!(hud.rank, "1st");
        assert_eq!(hud.speed, "40");
        assert_eq!(hud.status, "RACING");
    }

    #[test]
    fn missing_player_keeps_previous_values() {
        let snap = snapshot();
        let mut hud = Hud::default();
        hud.update(&snap, snap.find_player("P1"));
        hud.update(&snap, None);
        assert_eq!(hud.distance, "120m");
    }

    #[test]
    fn error_replaces_status_text() {
        let mut hud = Hud::default();
        hud.show_error("Room closed");
        let items = hud.text_items();
        assert_eq!(items[3].text, "Error: Room closed");
        assert_eq!(items[3].color, palette::TEXT_DANGER);
    }
}
