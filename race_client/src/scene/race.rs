//! Race scene: reconciles snapshots, keeps the HUD current and forwards
//! lane changes.

use race_shared::{
    net::{ServerEventKind, ServerPush},
    viewport::Viewport,
};
use tracing::{debug, info};

use super::{SceneContext, Transition, UiAction};
use crate::{hud::Hud, input, reconcile::RaceView};

#[derive(Debug)]
pub struct RaceScene {
    room_uid: String,
    view: RaceView,
    hud: Hud,
}

impl RaceScene {
    pub const EVENTS: &'static [ServerEventKind] = &[
        ServerEventKind::GameState,
        ServerEventKind::GameEnd,
        ServerEventKind::Error,
    ];

    pub fn new(room_uid: String, viewport: Viewport, local_player: &str) -> Self {
        info!(room = %room_uid, player = local_player, "Race started");
        Self {
            room_uid,
            view: RaceView::new(viewport, local_player),
            hud: Hud::default(),
        }
    }

    pub fn room_uid(&self) -> &str {
        &self.room_uid
    }

    pub fn view(&self) -> &RaceView {
        &self.view
    }

    pub fn hud(&self) -> &Hud {
        &self.hud
    }

    pub(crate) fn on_action(&mut self, action: UiAction, ctx: &SceneContext<'_>) -> Transition {
        if let UiAction::Steer(key) = action {
            match input::action_for_key(key) {
                Some(action) => ctx.realtime.send_input(&self.room_uid, action),
                None => debug!(?key, "Key not bound"),
            }
        }
        Transition::Stay
    }

    pub(crate) fn on_push(&mut self, push: ServerPush) -> Transition {
        match push {
            ServerPush::GameState(snapshot) => {
                if snapshot.is_finished() {
                    info!(room = %self.room_uid, "Race finished");
                    return Transition::Result {
                        room_uid: self.room_uid.clone(),
                        result: None,
                    };
                }
                self.view.apply(&snapshot);
                let local = snapshot.find_player(self.view.local_player());
                self.hud.update(&snapshot, local);
            }
            ServerPush::GameEnd(result) => {
                info!(room = %self.room_uid, winner = ?result.winner, "Game ended");
                return Transition::Result {
                    room_uid: self.room_uid.clone(),
                    result: Some(result),
                };
            }
            ServerPush::Error(e) => self.hud.show_error(&e.message),
            other => debug!(event = %other.kind(), "Push ignored in race"),
        }
        Transition::Stay
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use race_shared::{room::RaceResult, world::WorldSnapshot};

    fn state(json: &str) -> ServerPush {
        let snapshot: WorldSnapshot = serde_json::from_str(json).unwrap();
        ServerPush::GameState(Box::new(snapshot))
    }

    #[test]
    fn snapshot_drives_view_and_hud() {
        let mut race = RaceScene::new("r-1".into(), Viewport::default(), "P1");
        let next = race.on_push(state(
            r#"{"status":"RACING","players":[{"playerId":"P1","position":{"x":0,"z":120},
                "lane":1,"speed":40,"rank":1}],"obstacles":[],"powerUps":[]}"#,
        ));
        assert_eq!(next, Transition::Stay);
        assert_eq!(race.hud().distance, "120m");
        assert_eq!(race.hud().rank, "1st");
        assert_eq!(race.hud().speed, "40");
        assert_eq!(race.view().camera_z(), 120.0);
    }

    #[test]
    fn finished_snapshot_leaves_for_results() {
        let mut race = RaceScene::new("r-1".into(), Viewport::default(), "P1");
        let next = race.on_push(state(r#"{"status":"FINISHED","players":[]}"#));
        assert_eq!(
            next,
            Transition::Result {
                room_uid: "r-1".into(),
                result: None
            }
        );
        // The finishing snapshot is not rendered.
        assert!(race.view().players().is_empty());
    }

    #[test]
    fn game_end_carries_result() {
        let mut race = RaceScene::new("r-1".into(), Viewport::default(), "P1");
        let result = RaceResult {
            winner: Some("P1".into()),
            ..RaceResult::default()
        };
        let next = race.on_push(ServerPush::GameEnd(result.clone()));
        assert_eq!(
            next,
            Transition::Result {
                room_uid: "r-1".into(),
                result: Some(result)
            }
        );
    }
}
