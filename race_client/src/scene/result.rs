//! Final standings.
//!
//! The result arrives either with `GAME_END` or is fetched over HTTP on
//! entry. A `GAME_END` received while this scene is active replaces a
//! fetched result.

use race_shared::{
    math::ScreenPos,
    net::{ServerEventKind, ServerPush},
    palette,
    render::TextItem,
    room::RaceResult,
    viewport::Viewport,
};
use tracing::{debug, info};

use super::{SceneContext, Transition, UiAction};
use crate::{labels, status::StatusLine};

const ROWS_TOP: f32 = 240.0;
const ROW_SPACING: f32 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultSource {
    Pushed,
    Fetched,
}

#[derive(Debug)]
pub struct ResultScene {
    room_uid: String,
    result: Option<RaceResult>,
    source: Option<ResultSource>,
    status: Option<StatusLine>,
}

impl ResultScene {
    pub const EVENTS: &'static [ServerEventKind] = &[ServerEventKind::GameEnd];

    pub fn new(room_uid: String, result: Option<RaceResult>) -> Self {
        let source = result.as_ref().map(|_| ResultSource::Pushed);
        Self {
            room_uid,
            result,
            source,
            status: None,
        }
    }

    pub fn room_uid(&self) -> &str {
        &self.room_uid
    }

    pub fn result(&self) -> Option<&RaceResult> {
        self.result.as_ref()
    }

    pub fn source(&self) -> Option<ResultSource> {
        self.source
    }

    pub fn status(&self) -> Option<&StatusLine> {
        self.status.as_ref()
    }

    pub(crate) async fn on_enter(&mut self, ctx: &SceneContext<'_>) {
        if self.result.is_some() {
            return;
        }
        self.status = Some(StatusLine::info("Loading results..."));
        match ctx.rooms.race_result(&self.room_uid).await {
            Ok(result) => {
                self.status = None;
                if self.result.is_none() {
                    self.result = Some(result);
                    self.source = Some(ResultSource::Fetched);
                }
            }
            Err(e) => self.status = Some(StatusLine::failure("Error", &e)),
        }
    }

    pub(crate) fn on_action(&mut self, action: UiAction) -> Transition {
        match action {
            UiAction::BackToMenu => Transition::Menu(None),
            _ => Transition::Stay,
        }
    }

    pub(crate) fn on_push(&mut self, push: ServerPush) -> Transition {
        match push {
            ServerPush::GameEnd(result) => {
                info!(room = %self.room_uid, "Final result received");
                self.result = Some(result);
                self.source = Some(ResultSource::Pushed);
                self.status = None;
            }
            other => debug!(event = %other.kind(), "Push ignored on results"),
        }
        Transition::Stay
    }

    pub fn text_items(&self, vp: &Viewport) -> Vec<TextItem> {
        let cx = vp.canvas_width / 2.0;
        let Some(result) = &self.result else {
            let status = self
                .status
                .clone()
                .unwrap_or_else(|| StatusLine::info("Loading results..."));
            return vec![TextItem::new(
                status.text,
                ScreenPos::new(cx, vp.canvas_height / 2.0),
                status.tone.color(),
            )];
        };

        let winner = result.winner.as_deref().unwrap_or("Unknown");
        let mut items = vec![
            TextItem::new("RACE FINISHED!", ScreenPos::new(cx, 50.0), palette::TEXT_PRIMARY),
            TextItem::new(
                format!("🏆 Winner: {}...", labels::prefix(winner, 15)),
                ScreenPos::new(cx, 150.0),
                palette::TEXT_SUCCESS,
            ),
            TextItem::new("Final Rankings:", ScreenPos::new(cx, 200.0), palette::TEXT_PRIMARY),
        ];

        if result.rankings.is_empty() {
            items.push(TextItem::new(
                "No rankings available",
                ScreenPos::new(cx, ROWS_TOP + 20.0),
                palette::TEXT_MUTED,
            ));
        }
        for (i, r) in result.rankings.iter().enumerate() {
            let player = r.player_id.as_deref().unwrap_or("Unknown");
            items.push(TextItem::new(
                format!(
                    "{}  {}...  {}m  {}",
                    labels::medal(r.rank),
                    labels::prefix(player, 12),
                    r.distance,
                    labels::seconds_label(r.final_time)
                ),
                ScreenPos::new(cx, ROWS_TOP + i as f32 * ROW_SPACING),
                palette::TEXT_SECONDARY,
            ));
        }

        if let Some(signature) = result.signature.as_deref().filter(|s| !s.is_empty()) {
            items.push(TextItem::new(
                "Race Signature:",
                ScreenPos::new(cx, 450.0),
                palette::TEXT_SECONDARY,
            ));
            items.push(TextItem::new(
                format!("{}...", labels::prefix(signature, 40)),
                ScreenPos::new(cx, 470.0),
                palette::TEXT_MUTED,
            ));
        }
        items.push(TextItem::new("BACK TO MENU", ScreenPos::new(cx, 550.0), palette::TEXT_PRIMARY));
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use race_shared::room::Ranking;

    fn result() -> RaceResult {
        RaceResult {
            winner: Some("0xwinner".into()),
            rankings: vec![
                Ranking {
                    rank: 1,
                    player_id: Some("0xwinner".into()),
                    distance: 1234.0,
                    final_time: 83_449,
                },
                Ranking {
                    rank: 4,
                    player_id: None,
                    distance: 99.5,
                    final_time: 90_000,
                },
            ],
            signature: Some("0xsig".into()),
        }
    }

    #[test]
    fn rows_show_medal_distance_and_time() {
        let scene = ResultScene::new("r-1".into(), Some(result()));
        let texts: Vec<_> = scene
            .text_items(&Viewport::default())
            .into_iter()
            .map(|t| t.text)
            .collect();
        assert!(texts.contains(&"🥇  0xwinner...  1234m  83.4s".to_string()));
        assert!(texts.contains(&"4.  Unknown...  99.5m  90.0s".to_string()));
        assert!(texts.contains(&"0xsig...".to_string()));
    }

    #[test]
    fn pushed_result_overrides() {
        let mut scene = ResultScene::new("r-1".into(), None);
        assert_eq!(scene.source(), None);
        scene.on_push(ServerPush::GameEnd(result()));
        assert_eq!(scene.source(), Some(ResultSource::Pushed));
        assert_eq!(scene.on_action(UiAction::BackToMenu), Transition::Menu(None));
    }
}
