//! Pre-race lobby.
//!
//! Shows the room and its players, lets the local player mark ready, and
//! hands over to the race on `GAME_START`. Rooms against AI mark ready on
//! their own.

use race_shared::{
    math::ScreenPos,
    net::{ServerEventKind, ServerPush},
    palette::{self, Rgb},
    render::TextItem,
    room::{RoomInfo, RoomStatus},
    viewport::Viewport,
};
use tracing::{debug, info, warn};

use super::{SceneContext, Transition, UiAction};
use crate::{error::ClientError, labels, status::StatusLine};

const CARD_TOP: f32 = 270.0;
const CARD_SPACING: f32 = 44.0;

#[derive(Debug)]
pub struct LobbyScene {
    room_uid: String,
    vs_ai: bool,
    room: Option<RoomInfo>,
    is_ready: bool,
    status_text: String,
    status_color: Rgb,
    notice: StatusLine,
}

impl LobbyScene {
    pub const EVENTS: &'static [ServerEventKind] = &[
        ServerEventKind::LobbyUpdate,
        ServerEventKind::PlayerJoined,
        ServerEventKind::PlayerLeft,
        ServerEventKind::GameStart,
        ServerEventKind::Error,
    ];

    pub fn new(room_uid: String, vs_ai: bool) -> Self {
        Self {
            room_uid,
            vs_ai,
            room: None,
            is_ready: false,
            status_text: RoomStatus::Waiting.to_string(),
            status_color: palette::STATUS_WAITING,
            notice: StatusLine::info("Game starts when all players are ready"),
        }
    }

    pub fn room_uid(&self) -> &str {
        &self.room_uid
    }

    pub fn is_vs_ai(&self) -> bool {
        self.vs_ai
    }

    pub fn room(&self) -> Option<&RoomInfo> {
        self.room.as_ref()
    }

    pub fn is_ready(&self) -> bool {
        self.is_ready
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn status_color(&self) -> Rgb {
        self.status_color
    }

    pub fn notice(&self) -> &StatusLine {
        &self.notice
    }

    pub fn mode_line(&self) -> String {
        match &self.room {
            Some(room) => labels::mode_line(room),
            None => "ENDLESS_RACE  •  ?/? Players".to_string(),
        }
    }

    fn apply_room(&mut self, room: RoomInfo) {
        self.status_text = room.status.to_string();
        self.status_color = palette::room_status_color(room.status);
        debug!(
            room = %self.room_uid,
            status = %room.status,
            players = room.players.len(),
            ready = room.ready_count(),
            "Lobby state"
        );
        self.room = Some(room);
    }

    fn show_error(&mut self, message: &str) {
        self.status_text = format!("Error: {message}");
        self.status_color = palette::TEXT_DANGER;
    }

    pub(crate) async fn on_enter(&mut self, ctx: &SceneContext<'_>) {
        match ctx.realtime.room_state(&self.room_uid).await {
            Ok(room) => self.apply_room(room),
            Err(e) => self.show_error(&e.to_string()),
        }
        if self.vs_ai {
            self.notice = StatusLine::info("VS AI, starting match...");
            self.mark_ready(ctx).await;
        }
    }

    async fn mark_ready(&mut self, ctx: &SceneContext<'_>) {
        if self.is_ready {
            debug!(room = %self.room_uid, "Already marked ready");
            return;
        }
        match ctx.realtime.mark_ready(&self.room_uid).await {
            Ok(_) => {
                self.is_ready = true;
                self.notice = StatusLine::success("Waiting for other players...");
            }
            Err(e) => self.notice = StatusLine::failure("Error", &e),
        }
    }

    async fn leave(&mut self, ctx: &SceneContext<'_>) -> Transition {
        let status = match ctx.realtime.leave_room(&self.room_uid).await {
            Ok(()) => {
                info!(room = %self.room_uid, "Left room");
                StatusLine::info("Left room")
            }
            Err(e) => {
                warn!(room = %self.room_uid, error = %e, "Leave not confirmed");
                leave_failure(&e)
            }
        };
        Transition::Menu(Some(status))
    }

    pub(crate) async fn on_action(
        &mut self,
        action: UiAction,
        ctx: &SceneContext<'_>,
    ) -> Transition {
        match action {
            UiAction::MarkReady => {
                self.mark_ready(ctx).await;
                Transition::Stay
            }
            UiAction::LeaveRoom => self.leave(ctx).await,
            _ => Transition::Stay,
        }
    }

    pub(crate) fn on_push(&mut self, push: ServerPush) -> Transition {
        match push {
            ServerPush::LobbyUpdate(room) => self.apply_room(room),
            ServerPush::PlayerJoined(p) => {
                info!(
                    room = %self.room_uid,
                    player = p.player_address.as_deref().unwrap_or("unknown"),
                    "Player joined"
                );
            }
            ServerPush::PlayerLeft(p) => {
                info!(
                    room = %self.room_uid,
                    player = p.player_id.as_deref().unwrap_or("unknown"),
                    "Player left"
                );
            }
            ServerPush::GameStart(_) => {
                info!(room = %self.room_uid, "Game starting");
                return Transition::Race {
                    room_uid: self.room_uid.clone(),
                };
            }
            ServerPush::Error(e) => self.show_error(&e.message),
            other => debug!(event = %other.kind(), "Push ignored in lobby"),
        }
        Transition::Stay
    }

    pub fn text_items(&self, vp: &Viewport) -> Vec<TextItem> {
        let cx = vp.canvas_width / 2.0;
        let short_room = if self.room_uid.chars().count() > 18 {
            format!("{}…", labels::prefix(&self.room_uid, 18))
        } else {
            self.room_uid.clone()
        };

        let mut items = vec![
            TextItem::new("RACE LOBBY", ScreenPos::new(cx, 45.0), palette::TEXT_PRIMARY),
            TextItem::new(
                format!("ROOM  {short_room}"),
                ScreenPos::new(cx, 112.0),
                palette::TEXT_SECONDARY,
            ),
            TextItem::new(self.mode_line(), ScreenPos::new(cx, 148.0), palette::TEXT_SECONDARY),
            TextItem::new(
                self.status_text.clone(),
                ScreenPos::new(cx, 182.0),
                self.status_color,
            ),
            TextItem::new("PLAYERS", ScreenPos::new(cx, 228.0), palette::TEXT_MUTED),
        ];

        let players = self.room.iter().flat_map(|r| r.players.iter());
        for (i, player) in players.enumerate() {
            let addr = labels::short_address(player.address().unwrap_or("0x???"));
            let (badge, color) = if player.is_ready {
                ("✓  READY", palette::TEXT_SUCCESS)
            } else {
                ("⏳  WAITING", palette::STATUS_WAITING)
            };
            items.push(TextItem::new(
                format!("{addr}   {badge}"),
                ScreenPos::new(cx, CARD_TOP + i as f32 * CARD_SPACING),
                color,
            ));
        }

        let (button, color) = if self.is_ready {
            ("✓  READY", palette::TEXT_SUCCESS)
        } else {
            ("MARK READY", palette::TEXT_PRIMARY)
        };
        items.push(TextItem::new(button, ScreenPos::new(cx, 460.0), color));
        items.push(TextItem::new(
            self.notice.text.clone(),
            ScreenPos::new(cx, 522.0),
            self.notice.tone.color(),
        ));
        items
    }
}

fn leave_failure(err: &ClientError) -> StatusLine {
    StatusLine::failure("Left room without confirmation", err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use race_shared::room::LobbyPlayer;

    fn room(status: RoomStatus) -> RoomInfo {
        RoomInfo {
            room_uid: Some("r-1".into()),
            game_mode: "ENDLESS_RACE".into(),
            max_players: 4,
            current_players: 2,
            status,
            players: vec![
                LobbyPlayer {
                    player_address: Some("0x1234567890abcdef".into()),
                    is_ready: true,
                    ..LobbyPlayer::default()
                },
                LobbyPlayer::default(),
            ],
        }
    }

    #[test]
    fn lobby_update_recolours_status() {
        let mut lobby = LobbyScene::new("r-1".into(), false);
        assert_eq!(lobby.mode_line(), "ENDLESS_RACE  •  ?/? Players");

        assert_eq!(
            lobby.on_push(ServerPush::LobbyUpdate(room(RoomStatus::Countdown))),
            Transition::Stay
        );
        assert_eq!(lobby.status_text(), "COUNTDOWN");
        assert_eq!(lobby.status_color(), palette::STATUS_COUNTDOWN);
        assert_eq!(lobby.mode_line(), "ENDLESS_RACE  •  2/4 Players");

        // A racing room alone does not start the race.
        assert_eq!(
            lobby.on_push(ServerPush::LobbyUpdate(room(RoomStatus::Racing))),
            Transition::Stay
        );
        assert_eq!(lobby.status_color(), palette::STATUS_RACING);
    }

    #[test]
    fn game_start_moves_to_race() {
        let mut lobby = LobbyScene::new("r-1".into(), false);
        assert_eq!(
            lobby.on_push(ServerPush::GameStart(serde_json::Value::Null)),
            Transition::Race {
                room_uid: "r-1".into()
            }
        );
    }

    #[test]
    fn player_cards() {
        let mut lobby = LobbyScene::new("r-1".into(), false);
        lobby.on_push(ServerPush::LobbyUpdate(room(RoomStatus::Waiting)));
        let texts: Vec<_> = lobby
            .text_items(&Viewport::default())
            .into_iter()
            .map(|t| t.text)
            .collect();
        assert!(texts.contains(&"0x1234…cdef   ✓  READY".to_string()));
        assert!(texts.contains(&"0x???   ⏳  WAITING".to_string()));
    }
}
