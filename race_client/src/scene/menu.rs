//! Main menu: create a room (optionally against AI) or join one by id.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use race_shared::{
    math::ScreenPos,
    net::ServerEventKind,
    palette,
    render::TextItem,
    room::{CreateRoom, DEFAULT_ENTRY_FEE, DEFAULT_GAME_MODE, DEFAULT_MAX_PLAYERS},
    viewport::Viewport,
};
use tracing::{error, info};

use super::{SceneContext, Transition, UiAction};
use crate::{
    error::{ClientError, Missing},
    labels,
    status::StatusLine,
};

/// Room creation request used by the menu, expiring an hour after `now`.
pub fn default_room_request(now: DateTime<Utc>) -> CreateRoom {
    CreateRoom {
        game_mode: DEFAULT_GAME_MODE.to_string(),
        max_players: DEFAULT_MAX_PLAYERS,
        entry_fee: DEFAULT_ENTRY_FEE.to_string(),
        deadline: (now + Duration::hours(1)).to_rfc3339_opts(SecondsFormat::Millis, true),
    }
}

fn require(value: Option<&str>, what: Missing) -> Result<&str, StatusLine> {
    value.ok_or_else(|| StatusLine::failure("Error", &ClientError::Precondition(what)))
}

#[derive(Debug, Default)]
pub struct MenuScene {
    room_uid: Option<String>,
    status: Option<StatusLine>,
}

impl MenuScene {
    pub const EVENTS: &'static [ServerEventKind] = &[];

    pub fn new(status: Option<StatusLine>) -> Self {
        Self {
            room_uid: None,
            status,
        }
    }

    pub fn status(&self) -> Option<&StatusLine> {
        self.status.as_ref()
    }

    pub fn room_uid(&self) -> Option<&str> {
        self.room_uid.as_deref()
    }

    pub fn set_room_uid(&mut self, room_uid: &str) {
        let trimmed = room_uid.trim();
        self.room_uid = (!trimmed.is_empty()).then(|| trimmed.to_string());
    }

    pub(crate) async fn on_action(
        &mut self,
        action: UiAction,
        ctx: &SceneContext<'_>,
    ) -> Transition {
        let outcome = match action {
            UiAction::SetRoomUid(uid) => {
                self.set_room_uid(&uid);
                return Transition::Stay;
            }
            UiAction::CreateRoom => self.create(ctx, false).await.map(|uid| (uid, false)),
            UiAction::CreateVsAi => self.create(ctx, true).await.map(|uid| (uid, true)),
            UiAction::JoinRoom => self.join(ctx).await.map(|uid| (uid, false)),
            _ => return Transition::Stay,
        };
        match outcome {
            Ok((room_uid, vs_ai)) => Transition::Lobby { room_uid, vs_ai },
            Err(line) => {
                self.status = Some(line);
                Transition::Stay
            }
        }
    }

    async fn create(&mut self, ctx: &SceneContext<'_>, vs_ai: bool) -> Result<String, StatusLine> {
        self.status = Some(StatusLine::success("Creating room..."));
        require(ctx.session.token(), Missing::Token)?;

        let created = if vs_ai {
            let car = require(ctx.session.car_uid(), Missing::CarUid)?;
            ctx.rooms.create_room_vs_ai(car).await
        } else {
            ctx.rooms
                .create_room(&default_room_request(Utc::now()))
                .await
        }
        .map_err(|e| StatusLine::failure("Error", &e))?;

        let Some(room_uid) = created.room_uid.filter(|uid| !uid.is_empty()) else {
            error!("Room created without a room UID");
            return Err(StatusLine::danger("Room created but UID missing"));
        };
        info!(room = %room_uid, vs_ai, "Room created");
        self.status = Some(StatusLine::success(format!(
            "Room created: {}...",
            labels::prefix(&room_uid, 10)
        )));

        let car = require(ctx.session.car_uid(), Missing::CarUid)?;
        self.status = Some(StatusLine::success("Joining room..."));
        ctx.realtime
            .join_room(&room_uid, car)
            .await
            .map_err(|e| StatusLine::failure("Error joining", &e))?;
        Ok(room_uid)
    }

    async fn join(&mut self, ctx: &SceneContext<'_>) -> Result<String, StatusLine> {
        let room_uid = require(self.room_uid.as_deref(), Missing::RoomUid)?.to_string();
        require(ctx.session.token(), Missing::Token)?;
        let car = require(ctx.session.car_uid(), Missing::CarUid)?;

        self.status = Some(StatusLine::success("Joining room..."));
        ctx.realtime
            .join_room(&room_uid, car)
            .await
            .map_err(|e| StatusLine::failure("Error", &e))?;
        self.status = Some(StatusLine::success("Joined successfully!"));
        Ok(room_uid)
    }

    pub fn text_items(&self, vp: &Viewport) -> Vec<TextItem> {
        let cx = vp.canvas_width / 2.0;
        let room = match &self.room_uid {
            Some(uid) => format!("Room: {}", labels::prefix(uid, 20)),
            None => "Enter Room UID...".to_string(),
        };
        let mut items = vec![
            TextItem::new("LANE RACER", ScreenPos::new(cx, 80.0), palette::TEXT_PRIMARY),
            TextItem::new(
                "Endless Race Mode",
                ScreenPos::new(cx, 130.0),
                palette::TEXT_SECONDARY,
            ),
            TextItem::new("CREATE ROOM", ScreenPos::new(cx, 250.0), palette::TEXT_PRIMARY),
            TextItem::new(room, ScreenPos::new(cx, 370.0), palette::TEXT_SECONDARY),
            TextItem::new("JOIN ROOM", ScreenPos::new(cx, 430.0), palette::TEXT_PRIMARY),
        ];
        if let Some(status) = &self.status {
            items.push(TextItem::new(
                status.text.clone(),
                ScreenPos::new(cx, 520.0),
                status.tone.color(),
            ));
        }
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn room_request_defaults() {
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        let req = default_room_request(now);
        assert_eq!(req.game_mode, "ENDLESS_RACE");
        assert_eq!(req.max_players, 1);
        assert_eq!(req.entry_fee, "1000000");
        assert_eq!(req.deadline, "2026-03-01T13:00:00.000Z");
    }

    #[test]
    fn blank_room_uid_is_unset() {
        let mut menu = MenuScene::default();
        menu.set_room_uid("  r-42 ");
        assert_eq!(menu.room_uid(), Some("r-42"));
        menu.set_room_uid("   ");
        assert_eq!(menu.room_uid(), None);
    }
}
