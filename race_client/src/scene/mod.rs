//! Scene state machine.
//!
//! The client is always in exactly one of four scenes:
//!
//! ```text
//!   Menu ──create/join──▶ Lobby ──GAME_START──▶ Race ──FINISHED / GAME_END──▶ Result
//!    ▲                      │                                                   │
//!    └────────leave─────────┘◀──────────────────back to menu────────────────────┘
//! ```
//!
//! Each scene owns a [`ListenerScope`] for the pushes it handles. On a
//! transition the old scope is released before the next scene subscribes,
//! so no listener outlives its scene.

mod lobby;
mod menu;
mod race;
mod result;

pub use lobby::LobbyScene;
pub use menu::{default_room_request, MenuScene};
pub use race::RaceScene;
pub use result::{ResultScene, ResultSource};

use std::{fmt, sync::Arc};

use race_shared::{
    net::{ServerEventKind, ServerPush},
    render::RenderBackend,
    room::RaceResult,
    session::Session,
    viewport::Viewport,
};
use tracing::{debug, info};

use crate::{
    frame,
    gateway::{Realtime, RoomApi},
    input::Key,
    listeners::{ListenerScope, Listeners},
    status::StatusLine,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneKind {
    Menu,
    Lobby,
    Race,
    Result,
}

impl SceneKind {
    pub fn label(self) -> &'static str {
        match self {
            SceneKind::Menu => "menu",
            SceneKind::Lobby => "lobby",
            SceneKind::Race => "race",
            SceneKind::Result => "result",
        }
    }
}

impl fmt::Display for SceneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// User intents, as produced by the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    CreateRoom,
    CreateVsAi,
    SetRoomUid(String),
    JoinRoom,
    MarkReady,
    LeaveRoom,
    Steer(Key),
    BackToMenu,
    SetCarUid(String),
    SetPlayerAddress(String),
}

/// Outcome of handling one action or push.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    Stay,
    Menu(Option<StatusLine>),
    Lobby { room_uid: String, vs_ai: bool },
    Race { room_uid: String },
    Result {
        room_uid: String,
        result: Option<RaceResult>,
    },
}

#[derive(Debug)]
pub enum Scene {
    Menu(MenuScene),
    Lobby(LobbyScene),
    Race(RaceScene),
    Result(ResultScene),
}

impl Scene {
    pub fn kind(&self) -> SceneKind {
        match self {
            Scene::Menu(_) => SceneKind::Menu,
            Scene::Lobby(_) => SceneKind::Lobby,
            Scene::Race(_) => SceneKind::Race,
            Scene::Result(_) => SceneKind::Result,
        }
    }
}

/// What a scene may touch while handling an event.
pub(crate) struct SceneContext<'a> {
    pub session: &'a Session,
    pub realtime: &'a dyn Realtime,
    pub rooms: &'a dyn RoomApi,
}

pub struct SceneMachine {
    session: Session,
    realtime: Arc<dyn Realtime>,
    rooms: Arc<dyn RoomApi>,
    listeners: Listeners,
    viewport: Viewport,
    scene: Scene,
    scope: ListenerScope,
    transitions: u32,
}

impl SceneMachine {
    pub fn new(
        session: Session,
        realtime: Arc<dyn Realtime>,
        rooms: Arc<dyn RoomApi>,
        listeners: Listeners,
        viewport: Viewport,
    ) -> Self {
        Self {
            session,
            realtime,
            rooms,
            listeners,
            viewport,
            scene: Scene::Menu(MenuScene::default()),
            scope: ListenerScope::empty(SceneKind::Menu.label()),
            transitions: 0,
        }
    }

    pub fn kind(&self) -> SceneKind {
        self.scene.kind()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Scene changes since start.
    pub fn transitions(&self) -> u32 {
        self.transitions
    }

    /// Events the active scene listens to.
    pub fn subscribed(&self) -> Vec<ServerEventKind> {
        self.scope.events()
    }

    pub fn render(&self, out: &mut dyn RenderBackend) {
        frame::render_scene(&self.scene, &self.viewport, out);
    }

    pub async fn handle_action(&mut self, action: UiAction) {
        match action {
            UiAction::SetCarUid(car) => {
                info!(car = %car, "Car selected");
                self.session.set_car_uid(car);
                return;
            }
            UiAction::SetPlayerAddress(addr) => {
                info!(address = %addr, "Player address set");
                self.session.set_player_address(addr);
                return;
            }
            _ => {}
        }

        let ctx = SceneContext {
            session: &self.session,
            realtime: self.realtime.as_ref(),
            rooms: self.rooms.as_ref(),
        };
        let next = match &mut self.scene {
            Scene::Menu(s) => s.on_action(action, &ctx).await,
            Scene::Lobby(s) => s.on_action(action, &ctx).await,
            Scene::Race(s) => s.on_action(action, &ctx),
            Scene::Result(s) => s.on_action(action),
        };
        self.apply(next).await;
    }

    pub async fn on_push(&mut self, push: ServerPush) {
        let next = match &mut self.scene {
            Scene::Menu(_) => {
                debug!(event = %push.kind(), "Push ignored in menu");
                Transition::Stay
            }
            Scene::Lobby(s) => s.on_push(push),
            Scene::Race(s) => s.on_push(push),
            Scene::Result(s) => s.on_push(push),
        };
        self.apply(next).await;
    }

    /// Handles every push already queued for the active scene. Returns how
    /// many were handled.
    pub async fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(push) = self.scope.try_recv() {
            self.on_push(push).await;
            handled += 1;
        }
        handled
    }

    /// Waits for the next push addressed to the active scene.
    pub async fn next_push(&mut self) -> Option<ServerPush> {
        self.scope.recv().await
    }

    /// A `GAME_END` still queued behind the push that ended the race.
    fn take_queued_result(&mut self) -> Option<RaceResult> {
        let mut found = None;
        while let Some(push) = self.scope.try_recv() {
            if let ServerPush::GameEnd(result) = push {
                found = Some(result);
            }
        }
        found
    }

    async fn apply(&mut self, mut next: Transition) {
        if next == Transition::Stay {
            return;
        }
        if let Transition::Result { result, .. } = &mut next {
            if result.is_none() {
                *result = self.take_queued_result();
            }
        }

        let from = self.kind();
        self.scope.release();

        let scene = match next {
            Transition::Stay => return,
            Transition::Menu(status) => Scene::Menu(MenuScene::new(status)),
            Transition::Lobby { room_uid, vs_ai } => Scene::Lobby(LobbyScene::new(room_uid, vs_ai)),
            Transition::Race { room_uid } => Scene::Race(RaceScene::new(
                room_uid,
                self.viewport.clone(),
                self.session.player_id(),
            )),
            Transition::Result { room_uid, result } => {
                Scene::Result(ResultScene::new(room_uid, result))
            }
        };
        let events = match &scene {
            Scene::Menu(_) => MenuScene::EVENTS,
            Scene::Lobby(_) => LobbyScene::EVENTS,
            Scene::Race(_) => RaceScene::EVENTS,
            Scene::Result(_) => ResultScene::EVENTS,
        };
        self.scope = ListenerScope::new(&self.listeners, scene.kind().label(), events);
        self.scene = scene;
        self.transitions += 1;
        info!(from = %from, to = %self.kind(), "Scene transition");

        let ctx = SceneContext {
            session: &self.session,
            realtime: self.realtime.as_ref(),
            rooms: self.rooms.as_ref(),
        };
        match &mut self.scene {
            Scene::Lobby(s) => s.on_enter(&ctx).await,
            Scene::Result(s) => s.on_enter(&ctx).await,
            Scene::Menu(_) | Scene::Race(_) => {}
        }
    }
}
