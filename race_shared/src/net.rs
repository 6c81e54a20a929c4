//! Realtime wire protocol.
//!
//! Every WebSocket text frame is a JSON envelope:
//! - client -> server: `{"event": NAME, "ack": ID?, "data": PAYLOAD}`
//! - server -> client acknowledgement: `{"ack": ID, "data": {"success", "data"?, "message"?}}`
//! - server -> client push: `{"event": NAME, "data": PAYLOAD}`
//!
//! Decoding is explicit (name first, then payload) so unknown events can be
//! skipped without tearing down the connection.

use std::fmt;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    room::{RaceResult, RoomInfo},
    world::WorldSnapshot,
};

/// Events the client sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientEvent {
    PlayerJoin,
    PlayerReady,
    PlayerInput,
    GetRoomState,
    PlayerLeave,
}

impl ClientEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            ClientEvent::PlayerJoin => "PLAYER_JOIN",
            ClientEvent::PlayerReady => "PLAYER_READY",
            ClientEvent::PlayerInput => "PLAYER_INPUT",
            ClientEvent::GetRoomState => "GET_ROOM_STATE",
            ClientEvent::PlayerLeave => "PLAYER_LEAVE",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "PLAYER_JOIN" => Some(ClientEvent::PlayerJoin),
            "PLAYER_READY" => Some(ClientEvent::PlayerReady),
            "PLAYER_INPUT" => Some(ClientEvent::PlayerInput),
            "GET_ROOM_STATE" => Some(ClientEvent::GetRoomState),
            "PLAYER_LEAVE" => Some(ClientEvent::PlayerLeave),
            _ => None,
        }
    }
}

impl fmt::Display for ClientEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names of events the server pushes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ServerEventKind {
    LobbyUpdate,
    PlayerJoined,
    PlayerLeft,
    GameStart,
    GameState,
    GameEnd,
    Error,
}

impl ServerEventKind {
    pub const ALL: [ServerEventKind; 7] = [
        ServerEventKind::LobbyUpdate,
        ServerEventKind::PlayerJoined,
        ServerEventKind::PlayerLeft,
        ServerEventKind::GameStart,
        ServerEventKind::GameState,
        ServerEventKind::GameEnd,
        ServerEventKind::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ServerEventKind::LobbyUpdate => "LOBBY_UPDATE",
            ServerEventKind::PlayerJoined => "PLAYER_JOINED",
            ServerEventKind::PlayerLeft => "PLAYER_LEFT",
            ServerEventKind::GameStart => "GAME_START",
            ServerEventKind::GameState => "GAME_STATE",
            ServerEventKind::GameEnd => "GAME_END",
            ServerEventKind::Error => "ERROR",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for ServerEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Player intent. Matches the backend's action enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InputAction {
    Accelerate,
    Brake,
    TurnLeft,
    TurnRight,
    Drift,
    Boost,
}

impl InputAction {
    pub fn as_str(self) -> &'static str {
        match self {
            InputAction::Accelerate => "ACCELERATE",
            InputAction::Brake => "BRAKE",
            InputAction::TurnLeft => "TURN_LEFT",
            InputAction::TurnRight => "TURN_RIGHT",
            InputAction::Drift => "DRIFT",
            InputAction::Boost => "BOOST",
        }
    }
}

impl fmt::Display for InputAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Request payloads ───

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPayload {
    pub room_uid: String,
    pub car_uid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPayload {
    pub room_uid: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InputPayload {
    pub room_uid: String,
    pub action: InputAction,
}

// ─── Push payloads ───

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlayerJoined {
    #[serde(default)]
    pub player_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLeft {
    #[serde(default)]
    pub player_id: Option<String>,
}

/// Server-side error notification. The payload is either an object with a
/// `message` or a bare string.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ServerError {
    pub message: String,
}

impl ServerError {
    pub fn from_value(v: &Value) -> Self {
        let message = match v {
            Value::String(s) => s.clone(),
            Value::Object(map) => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| v.to_string()),
            Value::Null => "unknown error".to_string(),
            other => other.to_string(),
        };
        Self { message }
    }
}

/// A decoded server push.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerPush {
    LobbyUpdate(RoomInfo),
    PlayerJoined(PlayerJoined),
    PlayerLeft(PlayerLeft),
    GameStart(Value),
    GameState(Box<WorldSnapshot>),
    GameEnd(RaceResult),
    Error(ServerError),
}

impl ServerPush {
    pub fn kind(&self) -> ServerEventKind {
        match self {
            ServerPush::LobbyUpdate(_) => ServerEventKind::LobbyUpdate,
            ServerPush::PlayerJoined(_) => ServerEventKind::PlayerJoined,
            ServerPush::PlayerLeft(_) => ServerEventKind::PlayerLeft,
            ServerPush::GameStart(_) => ServerEventKind::GameStart,
            ServerPush::GameState(_) => ServerEventKind::GameState,
            ServerPush::GameEnd(_) => ServerEventKind::GameEnd,
            ServerPush::Error(_) => ServerEventKind::Error,
        }
    }

    /// Decodes a push payload for a known event name.
    pub fn from_parts(kind: ServerEventKind, data: Value) -> anyhow::Result<Self> {
        let push = match kind {
            ServerEventKind::LobbyUpdate => {
                ServerPush::LobbyUpdate(serde_json::from_value(data).context("LOBBY_UPDATE payload")?)
            }
            ServerEventKind::PlayerJoined => ServerPush::PlayerJoined(
                serde_json::from_value(data).context("PLAYER_JOINED payload")?,
            ),
            ServerEventKind::PlayerLeft => {
                ServerPush::PlayerLeft(serde_json::from_value(data).context("PLAYER_LEFT payload")?)
            }
            ServerEventKind::GameStart => ServerPush::GameStart(data),
            ServerEventKind::GameState => ServerPush::GameState(Box::new(
                serde_json::from_value(data).context("GAME_STATE payload")?,
            )),
            ServerEventKind::GameEnd => {
                ServerPush::GameEnd(serde_json::from_value(data).context("GAME_END payload")?)
            }
            ServerEventKind::Error => ServerPush::Error(ServerError::from_value(&data)),
        };
        Ok(push)
    }

    fn payload(&self) -> anyhow::Result<Value> {
        let v = match self {
            ServerPush::LobbyUpdate(room) => serde_json::to_value(room)?,
            ServerPush::PlayerJoined(p) => serde_json::to_value(p)?,
            ServerPush::PlayerLeft(p) => serde_json::to_value(p)?,
            ServerPush::GameStart(v) => v.clone(),
            ServerPush::GameState(snap) => serde_json::to_value(snap)?,
            ServerPush::GameEnd(result) => serde_json::to_value(result)?,
            ServerPush::Error(e) => serde_json::json!({ "message": e.message }),
        };
        Ok(v)
    }
}

/// Acknowledgement body returned for a request-style emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Ack {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Ack {
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
        }
    }
}

/// Client -> server envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundFrame {
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,
    #[serde(default)]
    pub data: Value,
}

impl OutboundFrame {
    pub fn new(event: ClientEvent, ack: Option<u64>, data: Value) -> Self {
        Self {
            event: event.as_str().to_string(),
            ack,
            data,
        }
    }
}

#[derive(Deserialize)]
struct RawInbound {
    #[serde(default)]
    event: Option<String>,
    #[serde(default)]
    ack: Option<u64>,
    #[serde(default)]
    data: Value,
}

/// A decoded server -> client frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Ack { id: u64, ack: Ack },
    Push(ServerPush),
    /// A push with a name this client does not know.
    Unknown { event: String },
}

pub fn encode_outbound(frame: &OutboundFrame) -> anyhow::Result<String> {
    serde_json::to_string(frame).context("serialize outbound frame")
}

pub fn decode_outbound(text: &str) -> anyhow::Result<OutboundFrame> {
    serde_json::from_str(text).context("deserialize outbound frame")
}

pub fn decode_inbound(text: &str) -> anyhow::Result<Inbound> {
    let raw: RawInbound = serde_json::from_str(text).context("deserialize inbound frame")?;
    if let Some(id) = raw.ack {
        let ack = if raw.data.is_null() {
            Ack::default()
        } else {
            serde_json::from_value(raw.data).context("deserialize ack")?
        };
        return Ok(Inbound::Ack { id, ack });
    }
    let Some(event) = raw.event else {
        anyhow::bail!("frame has neither event nor ack");
    };
    match ServerEventKind::from_name(&event) {
        Some(kind) => Ok(Inbound::Push(ServerPush::from_parts(kind, raw.data)?)),
        None => Ok(Inbound::Unknown { event }),
    }
}

/// Server-side helper: encodes an acknowledgement frame.
pub fn encode_ack(id: u64, ack: &Ack) -> anyhow::Result<String> {
    let frame = serde_json::json!({ "ack": id, "data": ack });
    serde_json::to_string(&frame).context("serialize ack frame")
}

/// Server-side helper: encodes a push frame.
pub fn encode_push(push: &ServerPush) -> anyhow::Result<String> {
    let frame = serde_json::json!({ "event": push.kind().as_str(), "data": push.payload()? });
    serde_json::to_string(&frame).context("serialize push frame")
}
