//! Network seams used by the scenes.
//!
//! Scenes only talk to the backend through these traits, so they can run
//! against the real transport/HTTP clients or against in-memory fakes.

use async_trait::async_trait;
use race_shared::{
    net::InputAction,
    room::{CreateRoom, CreatedRoom, RaceResult, RoomInfo},
};
use serde_json::Value;

use crate::error::ClientError;

/// Acknowledged operations over the realtime channel.
#[async_trait]
pub trait Realtime: Send + Sync {
    async fn join_room(&self, room_uid: &str, car_uid: &str) -> Result<Value, ClientError>;
    async fn mark_ready(&self, room_uid: &str) -> Result<Value, ClientError>;
    async fn room_state(&self, room_uid: &str) -> Result<RoomInfo, ClientError>;
    async fn leave_room(&self, room_uid: &str) -> Result<(), ClientError>;
    /// Fire-and-forget; acknowledgement errors are only logged.
    fn send_input(&self, room_uid: &str, action: InputAction);
}

/// HTTP operations the scenes need.
#[async_trait]
pub trait RoomApi: Send + Sync {
    async fn create_room(&self, req: &CreateRoom) -> Result<CreatedRoom, ClientError>;
    async fn create_room_vs_ai(&self, car_uid: &str) -> Result<CreatedRoom, ClientError>;
    async fn race_result(&self, room_uid: &str) -> Result<RaceResult, ClientError>;
}
