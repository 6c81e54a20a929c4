//! `race_client`
//!
//! Client-side systems:
//! - Realtime transport with acknowledged requests and push listeners
//! - HTTP API client
//! - Scene state machine (menu, lobby, race, results)
//! - Snapshot reconciliation into pooled drawables
//! - HUD and frame composition for a render backend

pub mod console;
pub mod error;
pub mod frame;
pub mod gateway;
pub mod hud;
pub mod input;
pub mod labels;
pub mod listeners;
pub mod reconcile;
pub mod rest;
pub mod scene;
pub mod status;
pub mod transport;

pub use error::ClientError;
pub use listeners::{ListenerScope, Listeners};
pub use rest::Api;
pub use scene::{SceneKind, SceneMachine, UiAction};
pub use transport::{ConnectionState, Transport};
