//! Session context.
//!
//! Credentials and selections shared by the HTTP and realtime clients. The
//! session is passed explicitly to the components that need it; there is no
//! rotation or expiry handling.

use crate::config::ClientConfig;

/// Player id used when no wallet address has been provided.
pub const UNKNOWN_PLAYER: &str = "UNKNOWN";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub api_base_url: String,
    pub token: Option<String>,
    /// Wallet address; doubles as the player id in snapshots.
    pub player_address: Option<String>,
    /// Selected vehicle.
    pub car_uid: Option<String>,
}

fn non_empty(v: &Option<String>) -> Option<&str> {
    v.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl Session {
    pub fn from_config(cfg: &ClientConfig) -> Self {
        Self {
            api_base_url: cfg.api_base_url.clone(),
            token: cfg.token.clone(),
            player_address: cfg.player_address.clone(),
            car_uid: cfg.car_uid.clone(),
        }
    }

    pub fn token(&self) -> Option<&str> {
        non_empty(&self.token)
    }

    pub fn car_uid(&self) -> Option<&str> {
        non_empty(&self.car_uid)
    }

    /// Id the local player appears under in world snapshots.
    pub fn player_id(&self) -> &str {
        non_empty(&self.player_address).unwrap_or(UNKNOWN_PLAYER)
    }

    pub fn set_car_uid(&mut self, car_uid: impl Into<String>) {
        self.car_uid = Some(car_uid.into());
    }

    pub fn set_player_address(&mut self, address: impl Into<String>) {
        self.player_address = Some(address.into());
    }
}
