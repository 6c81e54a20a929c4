//! Configuration system.
//!
//! Loads client configuration from JSON strings/files, then overlays
//! environment variables. The host page (or a launcher script) pre-seeds
//! credentials through the environment.

use std::{path::Path, time::Duration};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::viewport::Viewport;

pub const ENV_API_URL: &str = "RACE_API_URL";
pub const ENV_REALTIME_URL: &str = "RACE_REALTIME_URL";
pub const ENV_TOKEN: &str = "RACE_TOKEN";
pub const ENV_PLAYER_ADDRESS: &str = "RACE_PLAYER_ADDRESS";
pub const ENV_CAR_UID: &str = "RACE_CAR_UID";

/// Reconnection policy for the realtime connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Attempts after a lost or failed connection before giving up.
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Relative jitter applied to each delay, in `[0, 1]`.
    pub jitter: f64,
    pub connect_timeout_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 1000,
            max_delay_ms: 5000,
            jitter: 0.5,
            connect_timeout_ms: 10_000,
        }
    }
}

impl ReconnectPolicy {
    /// Un-jittered delay before reconnection attempt `attempt` (1-based).
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        let ms = self
            .initial_delay_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Root configuration for the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// HTTP API base, e.g. `http://localhost:3000/api`.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Explicit WebSocket URL; derived from `api_base_url` when absent.
    #[serde(default)]
    pub realtime_url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub player_address: Option<String>,
    #[serde(default)]
    pub car_uid: Option<String>,
    #[serde(default)]
    pub reconnect: ReconnectPolicy,
    #[serde(default)]
    pub viewport: Viewport,
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
    /// Render rate of the console client.
    #[serde(default = "default_frame_hz")]
    pub frame_hz: u32,
}

fn default_api_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_frame_hz() -> u32 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            realtime_url: None,
            token: None,
            player_address: None,
            car_uid: None,
            reconnect: ReconnectPolicy::default(),
            viewport: Viewport::default(),
            http_timeout_secs: default_http_timeout_secs(),
            frame_hz: default_frame_hz(),
        }
    }
}

impl ClientConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    pub fn load_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("parse config {}", path.display()))
    }

    /// Overlays values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Overlays values from `lookup`; empty values are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get(ENV_API_URL) {
            debug!(key = ENV_API_URL, "config from environment");
            self.api_base_url = v;
        }
        if let Some(v) = get(ENV_REALTIME_URL) {
            self.realtime_url = Some(v);
        }
        if let Some(v) = get(ENV_TOKEN) {
            debug!(key = ENV_TOKEN, "config from environment");
            self.token = Some(v);
        }
        if let Some(v) = get(ENV_PLAYER_ADDRESS) {
            self.player_address = Some(v);
        }
        if let Some(v) = get(ENV_CAR_UID) {
            self.car_uid = Some(v);
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// WebSocket endpoint: the explicit URL, or the API base with its
    /// `/api` suffix removed, an upgraded scheme and `/ws` appended.
    pub fn realtime_endpoint(&self) -> String {
        if let Some(url) = &self.realtime_url {
            return url.clone();
        }
        derive_realtime_url(&self.api_base_url)
    }
}

pub fn derive_realtime_url(api_base_url: &str) -> String {
    let base = api_base_url.trim_end_matches('/');
    let base = base.strip_suffix("/api").unwrap_or(base);
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{base}/ws")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg = ClientConfig::from_json_str(r#"{"token": "jwt", "viewport": {"scale": 10}}"#)
            .unwrap();
        assert_eq!(cfg.api_base_url, "http://localhost:3000/api");
        assert_eq!(cfg.token.as_deref(), Some("jwt"));
        assert_eq!(cfg.viewport.scale, 10.0);
        assert_eq!(cfg.viewport.canvas_width, 800.0);
        assert_eq!(cfg.reconnect.max_attempts, 5);
    }

    #[test]
    fn env_overlays_non_empty_values() {
        let mut cfg = ClientConfig::default();
        cfg.car_uid = Some("car-from-file".into());
        cfg.apply_env_from(|key| match key {
            ENV_TOKEN => Some("env-jwt".to_string()),
            ENV_CAR_UID => Some("  ".to_string()),
            _ => None,
        });
        assert_eq!(cfg.token.as_deref(), Some("env-jwt"));
        assert_eq!(cfg.car_uid.as_deref(), Some("car-from-file"));
    }

    #[test]
    fn backoff_doubles_up_to_cap() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.base_delay(1), Duration::from_millis(1000));
        assert_eq!(policy.base_delay(2), Duration::from_millis(2000));
        assert_eq!(policy.base_delay(3), Duration::from_millis(4000));
        assert_eq!(policy.base_delay(4), Duration::from_millis(5000));
        assert_eq!(policy.base_delay(40), Duration::from_millis(5000));
    }

    #[test]
    fn realtime_url_derivation() {
        assert_eq!(
            derive_realtime_url("http://localhost:3000/api"),
            "ws://localhost:3000/ws"
        );
        assert_eq!(
            derive_realtime_url("https://race.example.com/api/"),
            "wss://race.example.com/ws"
        );

        let mut cfg = ClientConfig::default();
        cfg.realtime_url = Some("ws://other:9000/socket".into());
        assert_eq!(cfg.realtime_endpoint(), "ws://other:9000/socket");
    }
}
