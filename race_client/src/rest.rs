//! HTTP API client.
//!
//! Every route answers with the same JSON envelope
//! `{"success": bool, "data"?: ..., "message"?: ...}`. A non-OK status is an
//! error carrying the server message when there is one, otherwise a generic
//! `HTTP <code>: <reason>` line.

use std::time::Duration;

use async_trait::async_trait;
use race_shared::{
    net::InputAction,
    room::{CreateRoom, CreatedRoom, RaceResult, RoomFilter, RoomInfo},
    session::Session,
    world::WorldSnapshot,
};
use reqwest::{header::CONTENT_TYPE, Method, Url};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::{error::ClientError, gateway::RoomApi};

/// Response envelope shared by all routes.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct ApiEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiEnvelope {
    /// Payload of a successful envelope, decoded as `T`. A missing `data`
    /// decodes as `null`, so routes that must return a body still fail.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T, ClientError> {
        if !self.success {
            return Err(ClientError::Rejected(
                self.message
                    .filter(|m| !m.is_empty())
                    .unwrap_or_else(|| "Request failed".to_string()),
            ));
        }
        serde_json::from_value(self.data.unwrap_or(Value::Null)).map_err(ClientError::from)
    }
}

/// Interprets a raw HTTP response.
pub fn parse_envelope(status: u16, reason: &str, body: &str) -> Result<ApiEnvelope, ClientError> {
    let parsed = serde_json::from_str::<ApiEnvelope>(body);
    if !(200..300).contains(&status) {
        let message = parsed
            .ok()
            .and_then(|e| e.message)
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("HTTP {status}: {reason}"));
        return Err(ClientError::Http { status, message });
    }
    parsed.map_err(ClientError::from)
}

pub struct Api {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl Api {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn from_session(session: &Session, timeout: Duration) -> Result<Self, ClientError> {
        let mut api = Self::new(&session.api_base_url, timeout)?;
        api.set_token(session.token());
        Ok(api)
    }

    pub fn set_token(&mut self, token: Option<&str>) {
        self.token = token.map(str::to_string);
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Base URL plus `segments`, each percent-encoded as one path segment.
    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::Transport(format!("invalid API base URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| ClientError::Transport("API base URL cannot take a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn call(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> Result<ApiEnvelope, ClientError> {
        let url = self.url(segments)?;
        let endpoint = url.path().to_string();
        let mut req = self
            .http
            .request(method.clone(), url)
            .header(CONTENT_TYPE, "application/json");
        if !query.is_empty() {
            req = req.query(query);
        }
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        debug!(%method, %endpoint, "API request");
        let result = async {
            let response = req.send().await?;
            let status = response.status();
            let text = response.text().await?;
            parse_envelope(
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown"),
                &text,
            )
        }
        .await;
        if let Err(e) = &result {
            error!(%method, %endpoint, error = %e, "API error");
        }
        result
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ClientError> {
        self.call(Method::GET, segments, &[], None)
            .await?
            .into_data()
    }

    async fn post<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: Option<Value>,
    ) -> Result<T, ClientError> {
        self.call(Method::POST, segments, &[], body)
            .await?
            .into_data()
    }

    pub async fn create_room(&self, req: &CreateRoom) -> Result<CreatedRoom, ClientError> {
        self.post(&["game", "room", "create"], Some(serde_json::to_value(req)?))
            .await
    }

    pub async fn create_room_vs_ai(&self, car_uid: &str) -> Result<CreatedRoom, ClientError> {
        self.post(&["game", "room", "create-vs-ai"], Some(json!({ "carUid": car_uid })))
            .await
    }

    pub async fn join_room(&self, room_uid: &str, car_uid: &str) -> Result<Value, ClientError> {
        self.post(
            &["game", "room", room_uid, "join"],
            Some(json!({ "carUid": car_uid })),
        )
        .await
    }

    pub async fn mark_ready(&self, room_uid: &str) -> Result<Value, ClientError> {
        self.post(&["game", "room", room_uid, "ready"], None)
            .await
    }

    pub async fn room_info(&self, room_uid: &str) -> Result<RoomInfo, ClientError> {
        self.get(&["game", "room", room_uid]).await
    }

    pub async fn list_rooms(&self, filter: &RoomFilter) -> Result<Vec<RoomInfo>, ClientError> {
        self.call(Method::GET, &["game", "rooms"], &filter.query_pairs(), None)
            .await?
            .into_data()
    }

    pub async fn game_state(&self, room_uid: &str) -> Result<WorldSnapshot, ClientError> {
        self.get(&["game", room_uid, "state"]).await
    }

    pub async fn submit_input(
        &self,
        room_uid: &str,
        action: InputAction,
    ) -> Result<Value, ClientError> {
        self.post(
            &["game", room_uid, "input"],
            Some(json!({ "action": action })),
        )
        .await
    }

    pub async fn race_result(&self, room_uid: &str) -> Result<RaceResult, ClientError> {
        self.get(&["game", room_uid, "result"]).await
    }

    pub async fn active_games(&self) -> Result<Value, ClientError> {
        self.get(&["game", "active"]).await
    }
}

#[async_trait]
impl RoomApi for Api {
    async fn create_room(&self, req: &CreateRoom) -> Result<CreatedRoom, ClientError> {
        Api::create_room(self, req).await
    }

    async fn create_room_vs_ai(&self, car_uid: &str) -> Result<CreatedRoom, ClientError> {
        Api::create_room_vs_ai(self, car_uid).await
    }

    async fn race_result(&self, room_uid: &str) -> Result<RaceResult, ClientError> {
        Api::race_result(self, room_uid).await
    }
}
