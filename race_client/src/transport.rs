//! Realtime transport.
//!
//! One logical WebSocket connection to the backend, owned by a background
//! task. The task:
//! - performs the upgrade with a bearer token,
//! - matches acknowledgements to pending requests,
//! - hands pushes to the [`Listeners`] registry,
//! - reconnects with capped exponential backoff when the link drops.
//!
//! Outgoing frames are never buffered while disconnected: they are dropped
//! with a warning and request-style calls fail immediately.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Duration,
};

use anyhow::Context;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use race_shared::{
    config::{ClientConfig, ReconnectPolicy},
    net::{
        decode_inbound, encode_outbound, Ack, ClientEvent, Inbound, InputAction, InputPayload,
        JoinPayload, OutboundFrame, RoomPayload, ServerPush,
    },
    room::RoomInfo,
};
use rand::Rng;
use serde_json::Value;
use tokio::{
    net::TcpStream,
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
    time,
};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        client::IntoClientRequest,
        http::{header::AUTHORIZATION, HeaderValue},
        Message,
    },
    MaybeTlsStream, WebSocketStream,
};
use tracing::{debug, error, info, warn};

use crate::{error::ClientError, gateway::Realtime, listeners::Listeners};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    /// Waiting before reconnection attempt `attempt`.
    Reconnecting { attempt: u32 },
    Disconnected,
    /// Reconnection attempts exhausted; only a manual reconnect helps.
    Failed,
    /// Closed by the client.
    Closed,
}

enum Command {
    Send { text: String, ack: Option<u64> },
    Close,
    Reconnect,
}

struct Shared {
    state: watch::Sender<ConnectionState>,
    pending: Mutex<HashMap<u64, oneshot::Sender<Ack>>>,
    next_ack: AtomicU64,
    listeners: Listeners,
}

impl Shared {
    fn pending(&self) -> MutexGuard<'_, HashMap<u64, oneshot::Sender<Ack>>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
    }

    fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Drops one pending acknowledgement; its caller sees `ConnectionLost`.
    fn abandon(&self, id: u64) {
        self.pending().remove(&id);
    }

    fn fail_pending(&self) {
        let dropped = {
            let mut pending = self.pending();
            let n = pending.len();
            pending.clear();
            n
        };
        if dropped > 0 {
            warn!(requests = dropped, "Pending requests failed by disconnect");
        }
    }

    fn handle_text(&self, text: &str) {
        match decode_inbound(text) {
            Ok(Inbound::Ack { id, ack }) => match self.pending().remove(&id) {
                Some(tx) => {
                    let _ = tx.send(ack);
                }
                None => debug!(ack = id, "Acknowledgement without pending request"),
            },
            Ok(Inbound::Push(push)) => {
                if let ServerPush::Error(e) = &push {
                    error!(message = %e.message, "Server error");
                }
                self.listeners.dispatch(push);
            }
            Ok(Inbound::Unknown { event }) => debug!(%event, "Ignoring unknown event"),
            Err(e) => warn!(error = %e, "Undecodable frame"),
        }
    }
}

/// Handle to the realtime connection.
pub struct Transport {
    shared: Arc<Shared>,
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl Transport {
    /// Starts the connection task. Returns immediately; use
    /// [`Transport::wait_connected`] to wait for the first handshake.
    pub fn connect(cfg: &ClientConfig, token: Option<&str>, listeners: Listeners) -> Self {
        let endpoint = cfg.realtime_endpoint();
        info!(url = %endpoint, "Initializing realtime client");

        let (state, _) = watch::channel(ConnectionState::Connecting);
        let shared = Arc::new(Shared {
            state,
            pending: Mutex::new(HashMap::new()),
            next_ack: AtomicU64::new(1),
            listeners,
        });
        let (commands, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_connection(
            endpoint,
            token.map(str::to_string),
            cfg.reconnect.clone(),
            shared.clone(),
            rx,
        ));

        Self {
            shared,
            commands,
            task,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    pub fn listeners(&self) -> &Listeners {
        &self.shared.listeners
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// Waits until connected, failed or closed, up to `timeout`.
    pub async fn wait_connected(&self, timeout: Duration) -> Result<(), ClientError> {
        let mut rx = self.watch_state();
        let settled = rx.wait_for(|s| {
            matches!(
                s,
                ConnectionState::Connected | ConnectionState::Failed | ConnectionState::Closed
            )
        });
        let result = match time::timeout(timeout, settled).await {
            Ok(Ok(state)) if *state == ConnectionState::Connected => Ok(()),
            Ok(Ok(_)) | Err(_) => Err(ClientError::NotConnected),
            Ok(Err(_)) => Err(ClientError::ConnectionLost),
        };
        result
    }

    /// Closes the socket and stops reconnecting.
    pub fn disconnect(&self) {
        info!("Disconnecting realtime client");
        let _ = self.commands.send(Command::Close);
    }

    /// Restarts the connection loop after a close or exhausted retries.
    pub fn reconnect(&self) {
        info!("Manual reconnect");
        let _ = self.commands.send(Command::Reconnect);
    }

    fn emit_frame(
        &self,
        event: ClientEvent,
        ack: Option<u64>,
        data: Value,
    ) -> Result<(), ClientError> {
        if !self.is_connected() {
            warn!(%event, "Not connected; event dropped");
            return Err(ClientError::NotConnected);
        }
        let text = encode_outbound(&OutboundFrame::new(event, ack, data))
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        self.commands
            .send(Command::Send { text, ack })
            .map_err(|_| ClientError::ConnectionLost)
    }

    fn register_ack(&self) -> (u64, oneshot::Receiver<Ack>) {
        let id = self.shared.next_ack.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.shared.pending().insert(id, tx);
        (id, rx)
    }

    /// Fire-and-forget emit without an acknowledgement.
    pub fn emit(&self, event: ClientEvent, data: Value) -> Result<(), ClientError> {
        self.emit_frame(event, None, data)
    }

    /// Sends `data` and waits for the single acknowledgement.
    pub async fn request(&self, event: ClientEvent, data: Value) -> Result<Ack, ClientError> {
        let (id, rx) = self.register_ack();
        if let Err(e) = self.emit_frame(event, Some(id), data) {
            self.shared.abandon(id);
            return Err(e);
        }
        rx.await.map_err(|_| ClientError::ConnectionLost)
    }

    /// Like [`Transport::request`], but maps a non-success acknowledgement
    /// to `Rejected` with the server message or `fallback`.
    pub async fn request_data(
        &self,
        event: ClientEvent,
        data: Value,
        fallback: &str,
    ) -> Result<Value, ClientError> {
        let ack = self.request(event, data).await?;
        if ack.success {
            Ok(ack.data.unwrap_or(Value::Null))
        } else {
            let message = ack
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| fallback.to_string());
            Err(ClientError::Rejected(message))
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn to_value<T: serde::Serialize>(payload: T) -> Result<Value, ClientError> {
    serde_json::to_value(payload).map_err(ClientError::from)
}

#[async_trait]
impl Realtime for Transport {
    async fn join_room(&self, room_uid: &str, car_uid: &str) -> Result<Value, ClientError> {
        info!(room = room_uid, car = car_uid, "Joining room");
        let payload = to_value(JoinPayload {
            room_uid: room_uid.to_string(),
            car_uid: car_uid.to_string(),
        })?;
        let result = self
            .request_data(ClientEvent::PlayerJoin, payload, "Failed to join room")
            .await;
        match &result {
            Ok(_) => info!(room = room_uid, "Joined room"),
            Err(e) => error!(room = room_uid, error = %e, "Join room failed"),
        }
        result
    }

    async fn mark_ready(&self, room_uid: &str) -> Result<Value, ClientError> {
        info!(room = room_uid, "Marking ready");
        let payload = to_value(RoomPayload {
            room_uid: room_uid.to_string(),
        })?;
        let result = self
            .request_data(ClientEvent::PlayerReady, payload, "Failed to mark ready")
            .await;
        if let Err(e) = &result {
            error!(room = room_uid, error = %e, "Mark ready failed");
        }
        result
    }

    async fn room_state(&self, room_uid: &str) -> Result<RoomInfo, ClientError> {
        let payload = to_value(RoomPayload {
            room_uid: room_uid.to_string(),
        })?;
        let data = self
            .request_data(ClientEvent::GetRoomState, payload, "Failed to get room state")
            .await?;
        serde_json::from_value(data).map_err(ClientError::from)
    }

    async fn leave_room(&self, room_uid: &str) -> Result<(), ClientError> {
        info!(room = room_uid, "Leaving room");
        let payload = to_value(RoomPayload {
            room_uid: room_uid.to_string(),
        })?;
        self.request_data(ClientEvent::PlayerLeave, payload, "Failed to leave room")
            .await
            .map(|_| ())
    }

    fn send_input(&self, room_uid: &str, action: InputAction) {
        let payload = match to_value(InputPayload {
            room_uid: room_uid.to_string(),
            action,
        }) {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, "Encode input");
                return;
            }
        };
        let (id, rx) = self.register_ack();
        if self
            .emit_frame(ClientEvent::PlayerInput, Some(id), payload)
            .is_err()
        {
            self.shared.abandon(id);
            return;
        }
        debug!(%action, "Input sent");
        tokio::spawn(async move {
            if let Ok(ack) = rx.await {
                if !ack.success {
                    error!(
                        %action,
                        message = ack.message.as_deref().unwrap_or("unknown"),
                        "Input rejected"
                    );
                }
            }
        });
    }
}

// ─── Connection task ───

enum PumpOutcome {
    /// Closed on request of this client.
    Closed,
    /// Lost for any other reason; reconnection applies.
    Lost(String),
}

enum Interrupt {
    Elapsed,
    Reconnect,
    Close,
}

async fn open(endpoint: &str, token: Option<&str>, timeout: Duration) -> anyhow::Result<WsStream> {
    let mut request = endpoint
        .into_client_request()
        .context("build websocket request")?;
    if let Some(token) = token {
        let value =
            HeaderValue::from_str(&format!("Bearer {token}")).context("authorization header")?;
        request.headers_mut().insert(AUTHORIZATION, value);
    }
    let (ws, _response) = time::timeout(timeout, connect_async(request))
        .await
        .context("connect timed out")?
        .context("websocket handshake")?;
    Ok(ws)
}

fn jittered(base: Duration, jitter: f64) -> Duration {
    // NaN survives `clamp`; treat it as no jitter.
    let jitter = if jitter.is_finite() { jitter.clamp(0.0, 1.0) } else { 0.0 };
    if jitter == 0.0 {
        return base;
    }
    let factor = rand::thread_rng().gen_range((1.0 - jitter)..=(1.0 + jitter));
    base.mul_f64(factor)
}

/// Drops a frame that cannot be sent; its acknowledgement, if any, fails.
fn drop_unsent(shared: &Shared, ack: Option<u64>) {
    warn!("Not connected; event dropped");
    if let Some(id) = ack {
        shared.abandon(id);
    }
}

async fn run_connection(
    endpoint: String,
    token: Option<String>,
    policy: ReconnectPolicy,
    shared: Arc<Shared>,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    let mut attempt: u32 = 0;
    loop {
        match open(&endpoint, token.as_deref(), policy.connect_timeout()).await {
            Ok(ws) => {
                if attempt > 0 {
                    info!(attempts = attempt, "Reconnected");
                } else {
                    info!(url = %endpoint, "Connected");
                }
                attempt = 0;
                shared.set_state(ConnectionState::Connected);

                let outcome = pump(ws, &shared, &mut commands).await;
                shared.fail_pending();
                match outcome {
                    PumpOutcome::Closed => {
                        shared.set_state(ConnectionState::Closed);
                        info!("Disconnected by client");
                        if !wait_for_reconnect(&shared, &mut commands).await {
                            return;
                        }
                        shared.set_state(ConnectionState::Connecting);
                        continue;
                    }
                    PumpOutcome::Lost(reason) => {
                        warn!(%reason, "Disconnected");
                        shared.set_state(ConnectionState::Disconnected);
                    }
                }
            }
            Err(e) => {
                error!(error = %format!("{e:#}"), "Connection error");
                shared.set_state(ConnectionState::Disconnected);
            }
        }

        attempt += 1;
        if attempt > policy.max_attempts {
            error!(attempts = policy.max_attempts, "Reconnection failed after all attempts");
            shared.set_state(ConnectionState::Failed);
            if !wait_for_reconnect(&shared, &mut commands).await {
                return;
            }
            attempt = 0;
            shared.set_state(ConnectionState::Connecting);
            continue;
        }

        let delay = jittered(policy.base_delay(attempt), policy.jitter);
        shared.set_state(ConnectionState::Reconnecting { attempt });
        info!(attempt, delay_ms = delay.as_millis() as u64, "Reconnection attempt");
        match sleep_draining(delay, &shared, &mut commands).await {
            Interrupt::Elapsed => {}
            Interrupt::Reconnect => attempt = 0,
            Interrupt::Close => {
                shared.set_state(ConnectionState::Closed);
                if !wait_for_reconnect(&shared, &mut commands).await {
                    return;
                }
                attempt = 0;
                shared.set_state(ConnectionState::Connecting);
            }
        }
    }
}

async fn pump(
    ws: WsStream,
    shared: &Shared,
    commands: &mut mpsc::UnboundedReceiver<Command>,
) -> PumpOutcome {
    let (mut sink, mut stream) = ws.split();
    loop {
        tokio::select! {
            cmd = commands.recv() => match cmd {
                Some(Command::Send { text, ack }) => {
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        if let Some(id) = ack {
                            shared.abandon(id);
                        }
                        return PumpOutcome::Lost(e.to_string());
                    }
                }
                Some(Command::Reconnect) => debug!("Already connected"),
                Some(Command::Close) | None => {
                    let _ = sink.send(Message::Close(None)).await;
                    return PumpOutcome::Closed;
                }
            },
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => shared.handle_text(&text),
                Some(Ok(Message::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                    Ok(text) => shared.handle_text(text),
                    Err(_) => warn!(len = bytes.len(), "Non-UTF-8 binary frame ignored"),
                },
                Some(Ok(Message::Ping(_))) => {
                    // Flush the pong queued by the protocol layer.
                    let _ = sink.flush().await;
                }
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.as_str().to_string())
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| "server disconnect".to_string());
                    return PumpOutcome::Lost(reason);
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => return PumpOutcome::Lost(e.to_string()),
                None => return PumpOutcome::Lost("stream ended".to_string()),
            },
        }
    }
}

/// Sleeps for `delay`, dropping outgoing frames in the meantime.
async fn sleep_draining(
    delay: Duration,
    shared: &Shared,
    commands: &mut mpsc::UnboundedReceiver<Command>,
) -> Interrupt {
    let sleep = time::sleep(delay);
    tokio::pin!(sleep);
    loop {
        tokio::select! {
            _ = &mut sleep => return Interrupt::Elapsed,
            cmd = commands.recv() => match cmd {
                Some(Command::Send { ack, .. }) => drop_unsent(shared, ack),
                Some(Command::Reconnect) => return Interrupt::Reconnect,
                Some(Command::Close) | None => return Interrupt::Close,
            },
        }
    }
}

/// Idles until a manual reconnect. Returns false once the handle is gone.
async fn wait_for_reconnect(
    shared: &Shared,
    commands: &mut mpsc::UnboundedReceiver<Command>,
) -> bool {
    loop {
        match commands.recv().await {
            Some(Command::Send { ack, .. }) => drop_unsent(shared, ack),
            Some(Command::Reconnect) => return true,
            Some(Command::Close) => {}
            None => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jitter_stays_within_bounds() {
        let base = Duration::from_millis(1000);
        for _ in 0..100 {
            let d = jittered(base, 0.5);
            assert!(d >= Duration::from_millis(500) && d <= Duration::from_millis(1500));
        }
        assert_eq!(jittered(base, 0.0), base);
    }

    #[test]
    fn non_finite_jitter_is_ignored() {
        let base = Duration::from_millis(1000);
        assert_eq!(jittered(base, f64::NAN), base);
        assert_eq!(jittered(base, f64::INFINITY), base);
    }

    #[tokio::test]
    async fn requests_fail_fast_while_disconnected() {
        let mut cfg = ClientConfig::default();
        // Nothing listens on port 9 locally; the handshake fails.
        cfg.realtime_url = Some("ws://127.0.0.1:9/ws".to_string());
        cfg.reconnect.max_attempts = 0;
        let transport = Transport::connect(&cfg, None, Listeners::new());

        let err = transport.mark_ready("room").await.unwrap_err();
        assert!(matches!(err, ClientError::NotConnected));
        assert!(transport.shared.pending().is_empty());

        assert!(transport
            .wait_connected(Duration::from_secs(5))
            .await
            .is_err());
        assert_eq!(transport.state(), ConnectionState::Failed);
    }
}
