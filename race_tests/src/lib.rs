//! In-process stand-ins for the racing backend.
//!
//! - [`RealtimeStub`]: a WebSocket server speaking the client's envelope.
//!   Acknowledgements come from a scripted [`Responder`]; pushes are sent on
//!   demand.
//! - [`HttpStub`]: a bare HTTP/1.1 responder on a raw TCP listener.
//!
//! Both bind to an ephemeral localhost port.

use std::{
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::{bail, Context};
use futures_util::{SinkExt, StreamExt};
use race_shared::{
    net::{decode_outbound, encode_ack, encode_push, Ack, ClientEvent, OutboundFrame, ServerPush},
    room::{RoomInfo, RoomStatus},
};
use serde_json::{json, Value};
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::mpsc,
    task::JoinHandle,
    time,
};
use tokio_tungstenite::{
    accept_hdr_async,
    tungstenite::{
        handshake::server::{ErrorResponse, Request, Response},
        http::header::AUTHORIZATION,
        Message,
    },
};
use tracing::{debug, warn};

/// Installs a test-friendly subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

// ─── Realtime ───

/// Decides the acknowledgement for a client frame; `None` never answers.
pub type Responder = Arc<dyn Fn(&OutboundFrame) -> Option<Ack> + Send + Sync>;

/// Acknowledges everything with success. Room state requests get a
/// one-player waiting room.
pub fn accept_all() -> Responder {
    Arc::new(|frame: &OutboundFrame| {
        let data = match ClientEvent::from_name(&frame.event) {
            Some(ClientEvent::GetRoomState) => {
                let room_uid = frame.data.get("roomUid").and_then(Value::as_str);
                serde_json::to_value(waiting_room(room_uid.unwrap_or("room"))).ok()?
            }
            _ => json!({}),
        };
        Some(Ack::ok(data))
    })
}

pub fn waiting_room(room_uid: &str) -> RoomInfo {
    RoomInfo {
        room_uid: Some(room_uid.to_string()),
        game_mode: "ENDLESS_RACE".to_string(),
        max_players: 1,
        current_players: 1,
        status: RoomStatus::Waiting,
        players: Vec::new(),
    }
}

enum Control {
    Push(ServerPush),
    Drop,
}

/// Sends pushes to whichever client is connected.
#[derive(Clone)]
pub struct Pusher {
    control: mpsc::UnboundedSender<Control>,
}

impl Pusher {
    pub fn push(&self, push: ServerPush) {
        let _ = self.control.send(Control::Push(push));
    }

    /// Closes the current connection from the server side.
    pub fn drop_connection(&self) {
        let _ = self.control.send(Control::Drop);
    }
}

pub struct RealtimeStub {
    pub addr: SocketAddr,
    pusher: Pusher,
    received: mpsc::UnboundedReceiver<OutboundFrame>,
    auth: Arc<Mutex<Option<String>>>,
    connections: Arc<AtomicUsize>,
    task: JoinHandle<()>,
}

impl RealtimeStub {
    pub async fn start(responder: Responder) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind realtime stub")?;
        let addr = listener.local_addr()?;
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (received_tx, received) = mpsc::unbounded_channel();
        let auth = Arc::new(Mutex::new(None));
        let connections = Arc::new(AtomicUsize::new(0));

        let task = tokio::spawn(accept_loop(
            listener,
            responder,
            received_tx,
            control_rx,
            auth.clone(),
            connections.clone(),
        ));

        Ok(Self {
            addr,
            pusher: Pusher {
                control: control_tx,
            },
            received,
            auth,
            connections,
            task,
        })
    }

    pub fn url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    pub fn pusher(&self) -> Pusher {
        self.pusher.clone()
    }

    pub fn push(&self, push: ServerPush) {
        self.pusher.push(push);
    }

    pub fn drop_connection(&self) {
        self.pusher.drop_connection();
    }

    /// `Authorization` header of the latest handshake.
    pub fn auth_header(&self) -> Option<String> {
        self.auth
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Next frame sent by the client; `None` once the stub has stopped.
    pub async fn recv_frame(&mut self) -> Option<OutboundFrame> {
        self.received.recv().await
    }

    /// Next frame sent by the client.
    pub async fn next_frame(&mut self, timeout: Duration) -> anyhow::Result<OutboundFrame> {
        match time::timeout(timeout, self.received.recv()).await {
            Ok(Some(frame)) => Ok(frame),
            Ok(None) => bail!("realtime stub stopped"),
            Err(_) => bail!("no client frame within {timeout:?}"),
        }
    }

    /// Skips frames until one for `event` arrives.
    pub async fn expect_event(
        &mut self,
        event: ClientEvent,
        timeout: Duration,
    ) -> anyhow::Result<OutboundFrame> {
        loop {
            let frame = self.next_frame(timeout).await?;
            if frame.event == event.as_str() {
                return Ok(frame);
            }
            debug!(event = %frame.event, "Skipping frame");
        }
    }
}

impl Drop for RealtimeStub {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn accept_loop(
    listener: TcpListener,
    responder: Responder,
    received: mpsc::UnboundedSender<OutboundFrame>,
    mut control: mpsc::UnboundedReceiver<Control>,
    auth: Arc<Mutex<Option<String>>>,
    connections: Arc<AtomicUsize>,
) {
    loop {
        let Ok((stream, peer)) = listener.accept().await else {
            return;
        };
        let auth_slot = auth.clone();
        let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            let header = req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            *auth_slot
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()) = header;
            Ok(resp)
        };
        let ws = match accept_hdr_async(stream, callback).await {
            Ok(ws) => ws,
            Err(e) => {
                warn!(%peer, error = %e, "Stub handshake failed");
                continue;
            }
        };
        connections.fetch_add(1, Ordering::SeqCst);
        debug!(%peer, "Stub client connected");
        if let Err(e) = serve(ws, &responder, &received, &mut control).await {
            debug!(%peer, error = %format!("{e:#}"), "Stub connection ended");
        }
    }
}

async fn serve(
    ws: tokio_tungstenite::WebSocketStream<TcpStream>,
    responder: &Responder,
    received: &mpsc::UnboundedSender<OutboundFrame>,
    control: &mut mpsc::UnboundedReceiver<Control>,
) -> anyhow::Result<()> {
    let (mut sink, mut stream) = ws.split();
    loop {
        tokio::select! {
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let frame = decode_outbound(&text)?;
                    if let Some(id) = frame.ack {
                        if let Some(ack) = responder(&frame) {
                            sink.send(Message::Text(encode_ack(id, &ack)?.into())).await?;
                        }
                    }
                    let _ = received.send(frame);
                }
                Some(Ok(Message::Close(_))) | None => return Ok(()),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
            ctl = control.recv() => match ctl {
                Some(Control::Push(push)) => {
                    sink.send(Message::Text(encode_push(&push)?.into())).await?;
                }
                Some(Control::Drop) => {
                    let _ = sink.close().await;
                    return Ok(());
                }
                None => return Ok(()),
            },
        }
    }
}

// ─── HTTP ───

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    /// Path including the query string.
    pub target: String,
    pub authorization: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }
}

/// Status code and JSON body for a request.
pub type HttpResponder = Arc<dyn Fn(&RecordedRequest) -> (u16, String) + Send + Sync>;

pub struct HttpStub {
    pub addr: SocketAddr,
    requests: mpsc::UnboundedReceiver<RecordedRequest>,
    task: JoinHandle<()>,
}

impl HttpStub {
    pub async fn start(responder: HttpResponder) -> anyhow::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind http stub")?;
        let addr = listener.local_addr()?;
        let (tx, requests) = mpsc::unbounded_channel();
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let responder = responder.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_http(stream, &responder, &tx).await {
                        debug!(error = %format!("{e:#}"), "HTTP stub request failed");
                    }
                });
            }
        });
        Ok(Self {
            addr,
            requests,
            task,
        })
    }

    /// API base URL, with the `/api` prefix real deployments use.
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub async fn next_request(&mut self, timeout: Duration) -> anyhow::Result<RecordedRequest> {
        match time::timeout(timeout, self.requests.recv()).await {
            Ok(Some(req)) => Ok(req),
            Ok(None) => bail!("http stub stopped"),
            Err(_) => bail!("no HTTP request within {timeout:?}"),
        }
    }
}

impl Drop for HttpStub {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        _ => "Unknown",
    }
}

async fn handle_http(
    stream: TcpStream,
    responder: &HttpResponder,
    requests: &mpsc::UnboundedSender<RecordedRequest>,
) -> anyhow::Result<()> {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().context("missing method")?.to_string();
    let target = parts.next().context("missing target")?.to_string();

    let mut content_length = 0usize;
    let mut authorization = None;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            break;
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            let value = value.trim();
            match name.trim().to_ascii_lowercase().as_str() {
                "content-length" => content_length = value.parse().context("content-length")?,
                "authorization" => authorization = Some(value.to_string()),
                _ => {}
            }
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).await?;
    let recorded = RecordedRequest {
        method,
        target,
        authorization,
        body: String::from_utf8_lossy(&body).into_owned(),
    };

    let (status, payload) = responder(&recorded);
    let _ = requests.send(recorded);

    let response = format!(
        "HTTP/1.1 {status} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{payload}",
        reason_phrase(status),
        payload.len()
    );
    let mut stream = reader.into_inner();
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

/// `{"success": true, "data": data}`
pub fn ok_body(data: Value) -> String {
    json!({ "success": true, "data": data }).to_string()
}

/// `{"success": false, "message": message}`
pub fn error_body(message: &str) -> String {
    json!({ "success": false, "message": message }).to_string()
}
