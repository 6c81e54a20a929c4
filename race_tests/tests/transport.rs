//! Realtime transport against an in-process WebSocket server.

use std::sync::Arc;
use std::time::Duration;

use race_client::{
    gateway::Realtime, ClientError, ConnectionState, ListenerScope, Listeners, Transport,
};
use race_shared::{
    config::ClientConfig,
    net::{Ack, ClientEvent, InputAction, OutboundFrame, ServerEventKind, ServerPush},
    room::{RaceResult, RoomStatus},
};
use race_tests::{accept_all, init_tracing, waiting_room, RealtimeStub, Responder};
use serde_json::json;

const WAIT: Duration = Duration::from_secs(5);

fn config_for(stub: &RealtimeStub) -> ClientConfig {
    let mut cfg = ClientConfig::default();
    cfg.realtime_url = Some(stub.url());
    cfg.reconnect.initial_delay_ms = 50;
    cfg.reconnect.max_delay_ms = 100;
    cfg.reconnect.jitter = 0.0;
    cfg.reconnect.connect_timeout_ms = 2_000;
    cfg
}

async fn connected(
    stub: &RealtimeStub,
    token: Option<&str>,
    listeners: Listeners,
) -> anyhow::Result<Transport> {
    let transport = Transport::connect(&config_for(stub), token, listeners);
    transport.wait_connected(WAIT).await?;
    Ok(transport)
}

async fn wait_for_connections(stub: &RealtimeStub, n: usize) -> anyhow::Result<()> {
    tokio::time::timeout(WAIT, async {
        while stub.connections() < n {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn handshake_carries_bearer_token() -> anyhow::Result<()> {
    init_tracing();
    let stub = RealtimeStub::start(accept_all()).await?;
    let transport = connected(&stub, Some("jwt-abc"), Listeners::new()).await?;

    assert!(transport.is_connected());
    assert_eq!(stub.auth_header().as_deref(), Some("Bearer jwt-abc"));
    wait_for_connections(&stub, 1).await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn join_and_room_state_resolve_with_acks() -> anyhow::Result<()> {
    init_tracing();
    let mut stub = RealtimeStub::start(accept_all()).await?;
    let transport = connected(&stub, Some("jwt"), Listeners::new()).await?;

    transport.join_room("room-1", "car-7").await?;
    let frame = stub.expect_event(ClientEvent::PlayerJoin, WAIT).await?;
    assert!(frame.ack.is_some());
    assert_eq!(frame.data, json!({ "roomUid": "room-1", "carUid": "car-7" }));

    let room = transport.room_state("room-1").await?;
    assert_eq!(room.room_uid.as_deref(), Some("room-1"));
    assert_eq!(room.status, RoomStatus::Waiting);

    // Each request gets its own acknowledgement id.
    let state_frame = stub.expect_event(ClientEvent::GetRoomState, WAIT).await?;
    assert_ne!(state_frame.ack, frame.ack);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn rejected_acks_surface_server_message_or_fallback() -> anyhow::Result<()> {
    init_tracing();
    let responder: Responder = Arc::new(|frame: &OutboundFrame| {
        match ClientEvent::from_name(&frame.event) {
            Some(ClientEvent::PlayerJoin) => Some(Ack::rejected("Room is full")),
            Some(ClientEvent::PlayerReady) => Some(Ack::rejected("")),
            _ => Some(Ack::ok(json!({}))),
        }
    });
    let stub = RealtimeStub::start(responder).await?;
    let transport = connected(&stub, None, Listeners::new()).await?;

    let err = transport.join_room("room-1", "car-7").await.unwrap_err();
    assert!(matches!(err, ClientError::Rejected(ref m) if m == "Room is full"));

    let err = transport.mark_ready("room-1").await.unwrap_err();
    assert_eq!(err.to_string(), "Failed to mark ready");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pushes_reach_only_subscribed_scopes() -> anyhow::Result<()> {
    init_tracing();
    let stub = RealtimeStub::start(accept_all()).await?;
    let listeners = Listeners::new();
    let _transport = connected(&stub, None, listeners.clone()).await?;

    let mut scope = ListenerScope::new(&listeners, "race", &[ServerEventKind::GameEnd]);

    stub.push(ServerPush::LobbyUpdate(waiting_room("room-1")));
    let result = RaceResult {
        winner: Some("0xwinner".to_string()),
        ..RaceResult::default()
    };
    stub.push(ServerPush::GameEnd(result.clone()));

    let got = tokio::time::timeout(WAIT, scope.recv()).await?;
    assert_eq!(got, Some(ServerPush::GameEnd(result)));
    assert!(scope.try_recv().is_none());

    scope.release();
    assert!(!listeners.is_subscribed(ServerEventKind::GameEnd));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn pending_request_fails_when_link_drops_then_reconnects() -> anyhow::Result<()> {
    init_tracing();
    // Ready is never acknowledged.
    let responder: Responder = Arc::new(|frame: &OutboundFrame| {
        match ClientEvent::from_name(&frame.event) {
            Some(ClientEvent::PlayerReady) => None,
            _ => Some(Ack::ok(json!({}))),
        }
    });
    let mut stub = RealtimeStub::start(responder).await?;
    let transport = connected(&stub, None, Listeners::new()).await?;
    let pusher = stub.pusher();

    let (result, seen) = tokio::join!(transport.mark_ready("room-1"), async {
        let frame = stub.expect_event(ClientEvent::PlayerReady, WAIT).await;
        pusher.drop_connection();
        frame
    });
    seen?;
    assert!(matches!(result, Err(ClientError::ConnectionLost)));

    wait_for_connections(&stub, 2).await?;
    transport.wait_connected(WAIT).await?;
    transport.join_room("room-1", "car-7").await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn closed_transport_refuses_until_reconnected() -> anyhow::Result<()> {
    init_tracing();
    let mut stub = RealtimeStub::start(accept_all()).await?;
    let transport = connected(&stub, None, Listeners::new()).await?;

    transport.disconnect();
    let mut state = transport.watch_state();
    tokio::time::timeout(WAIT, state.wait_for(|s| *s == ConnectionState::Closed)).await??;

    let err = transport.join_room("room-1", "car-7").await.unwrap_err();
    assert!(matches!(err, ClientError::NotConnected));
    // Fire-and-forget input is dropped without reaching the server.
    transport.send_input("room-1", InputAction::TurnLeft);

    // The state still reads Closed until the task picks up the command.
    transport.reconnect();
    tokio::time::timeout(WAIT, state.wait_for(|s| *s == ConnectionState::Connected)).await??;
    wait_for_connections(&stub, 2).await?;

    transport.send_input("room-1", InputAction::TurnRight);
    let frame = stub.expect_event(ClientEvent::PlayerInput, WAIT).await?;
    assert_eq!(frame.data["action"], "TURN_RIGHT");
    Ok(())
}
