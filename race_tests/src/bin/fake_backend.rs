//! Scripted local backend for trying the console client without a server.
//!
//! Usage:
//!   cargo run -p race_tests --bin fake_backend -- [--player 0x..] [--ticks N]
//!
//! Prints the two URLs to hand to the client. Any room id is accepted. Once
//! the client marks ready, the backend starts the race, streams snapshots at
//! 20 Hz, then finishes with a result.

use std::env;
use std::sync::{
    atomic::{AtomicI32, Ordering},
    Arc,
};
use std::time::Duration;

use race_shared::{
    math::{TrackPos, TrackSize},
    net::{ClientEvent, InputAction, ServerPush},
    room::{LobbyPlayer, RaceResult, Ranking, RoomStatus},
    world::{Obstacle, ObstacleKind, PlayerState, PowerUp, PowerUpKind, RaceStatus, WorldSnapshot},
};
use race_tests::{
    accept_all, error_body, ok_body, waiting_room, HttpStub, Pusher, RealtimeStub, RecordedRequest,
};
use serde_json::{json, Value};
use tracing::info;

const ROOM_UID: &str = "demo-room-0001";
const RIVAL: &str = "0xrival000000000000000000000000000000beef";
const TICK: Duration = Duration::from_millis(50);

struct Args {
    player: String,
    ticks: u32,
}

fn parse_args() -> Args {
    let args: Vec<String> = env::args().collect();
    let mut out = Args {
        player: "0x1234567890abcdef1234567890abcdef12345678".to_string(),
        ticks: 200,
    };
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--player" if i + 1 < args.len() => {
                out.player = args[i + 1].clone();
                i += 2;
            }
            "--ticks" if i + 1 < args.len() => {
                out.ticks = args[i + 1].parse().unwrap_or(out.ticks);
                i += 2;
            }
            _ => i += 1,
        }
    }
    out
}

fn final_result(player: &str) -> RaceResult {
    RaceResult {
        winner: Some(player.to_string()),
        rankings: vec![
            Ranking {
                rank: 1,
                player_id: Some(player.to_string()),
                distance: 1000.0,
                final_time: 10_000,
            },
            Ranking {
                rank: 2,
                player_id: Some(RIVAL.to_string()),
                distance: 850.0,
                final_time: 10_000,
            },
        ],
        signature: Some(format!("0x{}", "ab".repeat(65))),
    }
}

fn snapshot(tick: u32, lane: i32, player: &str, status: RaceStatus) -> WorldSnapshot {
    let z = tick as f32 * 5.0;
    let rival_z = tick as f32 * 4.25;
    let players = vec![
        PlayerState {
            player_id: player.to_string(),
            position: TrackPos::new(lane as f32, z),
            lane: (lane + 1) as u8,
            speed: 100.0,
            rank: Some(if z >= rival_z { 1 } else { 2 }),
            is_finished: status == RaceStatus::Finished,
        },
        PlayerState {
            player_id: RIVAL.to_string(),
            position: TrackPos::new(1.0, rival_z),
            lane: 2,
            speed: 85.0,
            rank: Some(if z >= rival_z { 2 } else { 1 }),
            is_finished: status == RaceStatus::Finished,
        },
    ];
    // A fixed course; the client culls whatever is off screen.
    let obstacles = (1..=20)
        .map(|i| Obstacle {
            id: format!("obs-{i}"),
            position: TrackPos::new(((i % 3) - 1) as f32, i as f32 * 60.0),
            size: TrackSize::default(),
            kind: match i % 3 {
                0 => ObstacleKind::Barrier,
                1 => ObstacleKind::Hazard,
                _ => ObstacleKind::SlowZone,
            },
        })
        .collect();
    let power_ups = (1..=6)
        .map(|i| PowerUp {
            id: format!("pu-{i}"),
            position: TrackPos::new(((i % 3) - 1) as f32, i as f32 * 150.0 + 30.0),
            kind: match i % 3 {
                0 => PowerUpKind::Boost,
                1 => PowerUpKind::Shield,
                _ => PowerUpKind::SlowOthers,
            },
            collected: (i as f32 * 150.0 + 30.0) < z,
        })
        .collect();
    WorldSnapshot {
        status,
        players,
        obstacles,
        power_ups,
    }
}

async fn run_race(
    pusher: Pusher,
    room_uid: String,
    player: String,
    ticks: u32,
    lane: Arc<AtomicI32>,
) {
    let mut room = waiting_room(&room_uid);
    room.status = RoomStatus::Racing;
    room.players = vec![LobbyPlayer {
        player_address: Some(player.clone()),
        user: None,
        is_ready: true,
    }];
    pusher.push(ServerPush::LobbyUpdate(room));
    pusher.push(ServerPush::GameStart(json!({ "roomUid": &room_uid })));
    info!(room = %room_uid, ticks, "Race started");

    let mut interval = tokio::time::interval(TICK);
    for tick in 0..ticks {
        interval.tick().await;
        let snap = snapshot(tick, lane.load(Ordering::Relaxed), &player, RaceStatus::Racing);
        pusher.push(ServerPush::GameState(Box::new(snap)));
    }
    let last = snapshot(ticks, lane.load(Ordering::Relaxed), &player, RaceStatus::Finished);
    pusher.push(ServerPush::GameState(Box::new(last)));
    pusher.push(ServerPush::GameEnd(final_result(&player)));
    info!(room = %room_uid, "Race finished");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = parse_args();

    let result_player = args.player.clone();
    let http = HttpStub::start(Arc::new(move |req: &RecordedRequest| {
        let path = req.target.split('?').next().unwrap_or_default();
        match (req.method.as_str(), path) {
            ("POST", "/api/game/room/create") | ("POST", "/api/game/room/create-vs-ai") => {
                (201, ok_body(json!({ "roomUid": ROOM_UID })))
            }
            ("GET", p) if p.ends_with("/result") => {
                match serde_json::to_value(final_result(&result_player)) {
                    Ok(v) => (200, ok_body(v)),
                    Err(e) => (500, error_body(&e.to_string())),
                }
            }
            ("GET", "/api/game/active") => (200, ok_body(json!([]))),
            _ => (404, error_body("Route not found")),
        }
    }))
    .await?;
    let mut realtime = RealtimeStub::start(accept_all()).await?;

    println!("API:      {}", http.base_url());
    println!("Realtime: {}", realtime.url());
    println!("Player:   {}", args.player);
    println!();
    println!(
        "cargo run -p race_client -- --api {} --ws {} --token demo --address {} --car car-1",
        http.base_url(),
        realtime.url(),
        args.player
    );

    let lane = Arc::new(AtomicI32::new(0));
    while let Some(frame) = realtime.recv_frame().await {
        let room_uid = frame
            .data
            .get("roomUid")
            .and_then(Value::as_str)
            .unwrap_or(ROOM_UID)
            .to_string();
        match ClientEvent::from_name(&frame.event) {
            Some(ClientEvent::PlayerJoin) => info!(room = %room_uid, "Player joined"),
            Some(ClientEvent::PlayerReady) => {
                lane.store(0, Ordering::Relaxed);
                tokio::spawn(run_race(
                    realtime.pusher(),
                    room_uid,
                    args.player.clone(),
                    args.ticks,
                    lane.clone(),
                ));
            }
            Some(ClientEvent::PlayerInput) => {
                let action = frame
                    .data
                    .get("action")
                    .cloned()
                    .and_then(|v| serde_json::from_value::<InputAction>(v).ok());
                let delta = match action {
                    Some(InputAction::TurnLeft) => -1,
                    Some(InputAction::TurnRight) => 1,
                    _ => 0,
                };
                let next = (lane.load(Ordering::Relaxed) + delta).clamp(-1, 1);
                lane.store(next, Ordering::Relaxed);
            }
            Some(ClientEvent::PlayerLeave) => info!(room = %room_uid, "Player left"),
            _ => {}
        }
    }
    Ok(())
}
