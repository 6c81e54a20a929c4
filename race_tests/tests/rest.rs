//! HTTP API client against a scripted HTTP server.

use std::sync::Arc;
use std::time::Duration;

use race_client::{scene::default_room_request, Api, ClientError};
use race_shared::room::RoomFilter;
use race_tests::{error_body, init_tracing, ok_body, HttpStub, RecordedRequest};
use serde_json::json;

const WAIT: Duration = Duration::from_secs(5);

fn routes(req: &RecordedRequest) -> (u16, String) {
    let path = req.target.split('?').next().unwrap_or_default();
    match (req.method.as_str(), path) {
        ("POST", "/api/game/room/create") => (201, ok_body(json!({ "roomUid": "room-42" }))),
        ("POST", "/api/game/room/room-42/ready") => (400, error_body("Room already started")),
        ("GET", "/api/game/rooms") => (
            200,
            ok_body(json!([{
                "roomUid": "room-42",
                "gameMode": "ENDLESS_RACE",
                "maxPlayers": 4,
                "currentPlayers": 2,
                "status": "WAITING",
                "players": []
            }])),
        ),
        ("GET", "/api/game/room-42/result") => (
            200,
            ok_body(json!({
                "winner": "0xaaa",
                "rankings": [{ "rank": 1, "playerId": "0xaaa", "distance": 1234.5, "finalTime": 83400 }],
                "signature": "0xsig"
            })),
        ),
        // Bare status with no JSON envelope.
        _ => (404, String::new()),
    }
}

async fn api_for(stub: &HttpStub, token: Option<&str>) -> anyhow::Result<Api> {
    let mut api = Api::new(&stub.base_url(), WAIT)?;
    api.set_token(token);
    Ok(api)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn create_room_posts_json_with_bearer() -> anyhow::Result<()> {
    init_tracing();
    let mut stub = HttpStub::start(Arc::new(routes)).await?;
    let api = api_for(&stub, Some("jwt-1")).await?;

    let req = default_room_request(chrono::Utc::now());
    let created = api.create_room(&req).await?;
    assert_eq!(created.room_uid.as_deref(), Some("room-42"));

    let seen = stub.next_request(WAIT).await?;
    assert_eq!(seen.method, "POST");
    assert_eq!(seen.target, "/api/game/room/create");
    assert_eq!(seen.authorization.as_deref(), Some("Bearer jwt-1"));
    let body = seen.json();
    assert_eq!(body["gameMode"], "ENDLESS_RACE");
    assert_eq!(body["maxPlayers"], 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn error_status_carries_server_message() -> anyhow::Result<()> {
    init_tracing();
    let stub = HttpStub::start(Arc::new(routes)).await?;
    let api = api_for(&stub, Some("jwt-1")).await?;

    let err = api.mark_ready("room-42").await.unwrap_err();
    assert!(matches!(err, ClientError::Http { status: 400, .. }));
    assert_eq!(err.to_string(), "Room already started");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn error_status_without_envelope_is_generic() -> anyhow::Result<()> {
    init_tracing();
    let stub = HttpStub::start(Arc::new(routes)).await?;
    let api = api_for(&stub, None).await?;

    let err = api.race_result("missing").await.unwrap_err();
    assert_eq!(err.to_string(), "HTTP 404: Not Found");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn list_rooms_sends_filter_and_result_decodes() -> anyhow::Result<()> {
    init_tracing();
    let mut stub = HttpStub::start(Arc::new(routes)).await?;
    let api = api_for(&stub, None).await?;

    let filter = RoomFilter::new()
        .with_game_mode("ENDLESS_RACE")
        .with_status("WAITING");
    let rooms = api.list_rooms(&filter).await?;
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].current_players, 2);

    let seen = stub.next_request(WAIT).await?;
    assert_eq!(seen.target, "/api/game/rooms?gameMode=ENDLESS_RACE&status=WAITING");
    assert_eq!(seen.authorization, None);

    let result = api.race_result("room-42").await?;
    assert_eq!(result.winner.as_deref(), Some("0xaaa"));
    assert_eq!(result.rankings[0].final_time, 83_400);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn success_without_data_is_accepted() -> anyhow::Result<()> {
    init_tracing();
    let mut stub = HttpStub::start(Arc::new(|_req: &RecordedRequest| {
        (200, json!({ "success": true, "message": "ready" }).to_string())
    }))
    .await?;
    let api = api_for(&stub, Some("jwt-1")).await?;

    let data = api.mark_ready("room/7").await?;
    assert!(data.is_null());

    let seen = stub.next_request(WAIT).await?;
    assert_eq!(seen.method, "POST");
    assert_eq!(seen.target, "/api/game/room/room%2F7/ready");

    // Creating a room needs the room id back.
    let err = api
        .create_room(&default_room_request(chrono::Utc::now()))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
    Ok(())
}
