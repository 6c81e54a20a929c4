//! Standalone console client.
//!
//! Usage:
//!   cargo run -p race_client -- [--config client.json] [--api URL] [--ws URL]
//!                               [--token JWT] [--address 0x..] [--car UID]
//!
//! Settings are layered: defaults, then the JSON config file, then the
//! `RACE_*` environment variables, then flags.
//!
//! The client connects to the realtime server, then reads console commands
//! (type `help`) and prints each scene as it changes.

use std::env;
use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use race_client::{
    console::{self, Command},
    frame::TraceRenderer,
    Api, Listeners, SceneKind, SceneMachine, Transport,
};
use race_shared::{config::ClientConfig, session::Session};
use tokio::sync::mpsc;
use tracing::{info, warn};

fn parse_args() -> anyhow::Result<ClientConfig> {
    let args: Vec<String> = env::args().collect();

    let config_path = args
        .windows(2)
        .find(|w| w[0] == "--config")
        .map(|w| w[1].clone());
    let mut cfg = match config_path {
        Some(path) => ClientConfig::load_file(Path::new(&path))?,
        None => ClientConfig::default(),
    };
    cfg.apply_env();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--api" if i + 1 < args.len() => {
                cfg.api_base_url = args[i + 1].clone();
                i += 2;
            }
            "--ws" if i + 1 < args.len() => {
                cfg.realtime_url = Some(args[i + 1].clone());
                i += 2;
            }
            "--token" if i + 1 < args.len() => {
                cfg.token = Some(args[i + 1].clone());
                i += 2;
            }
            "--address" if i + 1 < args.len() => {
                cfg.player_address = Some(args[i + 1].clone());
                i += 2;
            }
            "--car" if i + 1 < args.len() => {
                cfg.car_uid = Some(args[i + 1].clone());
                i += 2;
            }
            _ => i += 1,
        }
    }
    Ok(cfg)
}

fn print_status(machine: &SceneMachine, transport: &Transport, renderer: &TraceRenderer) {
    let session = machine.session();
    println!("Scene: {}", machine.kind());
    println!("Connection: {:?}", transport.state());
    println!("Player: {}", session.player_id());
    println!("Car: {}", session.car_uid().unwrap_or("-"));
    println!("Listening: {:?}", machine.subscribed());
    println!("Frames: {}", renderer.frames());
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = parse_args().context("load configuration")?;
    info!(api = %cfg.api_base_url, realtime = %cfg.realtime_endpoint(), "Starting client");

    let session = Session::from_config(&cfg);
    if session.token().is_none() {
        warn!("No token configured; set RACE_TOKEN or pass --token");
    }

    let listeners = Listeners::new();
    let transport = Arc::new(Transport::connect(
        &cfg,
        session.token(),
        listeners.clone(),
    ));
    if let Err(e) = transport
        .wait_connected(cfg.reconnect.connect_timeout())
        .await
    {
        warn!(error = %e, "Realtime server not reachable yet");
    }

    let api = Arc::new(Api::from_session(&session, cfg.http_timeout()).context("build HTTP client")?);
    let mut machine = SceneMachine::new(
        session,
        transport.clone(),
        api,
        listeners,
        cfg.viewport.clone(),
    );
    let mut renderer = TraceRenderer::default();

    // Set up console input channel.
    let (console_tx, mut console_rx) = mpsc::channel::<String>(32);

    // Spawn stdin reader thread.
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        loop {
            print!("] ");
            let _ = stdout.flush();
            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    println!("{}", console::HELP);
    println!();

    let frame_hz = cfg.frame_hz.max(1);
    let mut frames = tokio::time::interval(Duration::from_secs_f64(1.0 / f64::from(frame_hz)));
    let mut shown: Vec<String> = Vec::new();

    loop {
        tokio::select! {
            line = console_rx.recv() => {
                let Some(line) = line else { break };
                match console::parse(&line) {
                    Ok(Some(Command::Action(action))) => machine.handle_action(action).await,
                    Ok(Some(Command::Status)) => print_status(&machine, &transport, &renderer),
                    Ok(Some(Command::Reconnect)) => transport.reconnect(),
                    Ok(Some(Command::Help)) => println!("{}", console::HELP),
                    Ok(Some(Command::Quit)) => break,
                    Ok(None) => {}
                    Err(usage) => println!("{usage}"),
                }
            }
            push = machine.next_push() => {
                if let Some(push) = push {
                    machine.on_push(push).await;
                }
            }
            _ = frames.tick() => {
                machine.render(&mut renderer);
                // The race HUD changes every frame; print it once a second.
                let due = machine.kind() != SceneKind::Race
                    || renderer.frames() % u64::from(frame_hz) == 0;
                if due && renderer.lines() != shown.as_slice() {
                    shown = renderer.lines().to_vec();
                    println!("{}", shown.join(" | "));
                }
            }
        }
    }

    transport.disconnect();
    info!("Client exiting");
    Ok(())
}
