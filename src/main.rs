//! Main entry point for the scene-sync binary.
//!
//! `host` runs the session host behind an Axum server; `join` runs a
//! headless guest against a host.

use std::error::Error;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use scene_sync::client::{GuestOptions, run_guest};
use scene_sync::config::{Cli, Command, tick_interval};
use scene_sync::server::create_router;
use scene_sync::server::routes::{HostSession, spawn_loopback};
use scene_sync::sync::coordinator::TickInput;
use scene_sync::{PeerIdentity, SceneMirror};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Host {
            addr,
            name,
            anchored,
            tick_ms,
        } => run_host(addr, name, anchored, tick_ms).await,
        Command::Join {
            url,
            name,
            address,
            anchored,
            tick_ms,
        } => {
            let options = GuestOptions {
                url,
                identity: PeerIdentity::new(name, address),
                anchored,
                tick: tick_interval(tick_ms),
            };
            run_guest(options).await.map(|mirror| {
                info!("Final selection: {:?}", mirror.selection());
            })
        }
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run_host(
    addr: std::net::SocketAddr,
    name: String,
    anchored: bool,
    tick_ms: u64,
) -> Result<(), Box<dyn Error>> {
    info!("Starting scene-sync host...");

    let identity = PeerIdentity::new(name, addr.ip().to_string());
    let (state, inbox) = HostSession::start(identity, SceneMirror::new())?;
    spawn_loopback(state.clone(), inbox);

    let ticker_state = state.clone();
    let input = TickInput {
        anchor: Some(anchored),
        head: None,
    };
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(tick_interval(tick_ms));
        loop {
            ticker.tick().await;
            ticker_state.tick(&input).await;
        }
    });

    let app = create_router(state);

    info!("Server listening on http://{}", addr);
    info!("Available endpoints:");
    info!("  GET  /health       - Health check");
    info!("  GET  /state        - Authoritative scene snapshot");
    info!("  POST /interactions - Apply a host interaction");
    info!("  GET  /ws           - Guest WebSocket");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
