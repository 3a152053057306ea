//! Route handlers and shared state of the host server.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use axum::{
    Router,
    extract::{State, ws::WebSocketUpgrade},
    http::StatusCode,
    response::{Json, Response},
    routing::{get, post},
};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tracing::{debug, info};

use crate::dispatcher::{Dispatcher, Interaction};
use crate::error::SyncError;
use crate::replication::scene::Scene;
use crate::replication::types::PeerId;
use crate::server::transport::ServerTransport;
use crate::server::websocket::handle_websocket_connection;
use crate::session::peer::PeerIdentity;
use crate::sync::coordinator::{SceneSnapshot, SyncCoordinator, TickInput};
use crate::sync::message::Envelope;
use crate::sync::presentation::SceneMirror;

/// Peer id of the server process.
pub const HOST_PEER_ID: PeerId = 1;

pub type HostDispatcher = Dispatcher<ServerTransport, SceneMirror>;

/// The host peer and its connections.
///
/// Every handler touching session state goes through the one dispatcher
/// lock, so messages are handled one at a time in arrival order.
pub struct HostSession {
    pub dispatcher: Mutex<HostDispatcher>,
    pub transport: ServerTransport,
    next_peer: AtomicU64,
}

/// Shared application state
pub type AppState = Arc<HostSession>;

impl HostSession {
    /// Starts the session with this process as host. The returned receiver
    /// carries the host's own traffic; hand it to [`spawn_loopback`].
    pub fn start(
        identity: PeerIdentity,
        mirror: SceneMirror,
    ) -> Result<(AppState, UnboundedReceiver<Envelope>), SyncError> {
        let (loopback, inbox) = unbounded_channel();
        let transport = ServerTransport::new(HOST_PEER_ID, loopback);
        let scene = Scene::standard();
        let mut coordinator = SyncCoordinator::new(
            HOST_PEER_ID,
            identity,
            &scene,
            Some(transport.clone()),
            mirror,
        );
        coordinator.start_host()?;

        let session = HostSession {
            dispatcher: Mutex::new(Dispatcher::new(coordinator, scene)),
            transport,
            next_peer: AtomicU64::new(HOST_PEER_ID + 1),
        };
        Ok((Arc::new(session), inbox))
    }

    /// Allocates the peer id of a new connection.
    pub fn next_peer_id(&self) -> PeerId {
        self.next_peer.fetch_add(1, Ordering::Relaxed)
    }

    pub async fn snapshot(&self) -> SceneSnapshot {
        self.dispatcher.lock().await.coordinator().snapshot()
    }

    pub async fn tick(&self, input: &TickInput) {
        self.dispatcher.lock().await.on_tick(input);
    }
}

/// Feeds the host's own broadcasts back into its dispatcher.
pub fn spawn_loopback(state: AppState, mut inbox: UnboundedReceiver<Envelope>) {
    tokio::spawn(async move {
        while let Some(envelope) = inbox.recv().await {
            let mut dispatcher = state.dispatcher.lock().await;
            // Rejections are already logged by the coordinator.
            let _ = dispatcher.on_network_message(envelope);
        }
        debug!("Host loopback closed");
    });
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
    pub connections: usize,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Basic health check endpoint
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Host session is running".to_string(),
        connections: state.transport.connection_count(),
    })
}

/// Authoritative scene state as seen by the host
pub async fn scene_state(State(state): State<AppState>) -> Json<SceneSnapshot> {
    Json(state.snapshot().await)
}

/// Applies an interaction of the host device, e.g. a poster click
pub async fn post_interaction(
    State(state): State<AppState>,
    Json(interaction): Json<Interaction>,
) -> Result<Json<SceneSnapshot>, (StatusCode, Json<ErrorResponse>)> {
    let mut dispatcher = state.dispatcher.lock().await;
    match dispatcher.on_local_interaction(interaction) {
        Ok(()) => Ok(Json(dispatcher.coordinator().snapshot())),
        Err(err) => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: err.to_string(),
            }),
        )),
    }
}

/// WebSocket endpoint for guest peers
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let peer = state.next_peer_id();
    info!("Upgrading connection for peer {}", peer);
    ws.on_upgrade(move |socket| handle_websocket_connection(socket, state, peer))
}

/// Creates and configures the main application router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/state", get(scene_state))
        .route("/interactions", post(post_interaction))
        .route("/ws", get(ws_handler))
        .with_state(state)
}
