//! WebSocket session of one guest peer.
//!
//! Inbound frames carry bare [`SyncMessage`]s; the session wraps each in an
//! [`Envelope`] stamped with the connection's peer id before handing it to
//! the host. Outbound frames are envelopes queued by [`ServerTransport`].
//!
//! [`ServerTransport`]: crate::server::transport::ServerTransport

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tracing::{error, info, warn};

use crate::replication::types::PeerId;
use crate::server::routes::AppState;
use crate::sync::message::{Envelope, SyncMessage, decode};

pub struct GuestSession {
    socket: WebSocket,
    state: AppState,
    peer: PeerId,
}

impl GuestSession {
    pub fn new(socket: WebSocket, state: AppState, peer: PeerId) -> Self {
        Self {
            socket,
            state,
            peer,
        }
    }

    /// Handle the WebSocket connection lifecycle
    pub async fn handle(self) {
        let GuestSession {
            socket,
            state,
            peer,
        } = self;

        let Some(mut outbound) = admit(&state, peer).await else {
            return;
        };
        info!("WebSocket session for peer {} established", peer);

        let (mut sender, mut receiver) = socket.split();
        loop {
            tokio::select! {
                frame = outbound.recv() => {
                    let Some(frame) = frame else { break };
                    if let Err(e) = sender.send(Message::Text(frame)).await {
                        warn!("Failed to send to peer {}: {}", peer, e);
                        break;
                    }
                }
                inbound = receiver.next() => match inbound {
                    Some(Ok(Message::Text(text))) => handle_text_message(&state, peer, &text).await,
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Peer {} closed the connection", peer);
                        break;
                    }
                    Some(Ok(_)) => {
                        // Binary frames are not part of the protocol
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error for peer {}: {}", peer, e);
                        break;
                    }
                },
            }
        }

        state.transport.unregister(peer);
        let mut dispatcher = state.dispatcher.lock().await;
        if let Err(e) = dispatcher.coordinator_mut().on_peer_disconnected(peer) {
            error!("Failed to remove peer {}: {}", peer, e);
        }
    }
}

/// Registers the connection and admits the peer under the dispatcher lock,
/// so the welcome is the first frame queued for it.
async fn admit(state: &AppState, peer: PeerId) -> Option<UnboundedReceiver<String>> {
    let (tx, rx) = unbounded_channel();
    let mut dispatcher = state.dispatcher.lock().await;
    state.transport.register(peer, tx);
    match dispatcher.coordinator_mut().on_peer_connected(peer) {
        Ok(()) => Some(rx),
        Err(e) => {
            error!("Failed to admit peer {}: {}", peer, e);
            state.transport.unregister(peer);
            None
        }
    }
}

async fn handle_text_message(state: &AppState, peer: PeerId, text: &str) {
    match decode::<SyncMessage>(text) {
        Ok(message) => {
            let mut dispatcher = state.dispatcher.lock().await;
            // Rejections are logged by the coordinator; the connection stays up.
            let _ = dispatcher.on_network_message(Envelope::new(peer, message));
        }
        Err(e) => warn!("Failed to parse message from peer {}: {}", peer, e),
    }
}

/// Create and handle a new WebSocket session
pub async fn handle_websocket_connection(socket: WebSocket, state: AppState, peer: PeerId) {
    GuestSession::new(socket, state, peer).handle().await;
}
