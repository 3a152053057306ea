//! Guest peer over WebSocket.
//!
//! Connects to a host, waits for the welcome, then runs the dispatcher on
//! inbound envelopes and a fixed-rate tick until the host goes away.

use std::error::Error;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::dispatcher::Dispatcher;
use crate::error::SyncError;
use crate::replication::scene::Scene;
use crate::replication::types::{PeerId, Pose, Quat, Vec3};
use crate::session::peer::PeerIdentity;
use crate::sync::coordinator::{SyncCoordinator, TickInput};
use crate::sync::message::{Envelope, SyncMessage, decode, encode};
use crate::sync::presentation::SceneMirror;
use crate::sync::transport::Transport;

/// Head pose reported by a headless guest.
const HEADLESS_HEAD: Pose = Pose {
    position: Vec3::new(0.0, 1.6, 0.0),
    rotation: Quat::IDENTITY,
};

/// Guest side of the connection: everything goes to the host.
#[derive(Debug, Clone)]
pub struct ClientTransport {
    outbound: UnboundedSender<String>,
}

impl ClientTransport {
    pub fn new(outbound: UnboundedSender<String>) -> Self {
        ClientTransport { outbound }
    }
}

impl Transport for ClientTransport {
    fn send_to_host(&self, message: SyncMessage) -> Result<(), SyncError> {
        let frame = encode(&message)?;
        self.outbound
            .send(frame)
            .map_err(|_| SyncError::Transport("connection to host closed".to_string()))
    }

    fn broadcast_to_all(&self, _message: SyncMessage) -> Result<(), SyncError> {
        Err(SyncError::NotHost { action: "broadcast" })
    }

    fn send_to_peer(&self, _peer: PeerId, _message: SyncMessage) -> Result<(), SyncError> {
        Err(SyncError::NotHost {
            action: "message peers directly",
        })
    }
}

/// Guest run options.
#[derive(Debug, Clone)]
pub struct GuestOptions {
    pub url: String,
    pub identity: PeerIdentity,
    /// Report the shared anchor as located and stream a head pose
    pub anchored: bool,
    pub tick: Duration,
}

/// Runs a headless guest until the host closes the session.
pub async fn run_guest(options: GuestOptions) -> Result<SceneMirror, Box<dyn Error>> {
    let (stream, _) = connect_async(options.url.as_str()).await?;
    let (mut write, mut read) = stream.split();
    info!("Connected to {}", options.url);

    let welcome = loop {
        match read.next().await {
            Some(Ok(Message::Text(text))) => break decode::<Envelope>(&text)?,
            Some(Ok(_)) => continue,
            Some(Err(e)) => return Err(e.into()),
            None => return Err("host closed the connection before the welcome".into()),
        }
    };
    let &SyncMessage::Welcome { peer_id, .. } = &welcome.message else {
        return Err(format!("expected a welcome, got {}", welcome.message.kind()).into());
    };

    let (tx, mut rx) = unbounded_channel();
    let mirror = SceneMirror::new();
    let scene = Scene::standard();
    let coordinator = SyncCoordinator::new(
        peer_id,
        options.identity,
        &scene,
        Some(ClientTransport::new(tx)),
        mirror.clone(),
    );
    let mut dispatcher = Dispatcher::new(coordinator, scene);
    dispatcher.on_network_message(welcome)?;

    let input = TickInput {
        anchor: Some(options.anchored),
        head: options.anchored.then_some(HEADLESS_HEAD),
    };
    let mut ticker = tokio::time::interval(options.tick);

    loop {
        tokio::select! {
            frame = rx.recv() => {
                let Some(frame) = frame else { break };
                write.send(Message::Text(frame)).await?;
            }
            inbound = read.next() => match inbound {
                Some(Ok(Message::Text(text))) => match decode::<Envelope>(&text) {
                    Ok(envelope) => {
                        let _ = dispatcher.on_network_message(envelope);
                    }
                    Err(e) => warn!("Failed to parse frame from host: {}", e),
                },
                Some(Ok(Message::Close(_))) | None => {
                    info!("Host closed the session");
                    break;
                }
                Some(Ok(other)) => debug!("Ignoring frame {:?}", other),
                Some(Err(e)) => return Err(e.into()),
            },
            _ = ticker.tick() => dispatcher.on_tick(&input),
        }
    }

    Ok(mirror)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_only_talks_to_host() {
        let (tx, mut rx) = unbounded_channel();
        let transport = ClientTransport::new(tx);

        transport.send_to_host(SyncMessage::FullSyncRequest).unwrap();
        assert_eq!(rx.try_recv().unwrap(), r#"{"type":"full_sync_request"}"#);

        assert!(transport.broadcast_to_all(SyncMessage::FullSyncRequest).is_err());
        assert!(transport.send_to_peer(1, SyncMessage::FullSyncRequest).is_err());
    }

    #[test]
    fn test_closed_connection_is_transport_error() {
        let (tx, rx) = unbounded_channel();
        drop(rx);
        let transport = ClientTransport::new(tx);

        assert!(matches!(
            transport.send_to_host(SyncMessage::FullSyncRequest),
            Err(SyncError::Transport(_))
        ));
    }
}
