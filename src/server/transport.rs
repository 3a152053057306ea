//! Transport backed by the host's WebSocket connections.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error};

use crate::error::SyncError;
use crate::replication::types::PeerId;
use crate::sync::message::{Envelope, SyncMessage, encode};
use crate::sync::transport::Transport;

/// Fans host messages out to guest connections.
///
/// Every guest connection registers an outbound queue of encoded frames.
/// Messages addressed to the host itself go through a loopback queue so the
/// host handles its own broadcasts exactly like a guest does.
#[derive(Debug, Clone)]
pub struct ServerTransport {
    local_id: PeerId,
    outbound: Arc<RwLock<HashMap<PeerId, UnboundedSender<String>>>>,
    loopback: UnboundedSender<Envelope>,
}

impl ServerTransport {
    pub fn new(local_id: PeerId, loopback: UnboundedSender<Envelope>) -> Self {
        ServerTransport {
            local_id,
            outbound: Arc::new(RwLock::new(HashMap::new())),
            loopback,
        }
    }

    pub fn register(&self, peer: PeerId, sender: UnboundedSender<String>) {
        self.outbound.write().insert(peer, sender);
        debug!("Registered outbound queue for peer {}", peer);
    }

    pub fn unregister(&self, peer: PeerId) {
        self.outbound.write().remove(&peer);
    }

    pub fn connection_count(&self) -> usize {
        self.outbound.read().len()
    }

    fn send_local(&self, message: SyncMessage) -> Result<(), SyncError> {
        self.loopback
            .send(Envelope::new(self.local_id, message))
            .map_err(|_| SyncError::Transport("host loopback closed".to_string()))
    }
}

impl Transport for ServerTransport {
    fn send_to_host(&self, message: SyncMessage) -> Result<(), SyncError> {
        self.send_local(message)
    }

    fn broadcast_to_all(&self, message: SyncMessage) -> Result<(), SyncError> {
        let frame = encode(&Envelope::new(self.local_id, message.clone()))?;
        for (peer, sender) in self.outbound.read().iter() {
            // A closed queue means the connection is going away; its
            // session reports the disconnect.
            if sender.send(frame.clone()).is_err() {
                error!("Outbound queue for peer {} is closed", peer);
            }
        }
        self.send_local(message)
    }

    fn send_to_peer(&self, peer: PeerId, message: SyncMessage) -> Result<(), SyncError> {
        if peer == self.local_id {
            return self.send_local(message);
        }
        let frame = encode(&Envelope::new(self.local_id, message))?;
        let outbound = self.outbound.read();
        let sender = outbound
            .get(&peer)
            .ok_or_else(|| SyncError::Transport(format!("peer {peer} is not connected")))?;
        sender
            .send(frame)
            .map_err(|_| SyncError::Transport(format!("connection to peer {peer} closed")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::message::decode;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn test_broadcast_reaches_guests_and_loopback() {
        let (loop_tx, mut loop_rx) = unbounded_channel();
        let transport = ServerTransport::new(1, loop_tx);
        let (guest_tx, mut guest_rx) = unbounded_channel();
        transport.register(2, guest_tx);

        transport
            .broadcast_to_all(SyncMessage::PeerLeft { peer_id: 3 })
            .unwrap();

        let frame = guest_rx.try_recv().unwrap();
        let envelope: Envelope = decode(&frame).unwrap();
        assert_eq!(envelope.from, 1);
        assert_eq!(
            loop_rx.try_recv().unwrap().message,
            SyncMessage::PeerLeft { peer_id: 3 }
        );
    }

    #[test]
    fn test_send_to_unknown_peer() {
        let (loop_tx, _loop_rx) = unbounded_channel();
        let transport = ServerTransport::new(1, loop_tx);

        assert!(matches!(
            transport.send_to_peer(5, SyncMessage::FullSyncRequest),
            Err(SyncError::Transport(_))
        ));
        transport.unregister(5);
        assert_eq!(transport.connection_count(), 0);
    }
}
