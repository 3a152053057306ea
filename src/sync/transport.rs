//! Transport shim and an in-memory hub.
//!
//! The networking layer supplies a [`Transport`]; inbound traffic is handed to
//! the coordinator as [`Envelope`]s. Delivery is assumed reliable and ordered
//! per sender, with no acknowledgments.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::SyncError;
use crate::replication::types::PeerId;
use crate::sync::coordinator::SyncCoordinator;
use crate::sync::message::{Envelope, SyncMessage};
use crate::sync::presentation::Presentation;

pub trait Transport {
    fn send_to_host(&self, message: SyncMessage) -> Result<(), SyncError>;

    /// Sends to every connected peer, the sender included.
    fn broadcast_to_all(&self, message: SyncMessage) -> Result<(), SyncError>;

    fn send_to_peer(&self, peer: PeerId, message: SyncMessage) -> Result<(), SyncError>;
}

#[derive(Debug, Default)]
struct HubState {
    next_id: PeerId,
    host: Option<PeerId>,
    inboxes: BTreeMap<PeerId, VecDeque<Envelope>>,
}

/// In-process network: one FIFO inbox per connected peer.
///
/// The first connection is the host endpoint. Nothing is delivered until
/// [`LocalHub::pump`] (or [`LocalHub::next_message`]) is called, so tests can
/// interleave traffic and drop messages deliberately.
#[derive(Debug, Clone, Default)]
pub struct LocalHub {
    state: Arc<Mutex<HubState>>,
}

impl LocalHub {
    pub fn new() -> Self {
        LocalHub::default()
    }

    /// Opens a new endpoint with a fresh peer id, starting at 1.
    pub fn connect(&self) -> HubTransport {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = state.next_id;
        if state.host.is_none() {
            state.host = Some(id);
        }
        state.inboxes.insert(id, VecDeque::new());
        debug!("Hub endpoint {} connected", id);
        HubTransport {
            hub: self.clone(),
            id,
        }
    }

    /// Closes an endpoint and discards its undelivered messages.
    pub fn disconnect(&self, id: PeerId) {
        let mut state = self.state.lock();
        state.inboxes.remove(&id);
        if state.host == Some(id) {
            state.host = None;
        }
    }

    pub fn host(&self) -> Option<PeerId> {
        self.state.lock().host
    }

    /// Number of undelivered messages for `id`.
    pub fn pending(&self, id: PeerId) -> usize {
        self.state
            .lock()
            .inboxes
            .get(&id)
            .map_or(0, VecDeque::len)
    }

    pub fn next_message(&self, id: PeerId) -> Option<Envelope> {
        self.state
            .lock()
            .inboxes
            .get_mut(&id)
            .and_then(VecDeque::pop_front)
    }

    /// Discards the next undelivered message for `id`, simulating loss.
    pub fn drop_next(&self, id: PeerId) -> Option<Envelope> {
        let dropped = self.next_message(id);
        if let Some(envelope) = &dropped {
            debug!("Dropped {} for peer {}", envelope.message.kind(), id);
        }
        dropped
    }

    /// Delivers queued messages round-robin until every listed peer's inbox
    /// is empty. Returns the number of messages delivered.
    ///
    /// Rejected messages are logged by the receiving coordinator and skipped.
    pub fn pump<P: Presentation>(
        &self,
        peers: &mut [&mut SyncCoordinator<HubTransport, P>],
    ) -> usize {
        let mut delivered = 0;
        loop {
            let mut progressed = false;
            for peer in peers.iter_mut() {
                // The hub lock is released before delivery; handlers send.
                let Some(envelope) = self.next_message(peer.local_id()) else {
                    continue;
                };
                progressed = true;
                delivered += 1;
                let _ = peer.on_network_message(envelope);
            }
            if !progressed {
                return delivered;
            }
        }
    }

    fn enqueue(&self, to: PeerId, envelope: Envelope) -> Result<(), SyncError> {
        let mut state = self.state.lock();
        match state.inboxes.get_mut(&to) {
            Some(inbox) => {
                inbox.push_back(envelope);
                Ok(())
            }
            None => Err(SyncError::Transport(format!("peer {to} is not connected"))),
        }
    }
}

/// One endpoint of a [`LocalHub`].
#[derive(Debug, Clone)]
pub struct HubTransport {
    hub: LocalHub,
    id: PeerId,
}

impl HubTransport {
    pub fn id(&self) -> PeerId {
        self.id
    }
}

impl Transport for HubTransport {
    fn send_to_host(&self, message: SyncMessage) -> Result<(), SyncError> {
        let Some(host) = self.hub.host() else {
            warn!("Peer {} has no host to send {} to", self.id, message.kind());
            return Err(SyncError::Transport("no host endpoint".to_string()));
        };
        self.hub.enqueue(host, Envelope::new(self.id, message))
    }

    fn broadcast_to_all(&self, message: SyncMessage) -> Result<(), SyncError> {
        let mut state = self.hub.state.lock();
        for inbox in state.inboxes.values_mut() {
            inbox.push_back(Envelope::new(self.id, message.clone()));
        }
        Ok(())
    }

    fn send_to_peer(&self, peer: PeerId, message: SyncMessage) -> Result<(), SyncError> {
        self.hub.enqueue(peer, Envelope::new(self.id, message))
    }
}
