//! Session membership: roles, identities and anchor readiness of every peer.
//!
//! On the host this is the authoritative roster. On a guest it is a mirror
//! installed from the host's welcome and kept current by peer updates.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::error::SyncError;
use crate::replication::types::PeerId;
use crate::session::peer::{Peer, PeerState, Role};

#[derive(Debug, Clone)]
pub struct SessionMembership {
    local_id: PeerId,
    host_id: Option<PeerId>,
    peers: BTreeMap<PeerId, Peer>,
}

impl SessionMembership {
    pub fn new(local_id: PeerId) -> Self {
        SessionMembership {
            local_id,
            host_id: None,
            peers: BTreeMap::new(),
        }
    }

    pub fn local_id(&self) -> PeerId {
        self.local_id
    }

    pub fn host_id(&self) -> Option<PeerId> {
        self.host_id
    }

    /// Role of the local peer, or `None` before it is part of a session.
    pub fn local_role(&self) -> Option<Role> {
        match self.host_id {
            Some(host) if host == self.local_id => Some(Role::Host),
            Some(_) => Some(Role::Guest),
            None => None,
        }
    }

    pub fn is_host(&self) -> bool {
        self.local_role() == Some(Role::Host)
    }

    pub fn peer(&self, id: PeerId) -> Option<&Peer> {
        self.peers.get(&id)
    }

    /// Looks up a peer that is still connected.
    pub fn active_peer(&self, id: PeerId) -> Result<&Peer, SyncError> {
        match self.peers.get(&id) {
            Some(peer) if peer.is_active() => Ok(peer),
            Some(_) => Err(SyncError::PeerDisconnected { peer: id }),
            None => Err(SyncError::UnknownPeer { peer: id }),
        }
    }

    /// Connected peers, in id order.
    pub fn roster(&self) -> Vec<Peer> {
        self.peers
            .values()
            .filter(|peer| peer.is_active())
            .cloned()
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.peers.values().filter(|peer| peer.is_active()).count()
    }

    /// Adds a peer to the session and assigns its role.
    ///
    /// The first peer to join, or a peer explicitly starting the server,
    /// becomes host. A server start while a host exists is rejected.
    pub fn join(&mut self, id: PeerId, server_start: bool) -> Result<Role, SyncError> {
        if self.peers.contains_key(&id) {
            return Err(SyncError::PeerAlreadyJoined { peer: id });
        }
        let role = match (self.host_id, server_start) {
            (Some(host), true) => return Err(SyncError::HostAlreadyAssigned { host }),
            (Some(_), false) => Role::Guest,
            (None, _) => Role::Host,
        };
        if role == Role::Host {
            self.host_id = Some(id);
        }
        self.peers.insert(id, Peer::new(id, role));
        info!("Peer {} joined as {:?}", id, role);
        Ok(role)
    }

    /// Records the name and address a peer announced. Allowed once per peer;
    /// moves `Joining -> AnchorPending`.
    pub fn introduce(
        &mut self,
        id: PeerId,
        name: &str,
        address: &str,
    ) -> Result<Peer, SyncError> {
        let peer = self.active_peer_mut(id)?;
        if peer.name.is_some() || peer.state != PeerState::Joining {
            return Err(SyncError::AlreadyIntroduced { peer: id });
        }
        peer.name = Some(name.to_string());
        peer.address = Some(address.to_string());
        peer.state = PeerState::AnchorPending;
        info!("Peer {} is {} at {}", id, name, address);
        Ok(peer.clone())
    }

    /// Marks the peer's shared anchor as resolved.
    ///
    /// Returns the updated peer when the state changed, so the caller can
    /// notify the session; `None` if the anchor was already established.
    pub fn on_peer_ready(&mut self, id: PeerId) -> Result<Option<Peer>, SyncError> {
        let peer = self.active_peer_mut(id)?;
        match peer.state {
            PeerState::AnchorEstablished => Ok(None),
            PeerState::AnchorPending => {
                peer.state = PeerState::AnchorEstablished;
                info!("Anchor established for peer {}", id);
                Ok(Some(peer.clone()))
            }
            from => Err(SyncError::InvalidTransition {
                peer: id,
                from,
                to: PeerState::AnchorEstablished,
            }),
        }
    }

    /// Marks the peer's shared anchor as lost; its transforms stop counting
    /// until it is re-established.
    pub fn on_anchor_lost(&mut self, id: PeerId) -> Result<Option<Peer>, SyncError> {
        let peer = self.active_peer_mut(id)?;
        match peer.state {
            PeerState::AnchorEstablished => {
                peer.state = PeerState::AnchorPending;
                info!("Anchor lost for peer {}", id);
                Ok(Some(peer.clone()))
            }
            _ => Ok(None),
        }
    }

    /// Marks the peer as disconnected. Its entry stays as a tombstone.
    pub fn leave(&mut self, id: PeerId) -> Result<Peer, SyncError> {
        let peer = self.active_peer_mut(id)?;
        peer.state = PeerState::Disconnected;
        info!("Peer {} left the session", id);
        Ok(peer.clone())
    }

    /// Installs the host's roster on a guest.
    pub fn install(&mut self, host_id: PeerId, peers: Vec<Peer>) {
        self.host_id = Some(host_id);
        self.peers = peers.into_iter().map(|peer| (peer.id, peer)).collect();
        debug!(
            "Installed roster from host {} with {} peers",
            host_id,
            self.peers.len()
        );
    }

    /// Mirrors a peer update broadcast by the host.
    pub fn upsert(&mut self, peer: Peer) {
        self.peers.insert(peer.id, peer);
    }

    fn active_peer_mut(&mut self, id: PeerId) -> Result<&mut Peer, SyncError> {
        match self.peers.get_mut(&id) {
            Some(peer) if peer.is_active() => Ok(peer),
            Some(_) => Err(SyncError::PeerDisconnected { peer: id }),
            None => Err(SyncError::UnknownPeer { peer: id }),
        }
    }
}
