//! Peer definition and lifecycle states.

use serde::{Deserialize, Serialize};

use crate::replication::types::PeerId;

/// Peer name used by the spectator-view camera rig, which never shows an avatar.
pub const SPECTATOR_NAME: &str = "spectatorviewpc";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Host,
    Guest,
}

/// Lifecycle of a peer within the session.
///
/// `Joining -> AnchorPending -> AnchorEstablished`, with `AnchorEstablished`
/// falling back to `AnchorPending` if the shared anchor is lost. Any state can
/// move to `Disconnected`, which is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeerState {
    /// Connected, identity not yet known
    Joining,
    /// Identity known, shared anchor not yet resolved
    AnchorPending,
    /// Shared anchor resolved; transform updates from this peer are meaningful
    AnchorEstablished,
    Disconnected,
}

/// One participant of the shared session.
///
/// Name and address are set once by the owning peer and are read-only for
/// everyone else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    pub id: PeerId,
    pub name: Option<String>,
    pub address: Option<String>,
    pub role: Role,
    pub state: PeerState,
}

impl Peer {
    pub fn new(id: PeerId, role: Role) -> Self {
        Peer {
            id,
            name: None,
            address: None,
            role,
            state: PeerState::Joining,
        }
    }

    pub fn is_host(&self) -> bool {
        self.role == Role::Host
    }

    pub fn is_active(&self) -> bool {
        self.state != PeerState::Disconnected
    }

    pub fn anchor_established(&self) -> bool {
        self.state == PeerState::AnchorEstablished
    }

    pub fn is_spectator(&self) -> bool {
        self.name
            .as_deref()
            .is_some_and(|name| name.eq_ignore_ascii_case(SPECTATOR_NAME))
    }

    /// Remote avatars are drawn only once their owner shares our anchor frame.
    pub fn avatar_visible(&self) -> bool {
        self.anchor_established() && !self.is_spectator()
    }
}

/// Name and network address a peer announces about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerIdentity {
    pub name: String,
    pub address: String,
}

impl PeerIdentity {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        PeerIdentity {
            name: name.into(),
            address: address.into(),
        }
    }
}
