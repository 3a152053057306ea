//! Error type shared by the replication, session and sync layers.

use thiserror::Error;

use crate::replication::field::FieldId;
use crate::replication::types::{ObjectId, PeerId};
use crate::session::peer::PeerState;

/// Errors raised while routing, validating or applying session traffic.
///
/// Every rejection leaves replicated state untouched. A superseded update is
/// not an error: it is dropped as stale by the receiving field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    /// A message that only the host may send arrived from another peer
    #[error("Authority violation: peer {peer} may not {action}")]
    AuthorityViolation { peer: PeerId, action: &'static str },

    /// A host-only operation was attempted on a peer that is not the host
    #[error("Only the host may {action}")]
    NotHost { action: &'static str },

    #[error("Unknown peer: {peer}")]
    UnknownPeer { peer: PeerId },

    #[error("Peer {peer} has disconnected")]
    PeerDisconnected { peer: PeerId },

    #[error("Session already has a host: peer {host}")]
    HostAlreadyAssigned { host: PeerId },

    #[error("Peer {peer} already joined the session")]
    PeerAlreadyJoined { peer: PeerId },

    /// Name and address are set once by the owning peer
    #[error("Peer {peer} already introduced itself")]
    AlreadyIntroduced { peer: PeerId },

    #[error("Invalid state transition for peer {peer}: {from:?} -> {to:?}")]
    InvalidTransition {
        peer: PeerId,
        from: PeerState,
        to: PeerState,
    },

    /// Positional updates from a peer without the shared anchor are meaningless
    #[error("Peer {peer} has not established the shared anchor")]
    AnchorNotEstablished { peer: PeerId },

    #[error("Unknown object: {object:?}")]
    UnknownObject { object: ObjectId },

    #[error("Object {object:?} has no {field:?} field")]
    FieldMismatch { object: ObjectId, field: FieldId },

    /// A required collaborator is absent; the dependent component disables itself
    #[error("Missing collaborator: {name}")]
    MissingCollaborator { name: &'static str },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Codec error: {0}")]
    Codec(String),
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Codec(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = SyncError::AuthorityViolation {
            peer: 4,
            action: "broadcast field updates",
        };
        assert_eq!(
            err.to_string(),
            "Authority violation: peer 4 may not broadcast field updates"
        );

        let err = SyncError::MissingCollaborator { name: "transport" };
        assert_eq!(err.to_string(), "Missing collaborator: transport");
    }
}
