//! Session wire protocol.
//!
//! Messages are JSON objects tagged with `"type"`. Guests send requests to the
//! host; the host sends broadcasts (and one direct welcome) wrapped in an
//! [`Envelope`] naming the sender.

use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::replication::field::FieldValue;
use crate::replication::types::{ObjectId, PeerId, Pose, PrefabId, Version};
use crate::session::peer::Peer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncMessage {
    // Guest -> host requests
    /// Ask the host to commit a new field value
    MutationRequest { object: ObjectId, value: FieldValue },
    /// Ask the host to spawn a transient entity for everyone
    SpawnRequest { prefab: PrefabId, pose: Pose },
    /// Ask the host to rebroadcast the whole scene
    FullSyncRequest,
    /// Set-once name and address of the sending peer
    Introduce { name: String, address: String },
    /// The sender's shared anchor was found or lost
    AnchorStatus { established: bool },
    /// The sender's head pose, relative to the shared anchor
    AvatarPose { pose: Pose },

    // Host -> peers
    /// Sent directly to a new connection: its id, the host and the roster
    Welcome {
        peer_id: PeerId,
        host_id: PeerId,
        peers: Vec<Peer>,
    },
    /// A committed field value
    FieldUpdate {
        object: ObjectId,
        value: FieldValue,
        version: Version,
    },
    /// Fire-and-forget creation of a transient entity
    Spawn { prefab: PrefabId, pose: Pose },
    PeerUpdate { peer: Peer },
    PeerLeft { peer_id: PeerId },
    AvatarUpdate { peer_id: PeerId, pose: Pose },
}

impl SyncMessage {
    /// Returns true for messages only the host may originate.
    pub fn is_host_only(&self) -> bool {
        matches!(
            self,
            SyncMessage::Welcome { .. }
                | SyncMessage::FieldUpdate { .. }
                | SyncMessage::Spawn { .. }
                | SyncMessage::PeerUpdate { .. }
                | SyncMessage::PeerLeft { .. }
                | SyncMessage::AvatarUpdate { .. }
        )
    }

    /// What handling this message amounts to, for authority errors.
    pub fn action(&self) -> &'static str {
        match self {
            SyncMessage::MutationRequest { .. } => "commit mutation requests",
            SyncMessage::SpawnRequest { .. } => "commit spawn requests",
            SyncMessage::FullSyncRequest => "serve full sync",
            SyncMessage::Introduce { .. } => "record peer identities",
            SyncMessage::AnchorStatus { .. } => "track anchor readiness",
            SyncMessage::AvatarPose { .. } => "relay avatar poses",
            SyncMessage::Welcome { .. } => "welcome peers",
            SyncMessage::FieldUpdate { .. } => "broadcast field updates",
            SyncMessage::Spawn { .. } => "broadcast spawns",
            SyncMessage::PeerUpdate { .. } => "broadcast peer updates",
            SyncMessage::PeerLeft { .. } => "remove peers",
            SyncMessage::AvatarUpdate { .. } => "broadcast avatar poses",
        }
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            SyncMessage::MutationRequest { .. } => "mutation_request",
            SyncMessage::SpawnRequest { .. } => "spawn_request",
            SyncMessage::FullSyncRequest => "full_sync_request",
            SyncMessage::Introduce { .. } => "introduce",
            SyncMessage::AnchorStatus { .. } => "anchor_status",
            SyncMessage::AvatarPose { .. } => "avatar_pose",
            SyncMessage::Welcome { .. } => "welcome",
            SyncMessage::FieldUpdate { .. } => "field_update",
            SyncMessage::Spawn { .. } => "spawn",
            SyncMessage::PeerUpdate { .. } => "peer_update",
            SyncMessage::PeerLeft { .. } => "peer_left",
            SyncMessage::AvatarUpdate { .. } => "avatar_update",
        }
    }
}

/// A message together with the peer that sent it.
///
/// The transport fills in `from` from the connection the message arrived on,
/// so a peer cannot claim another peer's identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub from: PeerId,
    pub message: SyncMessage,
}

impl Envelope {
    pub fn new(from: PeerId, message: SyncMessage) -> Self {
        Envelope { from, message }
    }
}

pub fn encode<T: Serialize>(value: &T) -> Result<String, SyncError> {
    Ok(serde_json::to_string(value)?)
}

pub fn decode<T: for<'de> Deserialize<'de>>(text: &str) -> Result<T, SyncError> {
    Ok(serde_json::from_str(text)?)
}
