//! Sync coordinator: routes local mutations by role and applies session
//! traffic.
//!
//! The host is the only writer. It stamps every accepted change with a
//! version from its [`VersionClock`], applies it and broadcasts it. A guest
//! never changes a replicated field on its own; it forwards the request and
//! waits for the host's broadcast. Before a session exists the coordinator
//! runs offline and applies changes directly.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::SyncError;
use crate::replication::field::FieldValue;
use crate::replication::object::{ApplyOutcome, ReplicatedObject};
use crate::replication::registry::ObjectRegistry;
use crate::replication::scene::Scene;
use crate::replication::selector::ModelSelection;
use crate::replication::types::{ObjectId, PeerId, Pose, PrefabId, Vec3, Version, VersionClock};
use crate::session::membership::SessionMembership;
use crate::session::peer::{Peer, PeerIdentity, Role};
use crate::sync::avatar::AvatarBook;
use crate::sync::message::{Envelope, SyncMessage};
use crate::sync::presentation::Presentation;
use crate::sync::transport::Transport;

/// Distance in front of the head at which spawned cubes appear, in meters.
pub const SPAWN_DISTANCE: f32 = 1.2;

/// How a local mutation request was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    /// No session: applied locally without a version
    Applied,
    /// Host: applied and broadcast with this version
    Committed(Version),
    /// Guest: forwarded to the host; nothing changes until its broadcast
    Pending,
}

/// Per-frame input from the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Deserialize)]
pub struct TickInput {
    /// Whether the shared anchor is currently located; `None` when no anchor
    /// source is available
    pub anchor: Option<bool>,
    /// Head pose relative to the shared anchor
    pub head: Option<Pose>,
}

/// Point-in-time copy of one peer's view of the session.
#[derive(Debug, Clone, Serialize)]
pub struct SceneSnapshot {
    pub taken_at: DateTime<Utc>,
    pub local_id: PeerId,
    pub host: Option<PeerId>,
    pub peers: Vec<Peer>,
    pub objects: Vec<ReplicatedObject>,
}

pub struct SyncCoordinator<T: Transport, P: Presentation> {
    local_id: PeerId,
    identity: PeerIdentity,
    membership: SessionMembership,
    registry: ObjectRegistry,
    clock: VersionClock,
    transport: Option<T>,
    presentation: P,
    avatars: AvatarBook,
    reported_anchor: Option<bool>,
    anchor_source_missing: bool,
}

impl<T: Transport, P: Presentation> SyncCoordinator<T, P> {
    /// Creates a coordinator holding `scene` at its design-time layout and
    /// presents that layout.
    ///
    /// Without a transport the coordinator stays offline for its lifetime.
    pub fn new(
        local_id: PeerId,
        identity: PeerIdentity,
        scene: &Scene,
        transport: Option<T>,
        presentation: P,
    ) -> Self {
        if transport.is_none() {
            warn!(
                "{}; peer {} runs offline",
                SyncError::MissingCollaborator { name: "transport" },
                local_id
            );
        }
        let coordinator = SyncCoordinator {
            local_id,
            identity,
            membership: SessionMembership::new(local_id),
            registry: ObjectRegistry::from_scene(scene),
            clock: VersionClock::new(local_id),
            transport,
            presentation,
            avatars: AvatarBook::new(),
            reported_anchor: None,
            anchor_source_missing: false,
        };
        for object in coordinator.registry.snapshot() {
            coordinator.present_object(&object);
        }
        coordinator
    }

    pub fn local_id(&self) -> PeerId {
        self.local_id
    }

    pub fn identity(&self) -> &PeerIdentity {
        &self.identity
    }

    /// Role in the current session, `None` while offline.
    pub fn role(&self) -> Option<Role> {
        self.membership.local_role()
    }

    pub fn is_host(&self) -> bool {
        self.membership.is_host()
    }

    pub fn membership(&self) -> &SessionMembership {
        &self.membership
    }

    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    pub fn presentation(&self) -> &P {
        &self.presentation
    }

    pub fn avatars(&self) -> &AvatarBook {
        &self.avatars
    }

    pub fn snapshot(&self) -> SceneSnapshot {
        SceneSnapshot {
            taken_at: Utc::now(),
            local_id: self.local_id,
            host: self.membership.host_id(),
            peers: self.membership.roster(),
            objects: self.registry.snapshot(),
        }
    }

    /// Opens a session with this peer as host.
    pub fn start_host(&mut self) -> Result<(), SyncError> {
        self.transport()?;
        self.membership.join(self.local_id, true)?;
        let me = self.membership.introduce(
            self.local_id,
            &self.identity.name,
            &self.identity.address,
        )?;
        info!("Peer {} is hosting the session", self.local_id);
        self.transport()?
            .broadcast_to_all(SyncMessage::PeerUpdate { peer: me })
    }

    /// Host: admits a newly connected peer and sends it the welcome.
    pub fn on_peer_connected(&mut self, peer: PeerId) -> Result<(), SyncError> {
        self.require_host("admit peers")?;
        self.membership.join(peer, false)?;
        let welcome = SyncMessage::Welcome {
            peer_id: peer,
            host_id: self.local_id,
            peers: self.membership.roster(),
        };
        let transport = self.transport()?;
        transport.send_to_peer(peer, welcome)?;
        if let Some(joined) = self.membership.peer(peer).cloned() {
            transport.broadcast_to_all(SyncMessage::PeerUpdate { peer: joined })?;
        }
        Ok(())
    }

    /// Host: removes a peer whose connection closed.
    pub fn on_peer_disconnected(&mut self, peer: PeerId) -> Result<(), SyncError> {
        self.require_host("remove peers")?;
        self.membership.leave(peer)?;
        self.forget_avatar(peer);
        self.transport()?
            .broadcast_to_all(SyncMessage::PeerLeft { peer_id: peer })
    }

    /// Routes a change of one replicated field by role.
    ///
    /// The host's own changes skip the anchor check: the host defines the
    /// shared frame.
    pub fn request_mutation(
        &mut self,
        object: ObjectId,
        value: FieldValue,
    ) -> Result<MutationOutcome, SyncError> {
        self.registry.check(object, &value)?;
        match self.role() {
            Some(Role::Host) => Ok(MutationOutcome::Committed(self.commit(object, value)?)),
            Some(Role::Guest) => {
                self.session_host()?;
                debug!("Forwarding {:?} change of {:?} to host", value.field_id(), object);
                self.transport()?
                    .send_to_host(SyncMessage::MutationRequest { object, value })?;
                Ok(MutationOutcome::Pending)
            }
            None => {
                if self.registry.apply(object, &value, Version::INITIAL)? == ApplyOutcome::Applied {
                    self.present(object, &value);
                }
                Ok(MutationOutcome::Applied)
            }
        }
    }

    pub fn select_model(&mut self, selection: ModelSelection) -> Result<MutationOutcome, SyncError> {
        self.request_mutation(ObjectId::ModelLibrary, FieldValue::Selection(selection))
    }

    /// Spawns a cube [`SPAWN_DISTANCE`] in front of `head`. Returns the spawn
    /// pose.
    ///
    /// Spawns are presented when the host's broadcast arrives, the host's own
    /// included. The host drops spawn requests from guests whose anchor is not
    /// established.
    pub fn spawn_cube(&mut self, head: &Pose) -> Result<Pose, SyncError> {
        let pose = Pose::new(
            head.transform_point(Vec3::new(0.0, 0.0, SPAWN_DISTANCE)),
            head.rotation,
        );
        let prefab = PrefabId::BrownCube;
        match self.role() {
            Some(Role::Host) => self
                .transport()?
                .broadcast_to_all(SyncMessage::Spawn { prefab, pose })?,
            Some(Role::Guest) => {
                self.session_host()?;
                self.transport()?
                    .send_to_host(SyncMessage::SpawnRequest { prefab, pose })?
            }
            None => self.presentation.spawn_transient(prefab, &pose),
        }
        Ok(pose)
    }

    /// Guest: asks the host to rebroadcast every replicated field.
    pub fn request_full_sync(&mut self) -> Result<(), SyncError> {
        match self.role() {
            Some(Role::Guest) => {
                self.session_host()?;
                info!("Peer {} requesting full sync", self.local_id);
                self.transport()?.send_to_host(SyncMessage::FullSyncRequest)
            }
            _ => {
                debug!("Full sync requested without a remote host; nothing to do");
                Ok(())
            }
        }
    }

    /// Host: rebroadcasts every field of every object with its current
    /// version. Spawned cubes are not part of the replicated state and are
    /// not re-sent. Returns the number of updates broadcast.
    pub fn on_guest_joined(&mut self, requester: PeerId) -> Result<usize, SyncError> {
        self.require_host("serve full sync")?;
        self.membership.active_peer(requester)?;
        let transport = self.transport()?;
        let fields = self.registry.field_values();
        let count = fields.len();
        for (object, value, version) in fields {
            transport.broadcast_to_all(SyncMessage::FieldUpdate {
                object,
                value,
                version,
            })?;
        }
        info!("Full sync for peer {}: {} field updates", requester, count);
        Ok(count)
    }

    /// Handles one inbound message. Rejected messages are logged and change
    /// nothing.
    pub fn on_network_message(&mut self, envelope: Envelope) -> Result<(), SyncError> {
        let Envelope { from, message } = envelope;
        let kind = message.kind();
        debug!("Peer {} received {} from {}", self.local_id, kind, from);
        let result = self.handle_message(from, message);
        if let Err(err) = &result {
            warn!("Rejected {} from peer {}: {}", kind, from, err);
        }
        result
    }

    /// Reports anchor changes and the head pose, then advances remote
    /// avatars one step.
    pub fn on_tick(&mut self, input: &TickInput) {
        match input.anchor {
            Some(established) => self.report_anchor(established),
            None if !self.anchor_source_missing => {
                warn!(
                    "{}; avatar reporting disabled",
                    SyncError::MissingCollaborator {
                        name: "anchor source"
                    }
                );
                self.anchor_source_missing = true;
            }
            None => {}
        }
        if let Some(head) = input.head {
            self.report_head(head);
        }
        for (peer, pose) in self.avatars.step() {
            self.presentation.set_avatar_pose(peer, &pose);
        }
    }

    fn handle_message(&mut self, from: PeerId, message: SyncMessage) -> Result<(), SyncError> {
        if message.is_host_only() {
            self.authorize_host_sender(from, &message)?;
        } else {
            if !self.is_host() {
                return Err(SyncError::NotHost {
                    action: message.action(),
                });
            }
            self.membership.active_peer(from)?;
        }

        match message {
            SyncMessage::MutationRequest { object, value } => {
                if value.is_positional() {
                    self.require_anchor(from)?;
                }
                self.registry.check(object, &value)?;
                self.commit(object, value)?;
            }
            SyncMessage::SpawnRequest { prefab, pose } => {
                // Spawn poses are anchor-relative
                self.require_anchor(from)?;
                self.transport()?
                    .broadcast_to_all(SyncMessage::Spawn { prefab, pose })?;
            }
            SyncMessage::FullSyncRequest => {
                self.on_guest_joined(from)?;
            }
            SyncMessage::Introduce { name, address } => {
                let peer = self.membership.introduce(from, &name, &address)?;
                self.publish_peer(peer)?;
            }
            SyncMessage::AnchorStatus { established } => {
                let changed = if established {
                    self.membership.on_peer_ready(from)?
                } else {
                    self.membership.on_anchor_lost(from)?
                };
                if let Some(peer) = changed {
                    self.publish_peer(peer)?;
                }
            }
            SyncMessage::AvatarPose { pose } => {
                self.require_anchor(from)?;
                self.transport()?
                    .broadcast_to_all(SyncMessage::AvatarUpdate {
                        peer_id: from,
                        pose,
                    })?;
            }
            SyncMessage::Welcome {
                peer_id,
                host_id,
                peers,
            } => self.on_welcome(peer_id, host_id, peers)?,
            SyncMessage::FieldUpdate {
                object,
                value,
                version,
            } => {
                self.clock.observe(version);
                match self.registry.apply(object, &value, version)? {
                    ApplyOutcome::Applied => self.present(object, &value),
                    ApplyOutcome::Stale => debug!(
                        "Ignoring stale {:?} update of {:?} at {:?}",
                        value.field_id(),
                        object,
                        version
                    ),
                }
            }
            SyncMessage::Spawn { prefab, pose } => {
                self.presentation.spawn_transient(prefab, &pose);
            }
            SyncMessage::PeerUpdate { peer } => {
                // The host's roster is authoritative; its own echo is stale.
                if !self.is_host() {
                    self.present_peer(&peer);
                    self.membership.upsert(peer);
                }
            }
            SyncMessage::PeerLeft { peer_id } => {
                if !self.is_host() {
                    self.on_peer_left(peer_id);
                }
            }
            SyncMessage::AvatarUpdate { peer_id, pose } => {
                let visible = self
                    .membership
                    .peer(peer_id)
                    .is_some_and(Peer::avatar_visible);
                if peer_id != self.local_id && visible {
                    self.avatars.set_target(peer_id, pose);
                }
            }
        }
        Ok(())
    }

    fn authorize_host_sender(&self, from: PeerId, message: &SyncMessage) -> Result<(), SyncError> {
        let authorized = match (self.membership.host_id(), message) {
            (Some(host), _) => host == from,
            // First contact: only a welcome signed by its own host
            (None, SyncMessage::Welcome { host_id, .. }) => *host_id == from,
            (None, _) => false,
        };
        if authorized {
            Ok(())
        } else {
            Err(SyncError::AuthorityViolation {
                peer: from,
                action: message.action(),
            })
        }
    }

    fn on_welcome(
        &mut self,
        peer_id: PeerId,
        host_id: PeerId,
        peers: Vec<Peer>,
    ) -> Result<(), SyncError> {
        if peer_id != self.local_id {
            return Err(SyncError::Transport(format!(
                "welcome addressed to peer {peer_id}, expected {}",
                self.local_id
            )));
        }
        for peer in &peers {
            self.present_peer(peer);
        }
        self.membership.install(host_id, peers);
        self.reported_anchor = None;
        info!("Peer {} joined the session of host {}", self.local_id, host_id);

        let transport = self.transport()?;
        transport.send_to_host(SyncMessage::Introduce {
            name: self.identity.name.clone(),
            address: self.identity.address.clone(),
        })?;
        transport.send_to_host(SyncMessage::FullSyncRequest)
    }

    fn on_peer_left(&mut self, peer_id: PeerId) {
        if self.membership.leave(peer_id).is_err() {
            return;
        }
        self.forget_avatar(peer_id);
        if Some(peer_id) == self.membership.host_id() {
            info!("Host {} left; session ended", peer_id);
        }
    }

    /// Host path: stamps, applies, presents and broadcasts one change.
    fn commit(&mut self, object: ObjectId, value: FieldValue) -> Result<Version, SyncError> {
        let version = self.clock.tick();
        self.registry.apply(object, &value, version)?;
        self.present(object, &value);
        self.transport()?.broadcast_to_all(SyncMessage::FieldUpdate {
            object,
            value,
            version,
        })?;
        debug!("Committed {:?} change of {:?} at {:?}", value.field_id(), object, version);
        Ok(version)
    }

    fn report_anchor(&mut self, established: bool) {
        if self.reported_anchor == Some(established) {
            return;
        }
        let result = match self.role() {
            Some(Role::Host) => {
                let changed = if established {
                    self.membership.on_peer_ready(self.local_id)
                } else {
                    self.membership.on_anchor_lost(self.local_id)
                };
                match changed {
                    Ok(Some(peer)) => self.publish_peer(peer),
                    Ok(None) => Ok(()),
                    Err(err) => Err(err),
                }
            }
            Some(Role::Guest) => self.transport().and_then(|transport| {
                transport.send_to_host(SyncMessage::AnchorStatus { established })
            }),
            None => return,
        };
        match result {
            Ok(()) => self.reported_anchor = Some(established),
            Err(err) => error!("Failed to report anchor status: {}", err),
        }
    }

    fn report_head(&mut self, head: Pose) {
        if self.reported_anchor != Some(true) {
            return;
        }
        let message = match self.role() {
            Some(Role::Host) => SyncMessage::AvatarUpdate {
                peer_id: self.local_id,
                pose: head,
            },
            Some(Role::Guest) => SyncMessage::AvatarPose { pose: head },
            None => return,
        };
        let result = self.transport().and_then(|transport| {
            if self.is_host() {
                transport.broadcast_to_all(message)
            } else {
                transport.send_to_host(message)
            }
        });
        if let Err(err) = result {
            error!("Failed to report head pose: {}", err);
        }
    }

    /// Host: broadcasts a roster change and updates its own view of the peer.
    fn publish_peer(&mut self, peer: Peer) -> Result<(), SyncError> {
        self.present_peer(&peer);
        self.transport()?
            .broadcast_to_all(SyncMessage::PeerUpdate { peer })
    }

    fn present_peer(&mut self, peer: &Peer) {
        if peer.id == self.local_id {
            return;
        }
        let visible = peer.avatar_visible();
        self.presentation.set_avatar_visible(peer.id, visible);
        if !visible {
            self.avatars.remove(peer.id);
        }
    }

    fn forget_avatar(&mut self, peer: PeerId) {
        self.avatars.remove(peer);
        self.presentation.set_avatar_visible(peer, false);
    }

    fn present(&self, object: ObjectId, value: &FieldValue) {
        match value {
            FieldValue::Transform(_) => {
                if let Some(transform) = self.registry.transform(object) {
                    self.presentation.set_transform(object, &transform);
                }
            }
            FieldValue::Selection(selection) => self.presentation.set_visible(object, *selection),
        }
    }

    fn present_object(&self, object: &ReplicatedObject) {
        self.presentation.set_transform(object.id(), object.transform());
        if let Some(selection) = object.selection() {
            self.presentation.set_visible(object.id(), selection);
        }
    }

    fn require_host(&self, action: &'static str) -> Result<(), SyncError> {
        if self.is_host() {
            Ok(())
        } else {
            Err(SyncError::NotHost { action })
        }
    }

    fn require_anchor(&self, peer: PeerId) -> Result<(), SyncError> {
        if self.membership.active_peer(peer)?.anchor_established() {
            Ok(())
        } else {
            Err(SyncError::AnchorNotEstablished { peer })
        }
    }

    /// The session's host, if it is still connected.
    fn session_host(&self) -> Result<PeerId, SyncError> {
        let host = self
            .membership
            .host_id()
            .ok_or(SyncError::MissingCollaborator { name: "host" })?;
        self.membership.active_peer(host)?;
        Ok(host)
    }

    fn transport(&self) -> Result<&T, SyncError> {
        self.transport
            .as_ref()
            .ok_or(SyncError::MissingCollaborator { name: "transport" })
    }
}
