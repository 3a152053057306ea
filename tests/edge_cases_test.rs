//! Edge case integration tests for session replication.
//!
//! These tests cover duplicate and stale broadcasts, message loss, forged
//! traffic, disconnects, anchor changes and placement boundaries.

use scene_sync::placement::rank_surfaces;
use scene_sync::{
    Envelope, FieldValue, HubTransport, LocalHub, ModelKind, ModelSelection, Mounting, ObjectId,
    Placeable, PlacementPass, PeerIdentity, PeerState, Pose, Scene, SceneMirror, Surface,
    SyncCoordinator, SyncError, SyncMessage, TickInput, Transform, Vec3, Version,
};

type Peer = SyncCoordinator<HubTransport, SceneMirror>;

fn connect(hub: &LocalHub, name: &str) -> Peer {
    let transport = hub.connect();
    SyncCoordinator::new(
        transport.id(),
        PeerIdentity::new(name, "10.0.0.1"),
        &Scene::standard(),
        Some(transport),
        SceneMirror::new(),
    )
}

fn session_with_guest() -> (LocalHub, Peer, Peer) {
    let hub = LocalHub::new();
    let mut host = connect(&hub, "host");
    host.start_host().unwrap();
    let mut guest = connect(&hub, "guest");
    host.on_peer_connected(guest.local_id()).unwrap();
    hub.pump(&mut [&mut host, &mut guest]);
    (hub, host, guest)
}

fn surface(width: f32, height: f32, distance: f32) -> Surface {
    Surface {
        center: Vec3::new(0.0, 1.5, distance),
        normal: Vec3::new(0.0, 0.0, -1.0),
        size: Vec3::new(width, height, 0.1),
        thickness: 0.1,
        distance,
    }
}

#[test]
fn test_duplicate_broadcast_is_idempotent() {
    let (hub, mut host, mut guest) = session_with_guest();
    host.select_model(ModelSelection::Engine).unwrap();

    let envelope = hub.next_message(guest.local_id()).unwrap();
    guest.on_network_message(envelope.clone()).unwrap();
    let once = guest.registry().snapshot();
    guest.on_network_message(envelope).unwrap();

    assert_eq!(guest.registry().snapshot(), once);
    assert_eq!(guest.registry().selection(), Some(ModelSelection::Engine));
}

#[test]
fn test_stale_broadcast_is_ignored() {
    let (hub, mut host, mut guest) = session_with_guest();
    host.select_model(ModelSelection::Car).unwrap();
    host.select_model(ModelSelection::Engine).unwrap();

    // Deliver the newer update first, then the older one
    let older = hub.next_message(guest.local_id()).unwrap();
    let newer = hub.next_message(guest.local_id()).unwrap();
    guest.on_network_message(newer).unwrap();
    guest.on_network_message(older).unwrap();

    assert_eq!(guest.registry().selection(), Some(ModelSelection::Engine));
    assert_eq!(
        guest.presentation().selection(),
        Some(ModelSelection::Engine)
    );
}

#[test]
fn test_lost_update_heals_on_full_sync() {
    let (hub, mut host, mut guest) = session_with_guest();
    host.select_model(ModelSelection::Car).unwrap();

    assert!(hub.drop_next(guest.local_id()).is_some());
    hub.pump(&mut [&mut host, &mut guest]);
    assert_eq!(guest.registry().selection(), Some(ModelSelection::HoloLens));

    guest.request_full_sync().unwrap();
    hub.pump(&mut [&mut host, &mut guest]);
    assert_eq!(guest.registry().selection(), Some(ModelSelection::Car));
}

#[test]
fn test_forged_field_update_is_rejected() {
    let (_hub, host, mut guest) = session_with_guest();
    let forged = Envelope::new(
        guest.local_id() + 10,
        SyncMessage::FieldUpdate {
            object: ObjectId::ModelLibrary,
            value: FieldValue::Selection(ModelSelection::Car),
            version: Version::new(1_000, 99),
        },
    );

    let result = guest.on_network_message(forged);

    assert!(matches!(
        result,
        Err(SyncError::AuthorityViolation {
            action: "broadcast field updates",
            ..
        })
    ));
    assert_eq!(guest.registry().selection(), host.registry().selection());
}

#[test]
fn test_update_before_welcome_is_rejected() {
    let hub = LocalHub::new();
    let mut lonely = connect(&hub, "lonely");
    let update = Envelope::new(
        7,
        SyncMessage::Spawn {
            prefab: scene_sync::PrefabId::BrownCube,
            pose: Default::default(),
        },
    );

    assert!(lonely.on_network_message(update).is_err());
    assert_eq!(lonely.presentation().spawned_count(), 0);
}

#[test]
fn test_request_from_unknown_peer_is_rejected() {
    let (_hub, mut host, _guest) = session_with_guest();
    let request = Envelope::new(
        99,
        SyncMessage::MutationRequest {
            object: ObjectId::ModelLibrary,
            value: FieldValue::Selection(ModelSelection::Engine),
        },
    );

    assert_eq!(
        host.on_network_message(request),
        Err(SyncError::UnknownPeer { peer: 99 })
    );
    assert_eq!(host.registry().selection(), Some(ModelSelection::HoloLens));
}

#[test]
fn test_disconnected_peer_no_longer_drives_state() {
    let (hub, mut host, mut guest) = session_with_guest();
    let guest_id = guest.local_id();
    host.on_peer_disconnected(guest_id).unwrap();
    hub.pump(&mut [&mut host, &mut guest]);

    let late = Envelope::new(
        guest_id,
        SyncMessage::MutationRequest {
            object: ObjectId::ModelLibrary,
            value: FieldValue::Selection(ModelSelection::Car),
        },
    );
    assert_eq!(
        host.on_network_message(late),
        Err(SyncError::PeerDisconnected { peer: guest_id })
    );
    assert_eq!(host.membership().active_count(), 1);
}

#[test]
fn test_host_departure_ends_guest_session() {
    let (hub, mut host, mut guest) = session_with_guest();
    let mut other = connect(&hub, "other");
    host.on_peer_connected(other.local_id()).unwrap();
    hub.pump(&mut [&mut host, &mut guest, &mut other]);

    // The host announces its own departure before going away
    let host_id = host.local_id();
    guest
        .on_network_message(Envelope::new(host_id, SyncMessage::PeerLeft { peer_id: host_id }))
        .unwrap();

    assert_eq!(
        guest.select_model(ModelSelection::Car),
        Err(SyncError::PeerDisconnected { peer: host_id })
    );
}

#[test]
fn test_second_introduction_is_rejected() {
    let (_hub, mut host, guest) = session_with_guest();
    let impostor = Envelope::new(
        guest.local_id(),
        SyncMessage::Introduce {
            name: "impostor".to_string(),
            address: "10.9.9.9".to_string(),
        },
    );

    assert_eq!(
        host.on_network_message(impostor),
        Err(SyncError::AlreadyIntroduced {
            peer: guest.local_id()
        })
    );
    let recorded = host.membership().peer(guest.local_id()).unwrap();
    assert_eq!(recorded.name.as_deref(), Some("guest"));
}

#[test]
fn test_avatar_pose_requires_anchor() {
    let (_hub, mut host, guest) = session_with_guest();
    let pose = Envelope::new(
        guest.local_id(),
        SyncMessage::AvatarPose {
            pose: Default::default(),
        },
    );

    assert_eq!(
        host.on_network_message(pose),
        Err(SyncError::AnchorNotEstablished {
            peer: guest.local_id()
        })
    );
}

#[test]
fn test_missing_anchor_source_keeps_avatar_hidden() {
    let (hub, mut host, mut guest) = session_with_guest();
    let input = TickInput {
        anchor: None,
        head: Some(Pose::new(Vec3::new(0.0, 1.7, 0.0), Default::default())),
    };

    for _ in 0..3 {
        guest.on_tick(&input);
    }
    hub.pump(&mut [&mut host, &mut guest]);
    host.on_tick(&TickInput::default());

    let peer = host.membership().peer(guest.local_id()).unwrap();
    assert_eq!(peer.state, PeerState::AnchorPending);
    assert!(host.avatars().shown(guest.local_id()).is_none());
    let avatar = host.presentation().avatar(guest.local_id());
    assert!(avatar.is_none_or(|view| !view.visible && view.pose.is_none()));
}

#[test]
fn test_anchor_loss_revokes_transform_authority() {
    let (hub, mut host, mut guest) = session_with_guest();
    let guest_id = guest.local_id();
    guest.on_tick(&TickInput {
        anchor: Some(true),
        head: Some(Pose::new(Vec3::new(0.0, 1.7, 0.0), Default::default())),
    });
    hub.pump(&mut [&mut host, &mut guest]);
    host.on_tick(&TickInput::default());
    assert!(host.presentation().avatar(guest_id).unwrap().visible);
    assert!(host.avatars().shown(guest_id).is_some());

    guest.on_tick(&TickInput {
        anchor: Some(false),
        head: None,
    });
    hub.pump(&mut [&mut host, &mut guest]);

    assert_eq!(
        host.membership().peer(guest_id).unwrap().state,
        PeerState::AnchorPending
    );
    assert!(!host.presentation().avatar(guest_id).unwrap().visible);
    assert!(host.avatars().shown(guest_id).is_none());

    let before = host.registry().transform(ObjectId::Sofa);
    let target = Transform::from_position(Vec3::new(2.0, 0.0, 2.0));
    guest
        .request_mutation(ObjectId::Sofa, FieldValue::Transform(target))
        .unwrap();
    hub.pump(&mut [&mut host, &mut guest]);
    assert_eq!(host.registry().transform(ObjectId::Sofa), before);
    assert_eq!(guest.registry().transform(ObjectId::Sofa), before);
}

#[test]
fn test_selection_on_poster_is_field_mismatch() {
    let (_hub, mut host, _guest) = session_with_guest();
    let poster = ObjectId::Poster(ModelKind::Car);

    assert!(matches!(
        host.request_mutation(poster, FieldValue::Selection(ModelSelection::Car)),
        Err(SyncError::FieldMismatch { .. })
    ));
}

#[test]
fn test_guest_transform_keeps_poster_scale() {
    let (hub, mut host, mut guest) = session_with_guest();
    let poster = ObjectId::Poster(ModelKind::HoloLens);
    let incoming = Transform::new(Vec3::new(0.0, 2.0, 3.5), Default::default(), Vec3::ONE);

    host.request_mutation(poster, FieldValue::Transform(incoming))
        .unwrap();
    hub.pump(&mut [&mut host, &mut guest]);

    let presented = guest.presentation().transform(poster).unwrap();
    assert_eq!(presented.position, incoming.position);
    assert_eq!(presented.scale, Vec3::new(0.6, 0.9, 0.02));
}

#[test]
fn test_greedy_placement_prefers_closest_fit() {
    let mut surfaces = vec![surface(5.0, 5.0, 2.0), surface(2.0, 2.0, 1.0)];
    rank_surfaces(&mut surfaces);
    let mut pass = PlacementPass::new(&surfaces);

    // The closest surface is too small; the farther one is taken
    let chosen = pass.assign(Vec3::new(3.0, 3.0, 0.1), Mounting::Wall).unwrap();
    assert_eq!(surfaces[chosen].distance, 2.0);
}

#[test]
fn test_placement_never_reuses_a_surface() {
    let surfaces = vec![surface(1.0, 1.0, 1.0)];
    let mut pass = PlacementPass::new(&surfaces);
    let placeable = Placeable {
        object: ObjectId::Poster(ModelKind::Car),
        mounting: Mounting::Wall,
        footprint: Vec3::new(0.6, 0.9, 0.02),
    };
    let current = Transform::default();

    assert!(pass.place(&placeable, &current).is_some());
    assert!(pass.place(&placeable, &current).is_none());
    assert_eq!(pass.used_count(), 1);
}

#[test]
fn test_placement_with_no_surfaces() {
    let surfaces: Vec<Surface> = Vec::new();
    let mut pass = PlacementPass::new(&surfaces);
    assert_eq!(pass.assign(Vec3::ONE, Mounting::Floor), None);
}

#[test]
fn test_equal_distances_keep_discovery_order() {
    let mut surfaces = vec![surface(1.0, 1.0, 1.5), surface(4.0, 4.0, 1.5)];
    rank_surfaces(&mut surfaces);
    let mut pass = PlacementPass::new(&surfaces);

    assert_eq!(pass.assign(Vec3::new(0.5, 0.5, 0.0), Mounting::Wall), Some(0));
    assert_eq!(surfaces[0].size.x, 1.0);
}
