//! # Scene Sync - host-authoritative shared scene replication
//!
//! Keeps the props of a shared mixed-reality scene (posters, the model
//! library and its model selector, the capsule and the sofa) consistent
//! across every peer of a session, whatever order the peers joined in.
//!
//! ## Features
//!
//! - **Host-authoritative**: only the host writes replicated fields; guests
//!   forward requests and wait for the host's broadcast
//! - **Versioned last-write-wins**: every committed change carries a
//!   host-issued version; stale broadcasts are dropped
//! - **Full sync for late joiners**: the host rebroadcasts every field on
//!   request, so a guest joining at any time converges
//! - **Greedy surface placement**: posters and the capsule go to the
//!   closest free surface that fits
//!
//! ## Example
//!
//! ```rust
//! use scene_sync::{
//!     LocalHub, ModelSelection, PeerIdentity, Scene, SceneMirror, SyncCoordinator,
//! };
//!
//! let hub = LocalHub::new();
//! let transport = hub.connect();
//! let mut host = SyncCoordinator::new(
//!     transport.id(),
//!     PeerIdentity::new("host", "127.0.0.1"),
//!     &Scene::standard(),
//!     Some(transport),
//!     SceneMirror::new(),
//! );
//! host.start_host().unwrap();
//! host.select_model(ModelSelection::Car).unwrap();
//! assert_eq!(host.registry().selection(), Some(ModelSelection::Car));
//! ```

pub mod client;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod placement;
pub mod replication;
pub mod server;
pub mod session;
pub mod sync;

// Re-export the main public API
pub use dispatcher::{Dispatcher, Event, Interaction, ManipulationMode};
pub use error::SyncError;
pub use placement::{Mounting, Placeable, PlacementPass, Surface};
pub use replication::{
    ExclusiveSelector, FieldValue, ModelKind, ModelSelection, ObjectId, ObjectRegistry, PeerId,
    Pose, PrefabId, Quat, ReplicatedObject, Scene, Transform, Vec3, Version,
};
pub use session::{Peer, PeerIdentity, PeerState, Role, SessionMembership};
pub use sync::{
    Envelope, HubTransport, LocalHub, MutationOutcome, Presentation, SceneMirror, SyncCoordinator,
    SyncMessage, TickInput, Transport,
};
