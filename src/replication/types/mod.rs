//! Type definitions for the replicated scene.
//!
//! This module contains the value types shared by every replicated object,
//! organized into focused submodules.

pub mod clock;
pub mod object_id;
pub mod peer_id;
pub mod transform;
pub mod version;

pub use clock::VersionClock;
pub use glam::{Quat, Vec3};
pub use object_id::{ModelKind, ObjectId, PrefabId};
pub use peer_id::PeerId;
pub use transform::{Pose, Transform};
pub use version::Version;
