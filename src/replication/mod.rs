//! Replicated scene state.
//!
//! This module contains the replicated field, object and selector types and
//! the registry that holds every live object of the shared scene.

pub mod field;
pub mod object;
pub mod registry;
pub mod scene;
pub mod selector;
pub mod types;

pub use field::{FieldId, FieldValue, ReplicatedField};
pub use object::{ApplyOutcome, ReplicatedObject};
pub use registry::ObjectRegistry;
pub use scene::Scene;
pub use selector::{ExclusiveSelector, ModelSelection};
pub use types::{
    ModelKind, ObjectId, PeerId, Pose, PrefabId, Quat, Transform, Vec3, Version, VersionClock,
};
