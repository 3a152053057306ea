//! Presentation setters consumed by the rendering side.
//!
//! The coordinator never touches rendering directly; it reports every applied
//! change through [`Presentation`]. [`SceneMirror`] is an implementation that
//! records the presented state, used by the headless binary and by tests.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::replication::selector::ModelSelection;
use crate::replication::types::{ObjectId, PeerId, Pose, PrefabId, Transform};

pub trait Presentation {
    fn set_transform(&self, object: ObjectId, transform: &Transform);

    /// Shows the selected model of `selector` and hides the others.
    fn set_visible(&self, selector: ObjectId, selection: ModelSelection);

    fn spawn_transient(&self, prefab: PrefabId, pose: &Pose);

    fn set_avatar_visible(&self, _peer: PeerId, _visible: bool) {}

    fn set_avatar_pose(&self, _peer: PeerId, _pose: &Pose) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AvatarView {
    pub visible: bool,
    pub pose: Option<Pose>,
}

/// Everything a [`SceneMirror`] has been told to present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MirrorState {
    pub transforms: BTreeMap<ObjectId, Transform>,
    pub selection: Option<ModelSelection>,
    /// Every selection presented, in order
    pub selection_history: Vec<ModelSelection>,
    pub spawned: Vec<(PrefabId, Pose)>,
    pub avatars: BTreeMap<PeerId, AvatarView>,
}

/// Recording presentation; clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct SceneMirror {
    state: Arc<Mutex<MirrorState>>,
}

impl SceneMirror {
    pub fn new() -> Self {
        SceneMirror::default()
    }

    pub fn state(&self) -> MirrorState {
        self.state.lock().clone()
    }

    pub fn transform(&self, object: ObjectId) -> Option<Transform> {
        self.state.lock().transforms.get(&object).copied()
    }

    pub fn selection(&self) -> Option<ModelSelection> {
        self.state.lock().selection
    }

    pub fn spawned_count(&self) -> usize {
        self.state.lock().spawned.len()
    }

    pub fn avatar(&self, peer: PeerId) -> Option<AvatarView> {
        self.state.lock().avatars.get(&peer).copied()
    }
}

impl Presentation for SceneMirror {
    fn set_transform(&self, object: ObjectId, transform: &Transform) {
        debug!("present {:?} at {:?}", object, transform.position);
        self.state.lock().transforms.insert(object, *transform);
    }

    fn set_visible(&self, selector: ObjectId, selection: ModelSelection) {
        debug!("present {:?} showing {:?}", selector, selection);
        let mut state = self.state.lock();
        state.selection = Some(selection);
        state.selection_history.push(selection);
    }

    fn spawn_transient(&self, prefab: PrefabId, pose: &Pose) {
        debug!("spawn {:?} at {:?}", prefab, pose.position);
        self.state.lock().spawned.push((prefab, *pose));
    }

    fn set_avatar_visible(&self, peer: PeerId, visible: bool) {
        self.state.lock().avatars.entry(peer).or_default().visible = visible;
    }

    fn set_avatar_pose(&self, peer: PeerId, pose: &Pose) {
        self.state.lock().avatars.entry(peer).or_default().pose = Some(*pose);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replication::types::Vec3;

    #[test]
    fn test_clones_share_state() {
        let mirror = SceneMirror::new();
        let handle = mirror.clone();

        mirror.set_visible(ObjectId::ModelLibrary, ModelSelection::Car);
        mirror.spawn_transient(PrefabId::BrownCube, &Pose::default());

        assert_eq!(handle.selection(), Some(ModelSelection::Car));
        assert_eq!(handle.spawned_count(), 1);
    }

    #[test]
    fn test_avatar_tracking() {
        let mirror = SceneMirror::new();
        let pose = Pose::new(Vec3::new(0.0, 1.7, 0.0), Default::default());

        mirror.set_avatar_visible(9, true);
        mirror.set_avatar_pose(9, &pose);

        let avatar = mirror.avatar(9).unwrap();
        assert!(avatar.visible);
        assert_eq!(avatar.pose, Some(pose));
    }
}
