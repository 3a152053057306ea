//! Registry of every live replicated object in the session.
//!
//! Objects are kept in a SkipMap keyed by `ObjectId` with each object behind
//! its own `RwLock`. The coordinator owns the registry and makes every write;
//! key order makes full-sync enumeration walk objects in the
//! same order on every peer.

use crossbeam_skiplist::SkipMap;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::error::SyncError;
use crate::replication::field::FieldValue;
use crate::replication::object::{ApplyOutcome, ReplicatedObject};
use crate::replication::scene::Scene;
use crate::replication::selector::ModelSelection;
use crate::replication::types::{ObjectId, Transform, Version};

pub struct ObjectRegistry {
    objects: SkipMap<ObjectId, Arc<RwLock<ReplicatedObject>>>,
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        ObjectRegistry::new()
    }
}

impl ObjectRegistry {
    pub fn new() -> Self {
        ObjectRegistry {
            objects: SkipMap::new(),
        }
    }

    /// Creates every object of `scene` at its design-time transform.
    pub fn from_scene(scene: &Scene) -> Self {
        let registry = ObjectRegistry::new();
        for (id, transform) in &scene.objects {
            registry.insert(ReplicatedObject::new(*id, *transform));
        }
        registry
    }

    /// Registers an object, replacing any previous object with the same id.
    pub fn insert(&self, object: ReplicatedObject) {
        self.objects
            .insert(object.id(), Arc::new(RwLock::new(object)));
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.objects.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Returns a copy of the object's current state.
    pub fn get(&self, id: ObjectId) -> Option<ReplicatedObject> {
        self.objects.get(&id).map(|entry| entry.value().read().clone())
    }

    pub fn transform(&self, id: ObjectId) -> Option<Transform> {
        self.objects
            .get(&id)
            .map(|entry| *entry.value().read().transform())
    }

    /// Current model selection of the model library.
    pub fn selection(&self) -> Option<ModelSelection> {
        self.objects
            .get(&ObjectId::ModelLibrary)
            .and_then(|entry| entry.value().read().selection())
    }

    /// Validates that `id` exists and owns the field `value` targets.
    pub fn check(&self, id: ObjectId, value: &FieldValue) -> Result<(), SyncError> {
        match self.objects.get(&id) {
            Some(entry) => entry.value().read().check(value),
            None => Err(SyncError::UnknownObject { object: id }),
        }
    }

    /// Applies a field value to the object, last-write-wins.
    pub fn apply(
        &self,
        id: ObjectId,
        value: &FieldValue,
        version: Version,
    ) -> Result<ApplyOutcome, SyncError> {
        let Some(entry) = self.objects.get(&id) else {
            return Err(SyncError::UnknownObject { object: id });
        };
        let mut object = entry.value().write();
        object.apply(value, version)
    }

    /// Copies of every object, in registry order.
    pub fn snapshot(&self) -> Vec<ReplicatedObject> {
        self.objects
            .iter()
            .map(|entry| entry.value().read().clone())
            .collect()
    }

    /// Every field of every object with its version, in registry order.
    pub fn field_values(&self) -> Vec<(ObjectId, FieldValue, Version)> {
        self.objects
            .iter()
            .flat_map(|entry| {
                let object = entry.value().read();
                object
                    .field_values()
                    .into_iter()
                    .map(|(value, version)| (object.id(), value, version))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replication::types::{ModelKind, Vec3};

    #[test]
    fn test_registry_from_scene() {
        let registry = ObjectRegistry::from_scene(&Scene::standard());
        assert_eq!(registry.len(), 6);
        assert!(registry.contains(ObjectId::Capsule));
        assert_eq!(registry.selection(), Some(ModelSelection::HoloLens));
    }

    #[test]
    fn test_unknown_object() {
        let registry = ObjectRegistry::new();
        let value = FieldValue::Transform(Transform::default());

        assert_eq!(
            registry.apply(ObjectId::Sofa, &value, Version::new(1, 1)),
            Err(SyncError::UnknownObject {
                object: ObjectId::Sofa
            })
        );
        assert!(registry.check(ObjectId::Sofa, &value).is_err());
    }

    #[test]
    fn test_apply_updates_snapshot() {
        let registry = ObjectRegistry::from_scene(&Scene::standard());
        let moved = Transform::from_position(Vec3::new(4.0, 0.0, 1.0));

        registry
            .apply(ObjectId::Sofa, &FieldValue::Transform(moved), Version::new(1, 1))
            .unwrap();

        assert_eq!(registry.transform(ObjectId::Sofa), Some(moved));
    }

    #[test]
    fn test_field_values_follow_object_order() {
        let registry = ObjectRegistry::from_scene(&Scene::standard());
        let ids: Vec<ObjectId> = registry
            .field_values()
            .into_iter()
            .map(|(id, _, _)| id)
            .collect();

        // Three posters, the model library twice (transform + selection), capsule, sofa
        assert_eq!(ids.len(), 7);
        assert_eq!(ids[0], ObjectId::Poster(ModelKind::HoloLens));
        assert_eq!(ids[3], ObjectId::ModelLibrary);
        assert_eq!(ids[4], ObjectId::ModelLibrary);
        assert_eq!(ids[6], ObjectId::Sofa);
    }
}
