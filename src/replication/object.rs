//! Replicated objects: the field bundles behind each shared prop.

use serde::Serialize;

use crate::error::SyncError;
use crate::replication::field::{FieldId, FieldValue, ReplicatedField};
use crate::replication::selector::{ExclusiveSelector, ModelSelection};
use crate::replication::types::{ObjectId, Transform, Version};

/// Result of applying a field value to an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The value carried a version older than the current one and was dropped.
    Stale,
}

/// One prop of the shared scene.
///
/// Every object owns a transform. Posters and the model library replicate only
/// position and rotation, so an incoming transform keeps the local scale for
/// them. The model library also owns the exclusive model selector.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReplicatedObject {
    id: ObjectId,
    transform: ReplicatedField<Transform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    selector: Option<ExclusiveSelector>,
}

impl ReplicatedObject {
    /// Creates an object at its design-time transform.
    pub fn new(id: ObjectId, transform: Transform) -> Self {
        ReplicatedObject {
            id,
            transform: ReplicatedField::new(transform),
            selector: id.has_selector().then(ExclusiveSelector::default),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn transform(&self) -> &Transform {
        self.transform.value()
    }

    pub fn selector(&self) -> Option<&ExclusiveSelector> {
        self.selector.as_ref()
    }

    pub fn selection(&self) -> Option<ModelSelection> {
        self.selector.as_ref().map(ExclusiveSelector::current)
    }

    /// Every field with its current version, in a stable order.
    pub fn field_values(&self) -> Vec<(FieldValue, Version)> {
        let mut fields = vec![(
            FieldValue::Transform(*self.transform.value()),
            self.transform.version(),
        )];
        if let Some(selector) = &self.selector {
            fields.push((FieldValue::Selection(selector.current()), selector.version()));
        }
        fields
    }

    /// Checks that this object owns the field `value` targets.
    pub fn check(&self, value: &FieldValue) -> Result<(), SyncError> {
        match value {
            FieldValue::Transform(_) => Ok(()),
            FieldValue::Selection(_) if self.selector.is_some() => Ok(()),
            FieldValue::Selection(_) => Err(SyncError::FieldMismatch {
                object: self.id,
                field: FieldId::Selection,
            }),
        }
    }

    /// Overwrites the targeted field, last-write-wins.
    pub fn apply(&mut self, value: &FieldValue, version: Version) -> Result<ApplyOutcome, SyncError> {
        self.check(value)?;
        let applied = match value {
            FieldValue::Transform(incoming) => {
                let next = if self.id.replicates_scale() {
                    *incoming
                } else {
                    incoming.with_scale(self.transform.value().scale)
                };
                self.transform.apply(next, version)
            }
            FieldValue::Selection(selection) => match self.selector.as_mut() {
                Some(selector) => selector.select(*selection, version),
                None => false,
            },
        };
        Ok(if applied {
            ApplyOutcome::Applied
        } else {
            ApplyOutcome::Stale
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replication::types::{ModelKind, Quat, Vec3};

    #[test]
    fn test_poster_keeps_local_scale() {
        let id = ObjectId::Poster(ModelKind::Car);
        let mut poster = ReplicatedObject::new(
            id,
            Transform::default().with_scale(Vec3::new(0.6, 0.9, 0.02)),
        );
        let incoming = Transform::new(Vec3::new(1.0, 1.5, 3.0), Quat::from_rotation_y(90f32.to_radians()), Vec3::ONE);

        let outcome = poster
            .apply(&FieldValue::Transform(incoming), Version::new(1, 1))
            .unwrap();

        assert_eq!(outcome, ApplyOutcome::Applied);
        assert_eq!(poster.transform().position, incoming.position);
        assert_eq!(poster.transform().scale, Vec3::new(0.6, 0.9, 0.02));
    }

    #[test]
    fn test_capsule_replicates_scale() {
        let mut capsule = ReplicatedObject::new(ObjectId::Capsule, Transform::default());
        let incoming = Transform::default().with_scale(Vec3::new(2.0, 2.0, 2.0));

        capsule
            .apply(&FieldValue::Transform(incoming), Version::new(1, 1))
            .unwrap();

        assert_eq!(*capsule.transform(), incoming);
    }

    #[test]
    fn test_selection_on_object_without_selector_is_rejected() {
        let mut sofa = ReplicatedObject::new(ObjectId::Sofa, Transform::default());
        let result = sofa.apply(
            &FieldValue::Selection(ModelSelection::Car),
            Version::new(1, 1),
        );

        assert_eq!(
            result,
            Err(SyncError::FieldMismatch {
                object: ObjectId::Sofa,
                field: FieldId::Selection,
            })
        );
    }

    #[test]
    fn test_model_library_fields() {
        let mut library = ReplicatedObject::new(ObjectId::ModelLibrary, Transform::default());
        library
            .apply(&FieldValue::Selection(ModelSelection::Engine), Version::new(3, 1))
            .unwrap();

        let fields = library.field_values();
        assert_eq!(fields.len(), 2);
        assert_eq!(
            fields[1],
            (FieldValue::Selection(ModelSelection::Engine), Version::new(3, 1))
        );
        assert_eq!(library.selection(), Some(ModelSelection::Engine));
    }

    #[test]
    fn test_stale_selection_reports_stale() {
        let mut library = ReplicatedObject::new(ObjectId::ModelLibrary, Transform::default());
        library
            .apply(&FieldValue::Selection(ModelSelection::Car), Version::new(5, 1))
            .unwrap();
        let outcome = library
            .apply(&FieldValue::Selection(ModelSelection::Engine), Version::new(4, 1))
            .unwrap();

        assert_eq!(outcome, ApplyOutcome::Stale);
        assert_eq!(library.selection(), Some(ModelSelection::Car));
    }
}
