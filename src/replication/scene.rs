//! Fixed scene layout: which props exist, where they start, and which of them
//! the placement pass may move.

use crate::placement::{Mounting, Placeable};
use crate::replication::types::{ModelKind, ObjectId, Quat, Transform, Vec3};

/// Design-time description of the shared scene.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub objects: Vec<(ObjectId, Transform)>,
    pub placeables: Vec<Placeable>,
}

impl Scene {
    /// The sample room: three model posters on a wall, the model library in
    /// front of the viewer, a capsule and a sofa on the floor.
    pub fn standard() -> Self {
        let poster_scale = Vec3::new(0.6, 0.9, 0.02);
        let facing_viewer = Quat::from_rotation_y(std::f32::consts::PI);

        let posters = ModelKind::ALL.iter().enumerate().map(|(i, kind)| {
            let x = -0.8 + 0.8 * i as f32;
            (
                ObjectId::Poster(*kind),
                Transform::new(Vec3::new(x, 1.5, 3.0), facing_viewer, poster_scale),
            )
        });

        let mut objects: Vec<(ObjectId, Transform)> = posters.collect();
        objects.push((
            ObjectId::ModelLibrary,
            Transform::from_position(Vec3::new(0.0, 0.0, 2.0)),
        ));
        objects.push((
            ObjectId::Capsule,
            Transform::new(
                Vec3::new(-1.5, 0.5, 2.0),
                Quat::IDENTITY,
                Vec3::new(0.5, 1.0, 0.5),
            ),
        ));
        objects.push((
            ObjectId::Sofa,
            Transform::new(
                Vec3::new(1.5, 0.0, 2.5),
                facing_viewer,
                Vec3::ONE,
            ),
        ));

        let mut placeables: Vec<Placeable> = ModelKind::ALL
            .iter()
            .map(|kind| Placeable {
                object: ObjectId::Poster(*kind),
                mounting: Mounting::Wall,
                footprint: poster_scale,
            })
            .collect();
        placeables.push(Placeable {
            object: ObjectId::Capsule,
            mounting: Mounting::Floor,
            footprint: Vec3::new(0.5, 1.0, 0.5),
        });

        Scene {
            objects,
            placeables,
        }
    }

    pub fn default_transform(&self, object: ObjectId) -> Option<Transform> {
        self.objects
            .iter()
            .find(|(id, _)| *id == object)
            .map(|(_, transform)| *transform)
    }

    /// Placeables for one kind of surface, in scene order.
    pub fn placeables_for(&self, mounting: Mounting) -> impl Iterator<Item = &Placeable> + '_ {
        self.placeables
            .iter()
            .filter(move |placeable| placeable.mounting == mounting)
    }
}
