//! Greedy surface placement for wall and floor props.
//!
//! Given candidate surfaces ranked by distance to the viewer, each prop takes
//! the first unused surface large enough for its footprint. Earlier
//! assignments are never reconsidered, so a prop may end up on a farther
//! surface even when a better global assignment exists.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use glam::Mat3;

use crate::replication::types::{ObjectId, Quat, Transform, Vec3};

/// Distance of a floor prop above the detected floor plane, in meters.
pub const FLOOR_CLEARANCE: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mounting {
    /// Vertical surfaces; footprint width (x) and height (y) must fit
    Wall,
    /// Horizontal surfaces; footprint width (x) and depth (z) must fit
    Floor,
}

/// A flat surface extracted from the spatial mesh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    pub center: Vec3,
    pub normal: Vec3,
    /// Size of the surface's bounding box
    pub size: Vec3,
    pub thickness: f32,
    /// Distance from the viewer's head to the closest point of the surface
    pub distance: f32,
}

impl Surface {
    /// Returns true if `footprint` fits inside this surface for `mounting`.
    /// Equal extents fit.
    pub fn fits(&self, footprint: Vec3, mounting: Mounting) -> bool {
        match mounting {
            Mounting::Wall => footprint.x <= self.size.x && footprint.y <= self.size.y,
            Mounting::Floor => footprint.x <= self.size.x && footprint.z <= self.size.z,
        }
    }
}

/// A prop the placement pass may move, with the bounds it needs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placeable {
    pub object: ObjectId,
    pub mounting: Mounting,
    pub footprint: Vec3,
}

/// Sorts surfaces closest first; ties keep their discovery order.
pub fn rank_surfaces(surfaces: &mut [Surface]) {
    surfaces.sort_by(|a, b| a.distance.total_cmp(&b.distance));
}

/// Rotation whose forward (+Z) axis points along `forward` with up kept as
/// close to +Y as possible. A vertical `forward` uses world X as its right axis.
pub fn facing(forward: Vec3) -> Quat {
    let Some(z) = forward.try_normalize() else {
        return Quat::IDENTITY;
    };
    let x = Vec3::Y.cross(z).try_normalize().unwrap_or(Vec3::X);
    Quat::from_mat3(&Mat3::from_cols(x, z.cross(x), z))
}

/// Transform for a prop placed on `surface`.
///
/// Wall props sit on the front face of the plane and face along its normal.
/// Floor props hover at [`FLOOR_CLEARANCE`] and keep their rotation.
pub fn placement_transform(surface: &Surface, mounting: Mounting, current: &Transform) -> Transform {
    match mounting {
        Mounting::Wall => Transform {
            position: surface.center + surface.normal * (surface.thickness * 0.5),
            rotation: facing(surface.normal),
            scale: current.scale,
        },
        Mounting::Floor => Transform {
            position: surface.center + surface.normal * FLOOR_CLEARANCE,
            ..*current
        },
    }
}

/// One placement pass over a ranked surface list.
///
/// Surfaces assigned during the pass are not offered again.
#[derive(Debug)]
pub struct PlacementPass<'a> {
    surfaces: &'a [Surface],
    used: Vec<bool>,
}

impl<'a> PlacementPass<'a> {
    /// `surfaces` must already be ranked closest first.
    pub fn new(surfaces: &'a [Surface]) -> Self {
        PlacementPass {
            surfaces,
            used: vec![false; surfaces.len()],
        }
    }

    /// Finds the first unused surface that fits `footprint`, marks it used and
    /// returns its index. Returns `None` when nothing fits.
    pub fn assign(&mut self, footprint: Vec3, mounting: Mounting) -> Option<usize> {
        let index = self
            .surfaces
            .iter()
            .enumerate()
            .find(|(i, surface)| !self.used[*i] && surface.fits(footprint, mounting))
            .map(|(i, _)| i)?;
        self.used[index] = true;
        Some(index)
    }

    /// Places `placeable`, returning its new transform, or `None` if the prop
    /// should keep `current`.
    pub fn place(&mut self, placeable: &Placeable, current: &Transform) -> Option<Transform> {
        match self.assign(placeable.footprint, placeable.mounting) {
            Some(index) => {
                let surface = &self.surfaces[index];
                debug!(
                    "Placed {:?} on surface {} at distance {:.2}",
                    placeable.object, index, surface.distance
                );
                Some(placement_transform(surface, placeable.mounting, current))
            }
            None => {
                info!(
                    "No surface fits {:?}; keeping its default transform",
                    placeable.object
                );
                None
            }
        }
    }

    pub fn used_count(&self) -> usize {
        self.used.iter().filter(|used| **used).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wall(width: f32, height: f32, distance: f32) -> Surface {
        Surface {
            center: Vec3::new(0.0, 1.5, distance),
            normal: -Vec3::Z,
            size: Vec3::new(width, height, 0.05),
            thickness: 0.05,
            distance,
        }
    }

    #[test]
    fn test_nearest_fitting_surface_wins() {
        // A 3x3 footprint skips the closer 2x2 plane and takes the 5x5 one
        let surfaces = [wall(2.0, 2.0, 1.0), wall(5.0, 5.0, 2.0)];
        let mut pass = PlacementPass::new(&surfaces);

        assert_eq!(pass.assign(Vec3::new(3.0, 3.0, 0.0), Mounting::Wall), Some(1));
    }

    #[test]
    fn test_used_surface_is_skipped() {
        let surfaces = [wall(5.0, 5.0, 1.0), wall(5.0, 5.0, 2.0)];
        let mut pass = PlacementPass::new(&surfaces);
        let footprint = Vec3::new(1.0, 1.0, 0.0);

        assert_eq!(pass.assign(footprint, Mounting::Wall), Some(0));
        assert_eq!(pass.assign(footprint, Mounting::Wall), Some(1));
        assert_eq!(pass.assign(footprint, Mounting::Wall), None);
        assert_eq!(pass.used_count(), 2);
    }

    #[test]
    fn test_no_fit_returns_none() {
        let surfaces = [wall(1.0, 1.0, 1.0)];
        let mut pass = PlacementPass::new(&surfaces);

        assert_eq!(pass.assign(Vec3::new(1.5, 0.5, 0.0), Mounting::Wall), None);
        assert_eq!(pass.used_count(), 0);
    }

    #[test]
    fn test_equal_extent_fits() {
        let surface = wall(2.0, 3.0, 1.0);
        assert!(surface.fits(Vec3::new(2.0, 3.0, 9.0), Mounting::Wall));
    }

    #[test]
    fn test_floor_checks_width_and_depth() {
        let floor = Surface {
            center: Vec3::ZERO,
            normal: Vec3::Y,
            size: Vec3::new(2.0, 0.05, 1.0),
            thickness: 0.05,
            distance: 1.0,
        };
        // Height is irrelevant on the floor, depth is not
        assert!(floor.fits(Vec3::new(1.0, 10.0, 1.0), Mounting::Floor));
        assert!(!floor.fits(Vec3::new(1.0, 0.1, 1.5), Mounting::Floor));
    }

    #[test]
    fn test_ranking_is_stable_on_ties() {
        let mut surfaces = [wall(1.0, 1.0, 3.0), wall(2.0, 2.0, 1.0), wall(3.0, 3.0, 1.0)];
        rank_surfaces(&mut surfaces);

        assert_eq!(surfaces[0].size.x, 2.0);
        assert_eq!(surfaces[1].size.x, 3.0);
        assert_eq!(surfaces[2].size.x, 1.0);
    }

    #[test]
    fn test_wall_placement_faces_normal() {
        let surface = wall(2.0, 2.0, 2.0);
        let current = Transform::default().with_scale(Vec3::new(0.6, 0.9, 0.02));
        let placed = placement_transform(&surface, Mounting::Wall, &current);

        assert!(placed
            .position
            .abs_diff_eq(Vec3::new(0.0, 1.5, 2.0 - 0.025), 1e-5));
        assert!((placed.rotation * Vec3::Z).abs_diff_eq(-Vec3::Z, 1e-5));
        assert_eq!(placed.scale, current.scale);
    }

    #[test]
    fn test_floor_placement_keeps_rotation() {
        let floor = Surface {
            center: Vec3::new(1.0, 0.0, 2.0),
            normal: Vec3::Y,
            size: Vec3::new(2.0, 0.05, 2.0),
            thickness: 0.05,
            distance: 2.0,
        };
        let current = Transform::new(Vec3::ZERO, Quat::from_rotation_y(30f32.to_radians()), Vec3::ONE);
        let placed = placement_transform(&floor, Mounting::Floor, &current);

        assert!(placed.position.abs_diff_eq(Vec3::new(1.0, 0.2, 2.0), 1e-6));
        assert_eq!(placed.rotation, current.rotation);
    }

    #[test]
    fn test_facing_side_wall() {
        let normal = Vec3::new(-1.0, 0.0, 0.0);
        let q = facing(normal);
        assert!((q * Vec3::Z).abs_diff_eq(normal, 1e-5));
        assert!((q * Vec3::Y).abs_diff_eq(Vec3::Y, 1e-5));
        assert!(facing(Vec3::Z).abs_diff_eq(Quat::IDENTITY, 1e-5));
    }

    #[test]
    fn test_facing_straight_up() {
        let q = facing(Vec3::Y);
        assert!((q * Vec3::Z).abs_diff_eq(Vec3::Y, 1e-5));
        assert_eq!(facing(Vec3::ZERO), Quat::IDENTITY);
    }
}
