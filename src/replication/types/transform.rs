//! Anchor-relative poses and transforms.

use serde::{Deserialize, Serialize};

use glam::{Quat, Vec3};

/// Position and rotation relative to the shared world anchor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Pose { position, rotation }
    }

    /// Converts a point from this pose's local frame into anchor space.
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }
}

/// Full local transform of a replicated prop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Transform {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Transform {
            position,
            rotation,
            scale,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Transform {
            position,
            ..Transform::default()
        }
    }

    pub fn with_pose(self, pose: Pose) -> Self {
        Transform {
            position: pose.position,
            rotation: pose.rotation,
            ..self
        }
    }

    pub fn with_scale(self, scale: Vec3) -> Self {
        Transform { scale, ..self }
    }
}
