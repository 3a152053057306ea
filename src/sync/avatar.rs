//! Remote avatar smoothing.

use std::collections::BTreeMap;

use crate::replication::types::{PeerId, Pose};

/// Fraction of the remaining distance an avatar covers each tick.
pub const AVATAR_EASING: f32 = 0.3;

#[derive(Debug, Clone, Copy)]
struct AvatarTrack {
    shown: Pose,
    target: Pose,
}

/// Head poses of remote peers, eased toward the latest reported pose.
#[derive(Debug, Default)]
pub struct AvatarBook {
    tracks: BTreeMap<PeerId, AvatarTrack>,
}

impl AvatarBook {
    pub fn new() -> Self {
        AvatarBook::default()
    }

    /// Records the latest pose of `peer`. The first pose is shown as is.
    pub fn set_target(&mut self, peer: PeerId, target: Pose) {
        self.tracks
            .entry(peer)
            .and_modify(|track| track.target = target)
            .or_insert(AvatarTrack {
                shown: target,
                target,
            });
    }

    /// Advances every avatar one tick: position eases, rotation snaps.
    pub fn step(&mut self) -> Vec<(PeerId, Pose)> {
        self.tracks
            .iter_mut()
            .map(|(peer, track)| {
                track.shown = Pose::new(
                    track.shown.position.lerp(track.target.position, AVATAR_EASING),
                    track.target.rotation,
                );
                (*peer, track.shown)
            })
            .collect()
    }

    pub fn remove(&mut self, peer: PeerId) {
        self.tracks.remove(&peer);
    }

    pub fn shown(&self, peer: PeerId) -> Option<Pose> {
        self.tracks.get(&peer).map(|track| track.shown)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::replication::types::{Quat, Vec3};

    #[test]
    fn test_first_pose_snaps() {
        let mut book = AvatarBook::new();
        let pose = Pose::new(Vec3::new(1.0, 1.7, 0.0), Quat::IDENTITY);
        book.set_target(3, pose);

        assert_eq!(book.shown(3), Some(pose));
    }

    #[test]
    fn test_position_eases_rotation_snaps() {
        let mut book = AvatarBook::new();
        book.set_target(3, Pose::default());
        let turned = Quat::from_rotation_y(90f32.to_radians());
        book.set_target(3, Pose::new(Vec3::new(10.0, 0.0, 0.0), turned));

        let stepped = book.step();
        let (_, pose) = stepped[0];
        assert!(pose.position.abs_diff_eq(Vec3::new(3.0, 0.0, 0.0), 1e-5));
        assert_eq!(pose.rotation, turned);

        book.step();
        assert!(book.shown(3).unwrap().position.abs_diff_eq(Vec3::new(5.1, 0.0, 0.0), 1e-4));
    }

    #[test]
    fn test_remove() {
        let mut book = AvatarBook::new();
        book.set_target(3, Pose::default());
        book.remove(3);
        assert!(book.is_empty());
        assert!(book.step().is_empty());
    }
}
