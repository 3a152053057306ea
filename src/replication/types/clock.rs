//! Thread-safe version clock used by the host to stamp committed mutations.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::replication::types::peer_id::PeerId;
use crate::replication::types::version::Version;

/// A monotonic clock issuing `Version`s for one peer.
///
/// Guests never issue versions, but they observe the versions they receive so
/// that a later promotion could continue the sequence without going backwards.
pub struct VersionClock {
    counter: AtomicU64,
    issuer: PeerId,
}

impl VersionClock {
    pub fn new(issuer: PeerId) -> Self {
        VersionClock {
            counter: AtomicU64::new(0),
            issuer,
        }
    }

    /// Issues the next version for this peer
    pub fn tick(&self) -> Version {
        let counter = self.counter.fetch_add(1, AtomicOrdering::SeqCst) + 1;
        Version::new(counter, self.issuer)
    }

    /// Advances the clock past a received version
    pub fn observe(&self, received: Version) {
        self.counter
            .fetch_max(received.counter, AtomicOrdering::SeqCst);
    }

    /// Gets the current counter value (for debugging)
    pub fn current_counter(&self) -> u64 {
        self.counter.load(AtomicOrdering::SeqCst)
    }

    pub fn issuer(&self) -> PeerId {
        self.issuer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_clock() {
        let clock = VersionClock::new(1);

        let v1 = clock.tick();
        let v2 = clock.tick();

        assert_eq!(v1.issuer, 1);
        assert_eq!(v2.issuer, 1);
        assert!(v1 < v2);
        assert_eq!(v1.counter + 1, v2.counter);
    }

    #[test]
    fn test_observe_moves_clock_forward() {
        let clock = VersionClock::new(1);

        clock.observe(Version::new(100, 2));
        let next = clock.tick();

        assert!(next.counter > 100);
        assert_eq!(next.issuer, 1);
    }

    #[test]
    fn test_observe_never_goes_backwards() {
        let clock = VersionClock::new(3);
        clock.observe(Version::new(10, 1));
        clock.observe(Version::new(4, 1));

        assert_eq!(clock.current_counter(), 10);
        assert_eq!(clock.issuer(), 3);
    }
}
