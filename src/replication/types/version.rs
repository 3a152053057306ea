//! Field versions for last-write-wins replication.
//!
//! Every committed mutation is stamped by the host with a `Version`. Replicas
//! compare versions to discard updates that were superseded before they arrived.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::replication::types::peer_id::PeerId;

/// A host-issued version, consisting of a logical counter and the issuing peer.
///
/// # Ordering
///
/// Versions are ordered first by counter, then by issuer. Within a session only
/// the host issues versions, so the counter alone decides in practice; the issuer
/// keeps the order total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    /// The logical clock value when this version was issued
    pub counter: u64,
    /// The peer that issued the version
    pub issuer: PeerId,
}

impl Version {
    /// The version of a design-time value that no host has committed yet.
    pub const INITIAL: Version = Version {
        counter: 0,
        issuer: 0,
    };

    pub fn new(counter: u64, issuer: PeerId) -> Self {
        Version { counter, issuer }
    }

    /// Returns true if this version has never been committed by a host.
    pub fn is_initial(&self) -> bool {
        self.counter == 0
    }
}

impl Default for Version {
    fn default() -> Self {
        Version::INITIAL
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        match self.counter.cmp(&other.counter) {
            Ordering::Equal => self.issuer.cmp(&other.issuer),
            other => other,
        }
    }
}
