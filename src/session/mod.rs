//! Session membership: who is in the shared session, who is host, and whose
//! shared anchor has been resolved.

pub mod membership;
pub mod peer;

pub use membership::SessionMembership;
pub use peer::{Peer, PeerIdentity, PeerState, Role, SPECTATOR_NAME};
