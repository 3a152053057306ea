//! Peer identifier type.
//!
//! Every connection in a shared session is identified by a `PeerId`, assigned
//! by the session transport when the connection is accepted.

/// A unique identifier for each peer (device) in the shared session.
///
/// Identifiers are never reused within a session, so a disconnected peer can
/// keep its entry as a tombstone without colliding with a later connection.
pub type PeerId = u64;
