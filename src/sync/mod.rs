//! Session traffic: wire messages, the transport and presentation seams, and
//! the coordinator that ties them to the replicated scene.

pub mod avatar;
pub mod coordinator;
pub mod message;
pub mod presentation;
pub mod transport;

pub use avatar::{AVATAR_EASING, AvatarBook};
pub use coordinator::{MutationOutcome, SPAWN_DISTANCE, SceneSnapshot, SyncCoordinator, TickInput};
pub use message::{Envelope, SyncMessage, decode, encode};
pub use presentation::{AvatarView, MirrorState, Presentation, SceneMirror};
pub use transport::{HubTransport, LocalHub, Transport};
