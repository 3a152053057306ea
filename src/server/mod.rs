//! Host-side web server.
//!
//! The server process is the session host. Guests connect over WebSocket;
//! HTTP endpoints expose health, the authoritative scene and local
//! interactions of the host device.

pub mod routes;
pub mod transport;
pub mod websocket;

pub use routes::{AppState, HostSession, create_router};
pub use transport::ServerTransport;
