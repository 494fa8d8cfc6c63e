//! WebSocket gateway: connection state, request dispatch, and the
//! per-client session loop.

pub mod connection;
pub mod handler;
pub mod registry;
pub mod session;
