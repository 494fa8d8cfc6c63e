//! # mise-server
//!
//! Axum HTTP + `WebSocket` gateway for the mise sync engine:
//!
//! - HTTP endpoint: health check
//! - `WebSocket` gateway: envelope parsing, request dispatch
//!   (`addEvents` / `syncEvents` / `ping`), per-request subscription
//!   forwarding, protocol-level heartbeat
//! - Configuration: JSON settings file merged over defaults with `MISE_*`
//!   environment overrides
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use server::{AppState, MiseServer};
