//! # mise-client
//!
//! The offline-first client side of the mise sync engine:
//!
//! - **Event cache**: durable local `SQLite` store of per-entity events with
//!   unsynced/syncing bookkeeping, materialized views, and the sync cursor
//! - **Sync engine**: optimistic local mutation, push with partial-failure
//!   reconciliation, pull with authoritative merge, and stale-push recovery
//!   on reconnect (30 s window, idempotent resend)
//! - **Transports**: the [`transport::ServerApi`] trait with an in-process
//!   implementation over an [`mise_events::EventHub`] and a reconnecting
//!   WebSocket implementation with request-ID demultiplexing

#![deny(unsafe_code)]

pub mod cache;
pub mod errors;
pub mod sync;
pub mod transport;

pub use cache::EventCache;
pub use errors::ClientError;
pub use sync::{SyncEngine, SyncNotification};
pub use transport::{ServerApi, TransportError};
