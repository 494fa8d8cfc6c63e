//! # mise-events
//!
//! The server-side event sourcing engine:
//!
//! - **Event store**: the [`store::EventStore`] trait with a first-class
//!   conflict error, implemented by a `SQLite` backend (transactional
//!   uniqueness on `(entity_id, version)`) and an in-memory document-style
//!   backend with identical semantics
//! - **Event hub**: [`hub::EventHub`] replays history through the entity
//!   validators, assigns dense versions, persists atomically with
//!   retry-on-conflict, and publishes accepted batches to live subscribers
//! - **Migrations**: version-tracked embedded SQL schema evolution

#![deny(unsafe_code)]

pub mod errors;
pub mod hub;
pub mod sqlite;
pub mod store;

pub use errors::{HubError, StoreError};
pub use hub::EventHub;
pub use sqlite::connection::{ConnectionConfig, ConnectionPool, new_file, new_in_memory};
pub use sqlite::store::SqliteEventStore;
pub use store::{EventStore, StoredEvent};
pub use store::memory::MemoryEventStore;
