//! Error types for the event store and hub.
//!
//! [`StoreError::Conflict`] is a first-class signal, not a generic I/O
//! error: it means another writer claimed a `(entity_id, version)` slot
//! between a read and the atomic append, and the hub pattern-matches on it
//! to drive its retry loop.

use mise_core::errors::ValidationError;
use mise_core::ids::{EntityId, EventId};
use thiserror::Error;

/// Errors from event store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Another writer already persisted this `(entity_id, version)`.
    #[error("event conflict for entity {entity_id} version {version}")]
    Conflict {
        /// The contended entity.
        entity_id: EntityId,
        /// The version slot that was already taken.
        version: u32,
    },

    /// An event reached the store without a server-assigned version.
    #[error("event {0} has no version assigned")]
    MissingVersion(EventId),

    /// A stored row could not be decoded back into a typed event.
    #[error("invalid stored event {id}: {message}")]
    InvalidStoredEvent {
        /// The offending row's event ID.
        id: EventId,
        /// What failed to decode.
        message: String,
    },

    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON serialization/deserialization error.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Describes which migration failed and why.
        message: String,
    },
}

/// Convenience alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors from the event hub's append path.
#[derive(Debug, Error)]
pub enum HubError {
    /// The conflict retry budget was exhausted: concurrent writers kept
    /// winning the race for this entity.
    #[error("too much contention appending to entity {0}")]
    Contention(EntityId),

    /// Persisted history failed to replay through its own validator. The
    /// store contents are inconsistent with the state machine.
    #[error("stored history for entity {entity_id} failed validation: {source}")]
    CorruptHistory {
        /// The entity whose history is inconsistent.
        entity_id: EntityId,
        /// The replay failure.
        source: ValidationError,
    },

    /// Underlying store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
