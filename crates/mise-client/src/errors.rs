//! Client-side error type.
//!
//! Local failures never lose events: an event that could not be pushed stays
//! queued in the cache and is retried on the next sync cycle.

use thiserror::Error;

use mise_events::errors::StoreError;

use crate::transport::TransportError;

/// Errors from the client cache and sync engine.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Local `SQLite` error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON serialization/deserialization error.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// A cached row could not be decoded.
    #[error("corrupt cache entry: {0}")]
    CorruptCache(String),

    /// An underlying event-store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The server transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
}
