//! Server transport abstraction.
//!
//! The sync engine only needs the three operations of the wire protocol;
//! everything about connections, framing, and demultiplexing lives behind
//! this trait. [`local::LocalTransport`] wires the engine straight into an
//! in-process hub (embedded deployments and tests); [`ws::WsTransport`]
//! speaks the WebSocket envelope protocol with reconnect and keepalive.

pub mod local;
pub mod ws;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mise_core::api::{FailedEvent, SyncEventsResponse};
use mise_core::event::Event;
use mise_core::ids::EntityId;
use thiserror::Error;

/// Errors from a server transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server answered with an error string.
    #[error("server error: {0}")]
    Remote(String),

    /// The connection is gone; the request was not delivered.
    #[error("connection closed")]
    Closed,

    /// No response arrived within the request window.
    #[error("request timed out")]
    Timeout,

    /// A payload failed to encode or decode.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// The server operations the sync engine depends on.
#[async_trait]
pub trait ServerApi: Send + Sync {
    /// Append events to one entity's log; returns per-event failures.
    async fn add_events(
        &self,
        entity_id: &EntityId,
        events: Vec<Event>,
    ) -> Result<Vec<FailedEvent>, TransportError>;

    /// One catch-up batch of events after `cursor`.
    async fn sync_events(
        &self,
        cursor: Option<DateTime<Utc>>,
    ) -> Result<SyncEventsResponse, TransportError>;

    /// Liveness probe.
    async fn ping(&self) -> Result<(), TransportError>;
}
