//! In-process transport wiring the engine straight into an event hub.
//!
//! Used by tests and embedded single-process deployments where client and
//! server share an address space. The semantics match the WebSocket path
//! exactly, minus the wire.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mise_core::api::{FailedEvent, SyncEventsResponse};
use mise_core::event::Event;
use mise_core::ids::EntityId;
use mise_events::EventHub;

use super::{ServerApi, TransportError};

/// A transport that calls the hub directly.
pub struct LocalTransport {
    hub: Arc<EventHub>,
}

impl LocalTransport {
    /// Create a transport over the given hub.
    #[must_use]
    pub fn new(hub: Arc<EventHub>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl ServerApi for LocalTransport {
    async fn add_events(
        &self,
        entity_id: &EntityId,
        events: Vec<Event>,
    ) -> Result<Vec<FailedEvent>, TransportError> {
        self.hub
            .add_events(entity_id, events)
            .await
            .map_err(|error| TransportError::Remote(error.to_string()))
    }

    async fn sync_events(
        &self,
        cursor: Option<DateTime<Utc>>,
    ) -> Result<SyncEventsResponse, TransportError> {
        let events = self
            .hub
            .events_since(cursor.as_ref())
            .await
            .map_err(|error| TransportError::Remote(error.to_string()))?;

        let response_cursor = events
            .iter()
            .map(|event| event.timestamp)
            .max()
            .or(cursor)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH);

        Ok(SyncEventsResponse {
            cursor: response_cursor,
            events,
        })
    }

    async fn ping(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
