//! Transport-agnostic wire protocol.
//!
//! Every request carries a client-generated `requestId` and a `type`
//! discriminator; every response echoes the `requestId` and is either a
//! success payload or an error string. Many in-flight requests share one
//! connection and demultiplex by ID. A `syncEvents` request opens a
//! subscription: the catch-up snapshot response is followed by live batch
//! responses with the same `requestId`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::Event;
use crate::ids::{EntityId, EventId};

/// The operations a client can invoke.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestKind {
    /// Append events to one entity's log. The only write path.
    #[serde(rename = "addEvents")]
    AddEvents,
    /// Cursor-based catch-up plus live subscription. The only read path.
    #[serde(rename = "syncEvents")]
    SyncEvents,
    /// Liveness probe, independent of the event log.
    #[serde(rename = "ping")]
    Ping,
}

/// A request envelope.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    /// Client-generated identifier echoed in every response.
    pub request_id: u64,
    /// Which operation to invoke.
    #[serde(rename = "type")]
    pub kind: RequestKind,
    /// Operation-specific payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A response envelope: success payload or error string, never both.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    /// Echoed request identifier.
    pub request_id: u64,
    /// Success payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Error description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseEnvelope {
    /// Build a success response.
    #[must_use]
    pub fn data(request_id: u64, data: Value) -> Self {
        Self {
            request_id,
            data: Some(data),
            error: None,
        }
    }

    /// Build an error response.
    pub fn error(request_id: u64, error: impl Into<String>) -> Self {
        Self {
            request_id,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Whether this response reports an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// `addEvents` request payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AddEventsRequest {
    /// The target entity.
    pub id: EntityId,
    /// Events to append, in client order.
    pub events: Vec<Event>,
}

/// `addEvents` response payload.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AddEventsResponse {
    /// Events the server rejected, with reasons. Empty on full success.
    pub failed: Vec<FailedEvent>,
}

/// One rejected event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedEvent {
    /// The rejected event's ID.
    pub event_id: EventId,
    /// Human-readable reason.
    pub error: String,
}

/// `syncEvents` request payload.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SyncEventsRequest {
    /// Resume after this instant; omit for the full log.
    #[serde(
        default,
        with = "crate::time::iso_millis_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub cursor: Option<DateTime<Utc>>,
}

/// `syncEvents` response payload: one batch of the feed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncEventsResponse {
    /// Max timestamp among `events`; persist and replay on the next call.
    #[serde(with = "crate::time::iso_millis")]
    pub cursor: DateTime<Utc>,
    /// The batch, each event carrying its server-assigned version.
    pub events: Vec<Event>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
