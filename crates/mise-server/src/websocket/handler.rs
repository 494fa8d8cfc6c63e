//! WebSocket message dispatch: parses incoming frames as request
//! envelopes and routes them to the event hub.

use chrono::{DateTime, Utc};
use mise_core::api::{
    AddEventsResponse, FailedEvent, RequestEnvelope, RequestKind, ResponseEnvelope,
    SyncEventsRequest, SyncEventsResponse,
};
use mise_core::event::Event;
use mise_core::ids::{EntityId, EventId};
use mise_events::EventHub;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

/// Result of handling one incoming frame.
pub enum Outcome {
    /// Send one response back.
    Reply(ResponseEnvelope),
    /// Open a `syncEvents` subscription: snapshot plus live batches, all
    /// answered under the same request ID.
    Subscribe {
        /// The subscribing request's ID.
        request_id: u64,
        /// Resume point, if the client has synced before.
        cursor: Option<DateTime<Utc>>,
    },
}

/// `addEvents` payload with events kept raw, so one malformed event fails
/// alone instead of poisoning the whole batch.
#[derive(Deserialize)]
struct RawAddEvents {
    id: EntityId,
    events: Vec<Value>,
}

/// Handle one incoming text frame.
pub async fn handle_message(message: &str, hub: &EventHub) -> Outcome {
    let request: RequestEnvelope = match serde_json::from_str(message) {
        Ok(request) => request,
        Err(error) => {
            warn!(%error, "received malformed request envelope");
            // No usable request ID to echo; 0 is reserved for this case.
            return Outcome::Reply(ResponseEnvelope::error(0, format!("invalid request: {error}")));
        }
    };

    debug!(request_id = request.request_id, kind = ?request.kind, "dispatching request");

    match request.kind {
        RequestKind::Ping => Outcome::Reply(ResponseEnvelope::data(
            request.request_id,
            json!("pong"),
        )),
        RequestKind::AddEvents => {
            Outcome::Reply(handle_add_events(request.request_id, request.data, hub).await)
        }
        RequestKind::SyncEvents => {
            let data: SyncEventsRequest = match request.data {
                Some(data) => match serde_json::from_value(data) {
                    Ok(data) => data,
                    Err(error) => {
                        return Outcome::Reply(ResponseEnvelope::error(
                            request.request_id,
                            format!("invalid syncEvents request: {error}"),
                        ));
                    }
                },
                None => SyncEventsRequest::default(),
            };
            Outcome::Subscribe {
                request_id: request.request_id,
                cursor: data.cursor,
            }
        }
    }
}

async fn handle_add_events(
    request_id: u64,
    data: Option<Value>,
    hub: &EventHub,
) -> ResponseEnvelope {
    let raw: RawAddEvents = match data {
        Some(data) => match serde_json::from_value(data) {
            Ok(raw) => raw,
            Err(error) => {
                return ResponseEnvelope::error(
                    request_id,
                    format!("invalid addEvents request: {error}"),
                );
            }
        },
        None => {
            return ResponseEnvelope::error(request_id, "addEvents request requires data");
        }
    };

    // Decode events one by one: schema failures are per-event, not batch-wide.
    let mut events: Vec<Event> = Vec::with_capacity(raw.events.len());
    let mut failed: Vec<FailedEvent> = Vec::new();
    for value in raw.events {
        let event_id = value
            .get("id")
            .and_then(Value::as_str)
            .map_or_else(|| EventId::from("unknown"), EventId::from);
        match serde_json::from_value::<Event>(value) {
            Ok(event) => events.push(event),
            Err(error) => {
                warn!(event_id = %event_id, %error, "dropping undecodable event");
                failed.push(FailedEvent {
                    event_id,
                    error: "invalid event".into(),
                });
            }
        }
    }

    match hub.add_events(&raw.id, events).await {
        Ok(mut hub_failed) => {
            failed.append(&mut hub_failed);
            match serde_json::to_value(AddEventsResponse { failed }) {
                Ok(data) => ResponseEnvelope::data(request_id, data),
                Err(error) => ResponseEnvelope::error(request_id, error.to_string()),
            }
        }
        Err(error) => ResponseEnvelope::error(request_id, error.to_string()),
    }
}

/// Build one `syncEvents` batch response. Empty batches produce nothing;
/// the feed only carries real events, and the cursor only ever advances.
#[must_use]
pub fn sync_batch_response(request_id: u64, events: Vec<Event>) -> Option<ResponseEnvelope> {
    let cursor = events.iter().map(|event| event.timestamp).max()?;
    match serde_json::to_value(SyncEventsResponse { cursor, events }) {
        Ok(data) => Some(ResponseEnvelope::data(request_id, data)),
        Err(error) => {
            warn!(%error, "failed to serialize sync batch");
            None
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
