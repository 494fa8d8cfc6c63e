//! The event hub: validate, assign versions, persist, publish.
//!
//! `add_events` is the only write path. Concurrency is coordinated per
//! entity entirely through the store's atomic-append-with-uniqueness
//! primitive: two hubs (or two calls) racing on the same entity converge
//! through conflict detection and re-validation, not locks, which keeps the
//! hub stateless and horizontally scalable.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use mise_core::api::FailedEvent;
use mise_core::event::{Event, order_events};
use mise_core::ids::EntityId;
use mise_core::validate::ValidationState;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::errors::{HubError, StoreError};
use crate::store::{EventStore, StoredEvent};

/// How many times a store-level conflict is retried before giving up.
const MAX_ATTEMPTS: u32 = 5;

/// Capacity of the live-subscriber broadcast channel.
const CHANNEL_CAPACITY: usize = 256;

/// Orchestrates the append path and fans accepted batches out to live
/// subscribers.
pub struct EventHub {
    store: Arc<dyn EventStore>,
    events_tx: broadcast::Sender<Vec<Event>>,
}

impl EventHub {
    /// Create a hub over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn EventStore>) -> Self {
        let (events_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { store, events_tx }
    }

    /// Subscribe to the live stream of accepted batches. Every accepted
    /// batch reaches every subscriber, including the connection that caused
    /// it; empty batches are never published.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Vec<Event>> {
        self.events_tx.subscribe()
    }

    /// Catch-up snapshot: all events with `timestamp > cursor`, or the whole
    /// log when the cursor is absent.
    pub async fn events_since(
        &self,
        cursor: Option<&DateTime<Utc>>,
    ) -> Result<Vec<Event>, HubError> {
        let items = self.store.events_since(cursor).await?;
        let mut events = items
            .into_iter()
            .map(StoredEvent::into_event)
            .collect::<Result<Vec<_>, _>>()?;
        events.sort_by(order_events);
        Ok(events)
    }

    /// Append a batch of events to one entity's log.
    ///
    /// Re-reads history, replays it through the entity's validator, then
    /// judges each candidate in caller order: duplicates of already-stored
    /// event IDs are dropped silently (the idempotent-retry path), illegal
    /// events are recorded as per-event failures, and legal events receive
    /// the next dense versions. Accepted events are persisted in one atomic
    /// write; a store conflict means another writer interleaved, and the
    /// whole cycle restarts against fresh history. Validation failures are
    /// terminal per event and never trigger a retry.
    ///
    /// Returns the per-event failures (possibly empty). After
    /// [`MAX_ATTEMPTS`] conflicted attempts the call gives up with
    /// [`HubError::Contention`].
    pub async fn add_events(
        &self,
        entity_id: &EntityId,
        events: Vec<Event>,
    ) -> Result<Vec<FailedEvent>, HubError> {
        if events.is_empty() {
            return Ok(Vec::new());
        }

        for attempt in 1..=MAX_ATTEMPTS {
            let items = self.store.events_for_entity(entity_id).await?;
            let mut history = items
                .into_iter()
                .map(StoredEvent::into_event)
                .collect::<Result<Vec<_>, _>>()?;
            history.sort_by(order_events);

            let (accepted, failed) = validate_events(entity_id, &history, &events)?;

            if accepted.is_empty() {
                return Ok(failed);
            }

            let stored = accepted
                .iter()
                .map(StoredEvent::from_event)
                .collect::<Result<Vec<_>, _>>()?;

            match self.store.save_events(&stored).await {
                Ok(()) => {
                    // Subscriber lag/absence is not the writer's problem.
                    let _ = self.events_tx.send(accepted);
                    return Ok(failed);
                }
                Err(StoreError::Conflict { version, .. }) => {
                    debug!(
                        entity_id = %entity_id,
                        version,
                        attempt,
                        "version conflict, re-validating against fresh history"
                    );
                }
                Err(error) => return Err(error.into()),
            }
        }

        warn!(entity_id = %entity_id, attempts = MAX_ATTEMPTS, "giving up on contended entity");
        Err(HubError::Contention(entity_id.clone()))
    }
}

/// Replay history, then judge each candidate event in order.
fn validate_events(
    entity_id: &EntityId,
    history: &[Event],
    candidates: &[Event],
) -> Result<(Vec<Event>, Vec<FailedEvent>), HubError> {
    let kind = candidates[0].kind();
    let mut state = ValidationState::initial(kind);
    for event in history {
        state
            .apply(&event.payload)
            .map_err(|source| HubError::CorruptHistory {
                entity_id: entity_id.clone(),
                source,
            })?;
    }

    let mut seen: HashSet<_> = history.iter().map(|event| event.id.clone()).collect();
    let mut version = u32::try_from(history.len()).unwrap_or(u32::MAX);
    let mut accepted = Vec::new();
    let mut failed = Vec::new();

    for event in candidates {
        if event.entity_id != *entity_id {
            failed.push(FailedEvent {
                event_id: event.id.clone(),
                error: "event entity id does not match the target entity".into(),
            });
            continue;
        }

        // Already persisted; the client never saw the acknowledgment.
        if seen.contains(&event.id) {
            warn!(event_id = %event.id, "dropping event that already exists");
            continue;
        }

        match state.apply(&event.payload) {
            Ok(()) => {
                version += 1;
                let mut event = event.clone();
                event.version = Some(version);
                let _ = seen.insert(event.id.clone());
                accepted.push(event);
            }
            Err(error) => {
                warn!(
                    event_id = %event.id,
                    event_type = event.payload.type_name(),
                    error = %error,
                    "dropping invalid event"
                );
                failed.push(FailedEvent {
                    event_id: event.id.clone(),
                    error: error.to_string(),
                });
            }
        }
    }

    Ok((accepted, failed))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
