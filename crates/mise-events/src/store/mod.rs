//! The event store abstraction.
//!
//! A store is an append-only log of [`StoredEvent`] rows with a uniqueness
//! constraint on `(entity_id, version)`, the single primitive the whole
//! system's optimistic concurrency rests on. Two backends satisfy the same
//! contract: the `SQLite` store (transactional uniqueness via a relational
//! constraint) and [`memory::MemoryEventStore`] (document-id-as-version
//! semantics under one lock).

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mise_core::event::{EntityKind, Event, EventPayload};
use mise_core::ids::{EntityId, EventId};
use serde_json::Value;

use crate::errors::{Result, StoreError};

/// The persisted form of an accepted event.
///
/// The payload is serialized to an opaque JSON blob (minus the `type` tag,
/// which gets its own column) so the store never needs to understand
/// per-kind schemas.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredEvent {
    /// The event's globally unique ID.
    pub id: EventId,
    /// The aggregate the event belongs to.
    pub entity_id: EntityId,
    /// Server-assigned, dense per entity. Required, since only accepted events
    /// are persisted.
    pub version: u32,
    /// The payload's `type` tag.
    pub event_type: String,
    /// The payload fields, serialized to JSON without the tag.
    pub data: String,
    /// Client-assigned instant; the catch-up cursor key.
    pub timestamp: DateTime<Utc>,
    /// Which validator/reducer family owns the event.
    pub entity_kind: EntityKind,
}

impl StoredEvent {
    /// Convert an accepted event into its persisted form.
    ///
    /// Fails with [`StoreError::MissingVersion`] if the event has not been
    /// assigned a version yet.
    pub fn from_event(event: &Event) -> Result<Self> {
        let version = event
            .version
            .ok_or_else(|| StoreError::MissingVersion(event.id.clone()))?;

        let mut payload = match serde_json::to_value(&event.payload)? {
            Value::Object(map) => map,
            other => {
                return Err(StoreError::InvalidStoredEvent {
                    id: event.id.clone(),
                    message: format!("payload serialized to non-object JSON: {other}"),
                });
            }
        };
        let _ = payload.remove("type");

        Ok(Self {
            id: event.id.clone(),
            entity_id: event.entity_id.clone(),
            version,
            event_type: event.payload.type_name().to_owned(),
            data: serde_json::to_string(&Value::Object(payload))?,
            timestamp: event.timestamp,
            entity_kind: event.payload.kind(),
        })
    }

    /// Decode the persisted form back into a typed event.
    pub fn into_event(self) -> Result<Event> {
        let mut payload: serde_json::Map<String, Value> = serde_json::from_str(&self.data)
            .map_err(|e| StoreError::InvalidStoredEvent {
                id: self.id.clone(),
                message: format!("payload is not a JSON object: {e}"),
            })?;
        let _ = payload.insert("type".to_owned(), Value::String(self.event_type.clone()));

        let payload: EventPayload = serde_json::from_value(Value::Object(payload)).map_err(
            |e| StoreError::InvalidStoredEvent {
                id: self.id.clone(),
                message: format!("unknown or malformed payload ({}): {e}", self.event_type),
            },
        )?;

        Ok(Event {
            id: self.id,
            entity_id: self.entity_id,
            version: Some(self.version),
            timestamp: self.timestamp,
            payload,
        })
    }
}

/// Append-only event persistence with per-entity optimistic concurrency.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Full history for one entity, in no particular order; callers sort by
    /// version.
    async fn events_for_entity(&self, entity_id: &EntityId) -> Result<Vec<StoredEvent>>;

    /// All events with `timestamp > cursor`, or the entire log when the
    /// cursor is absent. Used for catch-up sync.
    async fn events_since(&self, cursor: Option<&DateTime<Utc>>) -> Result<Vec<StoredEvent>>;

    /// Atomically append all items (one entity per call). Fails with
    /// [`StoreError::Conflict`] if any `(entity_id, version)` already
    /// exists; no partial writes are visible.
    async fn save_events(&self, items: &[StoredEvent]) -> Result<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use mise_core::recipe::events::RecipeEvent;

    fn accepted_event() -> Event {
        let mut event = Event::new(
            EntityId::new(),
            RecipeEvent::RecipeNameSet {
                name: "Toast".into(),
            },
        );
        event.version = Some(3);
        event
    }

    #[test]
    fn from_event_splits_tag_and_data() {
        let event = accepted_event();
        let stored = StoredEvent::from_event(&event).unwrap();

        assert_eq!(stored.event_type, "RecipeNameSet");
        assert_eq!(stored.version, 3);
        assert_eq!(stored.entity_kind, EntityKind::Recipe);

        let data: Value = serde_json::from_str(&stored.data).unwrap();
        assert_eq!(data["name"], "Toast");
        assert!(data.get("type").is_none());
    }

    #[test]
    fn from_event_requires_version() {
        let event = Event::new(EntityId::new(), RecipeEvent::RecipeCreated);
        let err = StoredEvent::from_event(&event).unwrap_err();
        assert_matches!(err, StoreError::MissingVersion(_));
    }

    #[test]
    fn roundtrip_preserves_event() {
        let event = accepted_event();
        let back = StoredEvent::from_event(&event).unwrap().into_event().unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn empty_payload_serializes_to_empty_object() {
        let mut event = Event::new(EntityId::new(), RecipeEvent::RecipeCreated);
        event.version = Some(1);
        let stored = StoredEvent::from_event(&event).unwrap();
        assert_eq!(stored.data, "{}");
        assert_eq!(stored.event_type, "RecipeCreated");
    }

    #[test]
    fn unknown_type_fails_decoding() {
        let mut event = accepted_event();
        event.version = Some(1);
        let mut stored = StoredEvent::from_event(&event).unwrap();
        stored.event_type = "RecipeExploded".into();
        let err = stored.into_event().unwrap_err();
        assert_matches!(err, StoreError::InvalidStoredEvent { .. });
    }

    #[test]
    fn corrupt_data_fails_decoding() {
        let event = accepted_event();
        let mut stored = StoredEvent::from_event(&event).unwrap();
        stored.data = "not json".into();
        let err = stored.into_event().unwrap_err();
        assert_matches!(err, StoreError::InvalidStoredEvent { .. });
    }
}
