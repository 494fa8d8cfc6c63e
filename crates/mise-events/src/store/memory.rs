//! In-memory document-style event store.
//!
//! Models a cloud document store: one "collection" per entity whose
//! document IDs are the version numbers, with batched create-only writes.
//! An occupied version slot maps to [`StoreError::Conflict`] exactly like
//! the `SQLite` backend's uniqueness constraint, so the two are
//! interchangeable behind [`EventStore`]. Also serves as the test double.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mise_core::ids::EntityId;
use parking_lot::Mutex;

use super::{EventStore, StoredEvent};
use crate::errors::{Result, StoreError};

/// Thread-safe in-memory event store.
#[derive(Default)]
pub struct MemoryEventStore {
    entities: Mutex<HashMap<EntityId, BTreeMap<u32, StoredEvent>>>,
}

impl MemoryEventStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of stored events, across all entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.lock().values().map(BTreeMap::len).sum()
    }

    /// Whether the store holds no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn events_for_entity(&self, entity_id: &EntityId) -> Result<Vec<StoredEvent>> {
        let entities = self.entities.lock();
        Ok(entities
            .get(entity_id)
            .map(|events| events.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn events_since(&self, cursor: Option<&DateTime<Utc>>) -> Result<Vec<StoredEvent>> {
        let entities = self.entities.lock();
        let mut events: Vec<StoredEvent> = entities
            .values()
            .flat_map(BTreeMap::values)
            .filter(|event| cursor.is_none_or(|cursor| event.timestamp > *cursor))
            .cloned()
            .collect();
        events.sort_by_key(|event| event.timestamp);
        Ok(events)
    }

    async fn save_events(&self, items: &[StoredEvent]) -> Result<()> {
        let Some(first) = items.first() else {
            return Ok(());
        };

        let mut entities = self.entities.lock();
        let collection = entities.entry(first.entity_id.clone()).or_default();

        // Create-only batch: reject the whole write if any slot is taken.
        for item in items {
            if collection.contains_key(&item.version) {
                return Err(StoreError::Conflict {
                    entity_id: item.entity_id.clone(),
                    version: item.version,
                });
            }
        }
        for item in items {
            let _ = collection.insert(item.version, item.clone());
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
