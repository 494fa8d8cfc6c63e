//! The embedded `SQLite` event store.
//!
//! Uniqueness of `(entity_id, version)` is enforced by the schema; a
//! constraint violation during the atomic batch insert maps to
//! [`StoreError::Conflict`], the signal the hub's retry loop keys on.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mise_core::event::EntityKind;
use mise_core::ids::{EntityId, EventId};
use mise_core::time::{format_timestamp, parse_timestamp};
use rusqlite::Row;

use super::connection::ConnectionPool;
use crate::errors::{Result, StoreError};
use crate::store::{EventStore, StoredEvent};

/// Event store backed by an embedded `SQLite` database.
pub struct SqliteEventStore {
    pool: ConnectionPool,
}

impl SqliteEventStore {
    /// Create a store over the given pool. Run migrations first.
    #[must_use]
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    fn row_to_stored(row: &Row<'_>) -> rusqlite::Result<RawRow> {
        Ok(RawRow {
            id: row.get(0)?,
            entity_id: row.get(1)?,
            version: row.get(2)?,
            event_type: row.get(3)?,
            data: row.get(4)?,
            timestamp: row.get(5)?,
            entity_kind: row.get(6)?,
        })
    }
}

/// Row as read from `SQLite`, before timestamp/kind decoding.
struct RawRow {
    id: String,
    entity_id: String,
    version: u32,
    event_type: String,
    data: String,
    timestamp: String,
    entity_kind: String,
}

impl RawRow {
    fn decode(self) -> Result<StoredEvent> {
        let timestamp = parse_timestamp(&self.timestamp).map_err(|e| {
            StoreError::InvalidStoredEvent {
                id: EventId::from(self.id.clone()),
                message: format!("bad timestamp {:?}: {e}", self.timestamp),
            }
        })?;
        let entity_kind: EntityKind = self.entity_kind.parse().map_err(|e| {
            StoreError::InvalidStoredEvent {
                id: EventId::from(self.id.clone()),
                message: e,
            }
        })?;
        Ok(StoredEvent {
            id: EventId::from(self.id),
            entity_id: EntityId::from(self.entity_id),
            version: self.version,
            event_type: self.event_type,
            data: self.data,
            timestamp,
            entity_kind,
        })
    }
}

const SELECT_COLUMNS: &str = "id, entity_id, version, type, data, timestamp, entity_kind";

fn is_constraint_violation(error: &rusqlite::Error) -> bool {
    matches!(
        error,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn events_for_entity(&self, entity_id: &EntityId) -> Result<Vec<StoredEvent>> {
        let conn = self.pool.get()?;
        let mut statement = conn.prepare_cached(&format!(
            "SELECT {SELECT_COLUMNS} FROM events WHERE entity_id = ?1"
        ))?;
        let rows = statement.query_map([entity_id.as_str()], Self::row_to_stored)?;

        let mut events = Vec::new();
        for row in rows {
            events.push(row?.decode()?);
        }
        Ok(events)
    }

    async fn events_since(&self, cursor: Option<&DateTime<Utc>>) -> Result<Vec<StoredEvent>> {
        let conn = self.pool.get()?;
        let mut events = Vec::new();

        if let Some(cursor) = cursor {
            let mut statement = conn.prepare_cached(&format!(
                "SELECT {SELECT_COLUMNS} FROM events WHERE timestamp > ?1 ORDER BY timestamp"
            ))?;
            let rows = statement.query_map([format_timestamp(cursor)], Self::row_to_stored)?;
            for row in rows {
                events.push(row?.decode()?);
            }
        } else {
            let mut statement = conn.prepare_cached(&format!(
                "SELECT {SELECT_COLUMNS} FROM events ORDER BY timestamp"
            ))?;
            let rows = statement.query_map([], Self::row_to_stored)?;
            for row in rows {
                events.push(row?.decode()?);
            }
        }
        Ok(events)
    }

    async fn save_events(&self, items: &[StoredEvent]) -> Result<()> {
        let Some(first) = items.first() else {
            return Ok(());
        };

        let conn = self.pool.get()?;
        let tx = conn.unchecked_transaction()?;

        for item in items {
            let result = tx.execute(
                "INSERT INTO events (id, entity_id, version, type, data, timestamp, entity_kind)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    item.id.as_str(),
                    item.entity_id.as_str(),
                    item.version,
                    item.event_type,
                    item.data,
                    format_timestamp(&item.timestamp),
                    item.entity_kind.as_str(),
                ],
            );

            if let Err(error) = result {
                // The transaction rolls back on drop.
                if is_constraint_violation(&error) {
                    return Err(StoreError::Conflict {
                        entity_id: first.entity_id.clone(),
                        version: item.version,
                    });
                }
                return Err(error.into());
            }
        }

        tx.commit()?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::connection::{self, ConnectionConfig};
    use crate::sqlite::migrations::run_migrations;
    use assert_matches::assert_matches;
    use mise_core::event::Event;
    use mise_core::recipe::events::RecipeEvent;
    use mise_core::shopping_list::events::ShoppingListEvent;

    fn setup() -> SqliteEventStore {
        let pool = connection::new_in_memory(&ConnectionConfig::default()).unwrap();
        {
            let conn = pool.get().unwrap();
            let _ = run_migrations(&conn).unwrap();
        }
        SqliteEventStore::new(pool)
    }

    fn stored(entity: &EntityId, version: u32) -> StoredEvent {
        let mut event = Event::new(
            entity.clone(),
            RecipeEvent::RecipeNameSet {
                name: format!("v{version}"),
            },
        );
        event.version = Some(version);
        StoredEvent::from_event(&event).unwrap()
    }

    #[tokio::test]
    async fn save_and_read_roundtrip() {
        let store = setup();
        let entity = EntityId::new();
        store
            .save_events(&[stored(&entity, 1), stored(&entity, 2)])
            .await
            .unwrap();

        let mut events = store.events_for_entity(&entity).await.unwrap();
        events.sort_by_key(|e| e.version);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].version, 1);
        assert_eq!(events[1].version, 2);

        // Typed decoding survives the storage roundtrip.
        let event = events.remove(0).into_event().unwrap();
        assert_eq!(event.entity_id, entity);
        assert_eq!(event.version, Some(1));
    }

    #[tokio::test]
    async fn duplicate_version_is_a_conflict() {
        let store = setup();
        let entity = EntityId::new();
        store.save_events(&[stored(&entity, 1)]).await.unwrap();

        let err = store.save_events(&[stored(&entity, 1)]).await.unwrap_err();
        assert_matches!(
            err,
            StoreError::Conflict { version: 1, .. }
        );
    }

    #[tokio::test]
    async fn duplicate_event_id_is_a_conflict() {
        let store = setup();
        let entity = EntityId::new();
        let event = stored(&entity, 1);
        store.save_events(&[event.clone()]).await.unwrap();

        let mut reused_id = stored(&entity, 2);
        reused_id.id = event.id;
        let err = store.save_events(&[reused_id]).await.unwrap_err();
        assert_matches!(err, StoreError::Conflict { .. });
    }

    #[tokio::test]
    async fn conflicting_batch_writes_nothing() {
        let store = setup();
        let entity = EntityId::new();
        store.save_events(&[stored(&entity, 1)]).await.unwrap();

        let err = store
            .save_events(&[stored(&entity, 2), stored(&entity, 1)])
            .await
            .unwrap_err();
        assert_matches!(err, StoreError::Conflict { .. });

        // The batch is atomic, so version 2 must not be visible.
        let events = store.events_for_entity(&entity).await.unwrap();
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn events_since_filters_strictly() {
        let store = setup();
        let entity = EntityId::new();
        let first = stored(&entity, 1);
        let mut second = stored(&entity, 2);
        second.timestamp = first.timestamp + chrono::Duration::milliseconds(5);
        let cursor = first.timestamp;

        store
            .save_events(&[first.clone(), second.clone()])
            .await
            .unwrap();

        let since = store.events_since(Some(&cursor)).await.unwrap();
        assert_eq!(since.len(), 1);
        assert_eq!(since[0].id, second.id);

        let all = store.events_since(None).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn events_since_spans_entities() {
        let store = setup();
        let a = EntityId::new();
        let b = EntityId::new();
        store.save_events(&[stored(&a, 1)]).await.unwrap();
        store.save_events(&[stored(&b, 1)]).await.unwrap();

        let all = store.events_since(None).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn entity_kind_survives_roundtrip() {
        let store = setup();
        let entity = mise_core::event::shopping_list_id();
        let mut event = Event::new(
            entity.clone(),
            ShoppingListEvent::ShoppingListItemsAdded {
                items: vec![],
                index: None,
            },
        );
        event.version = Some(1);
        store
            .save_events(&[StoredEvent::from_event(&event).unwrap()])
            .await
            .unwrap();

        let events = store.events_for_entity(&entity).await.unwrap();
        assert_eq!(events[0].entity_kind, EntityKind::ShoppingList);
    }

    #[tokio::test]
    async fn empty_batch_is_a_no_op() {
        let store = setup();
        store.save_events(&[]).await.unwrap();
        assert!(store.events_since(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_backed_store_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.db");
        let entity = EntityId::new();

        {
            let pool =
                connection::new_file(path.to_str().unwrap(), &ConnectionConfig::default())
                    .unwrap();
            {
                let conn = pool.get().unwrap();
                let _ = run_migrations(&conn).unwrap();
            }
            let store = SqliteEventStore::new(pool);
            store.save_events(&[stored(&entity, 1)]).await.unwrap();
        }

        // Reopen and read back.
        let pool =
            connection::new_file(path.to_str().unwrap(), &ConnectionConfig::default()).unwrap();
        {
            let conn = pool.get().unwrap();
            let _ = run_migrations(&conn).unwrap();
        }
        let store = SqliteEventStore::new(pool);
        let events = store.events_for_entity(&entity).await.unwrap();
        assert_eq!(events.len(), 1);
    }
}
