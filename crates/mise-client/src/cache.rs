//! Durable local event cache.
//!
//! Mirrors the server's per-entity logs plus the client-only bookkeeping:
//! which events are still unsynced, which are in flight (`syncing_since`),
//! the materialized views, and the single sync cursor. Every operation runs
//! in one `SQLite` transaction, so a push and a pull for the same entity
//! never interleave mid-update.

use chrono::{DateTime, Duration, Utc};
use mise_core::event::{EntityKind, Event};
use mise_core::ids::{EntityId, EventId};
use mise_core::time::{format_timestamp, parse_timestamp};
use mise_core::view::View;
use mise_events::sqlite::connection::{
    ConnectionConfig, ConnectionPool, PooledConnection, new_file, new_in_memory,
};
use rusqlite::OptionalExtension;

use crate::errors::ClientError;

/// How long an in-flight event may stay unacknowledged before it becomes
/// eligible for re-sending. Duplicate sends are harmless because event IDs are the
/// idempotency key.
pub const SYNC_STALENESS_SECS: i64 = 30;

const KEY_SYNC_CURSOR: &str = "eventSyncCursor";

const SCHEMA: &str = "\
CREATE TABLE IF NOT EXISTS entities (
    entity_id TEXT    PRIMARY KEY,
    kind      TEXT    NOT NULL,
    unsynced  INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE IF NOT EXISTS events (
    id            TEXT PRIMARY KEY,
    entity_id     TEXT NOT NULL REFERENCES entities (entity_id) ON DELETE CASCADE,
    version       INTEGER,
    timestamp     TEXT NOT NULL,
    body          TEXT NOT NULL,
    syncing_since TEXT
);
CREATE INDEX IF NOT EXISTS idx_client_events_entity ON events (entity_id);
CREATE INDEX IF NOT EXISTS idx_client_entities_unsynced ON entities (unsynced);
CREATE TABLE IF NOT EXISTS views (
    entity_id TEXT PRIMARY KEY,
    kind      TEXT NOT NULL,
    body      TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS keyval (
    key   TEXT PRIMARY KEY,
    value TEXT NOT NULL
);";

/// One entity's events after a cache operation, for view rebuilding.
#[derive(Debug)]
pub struct EntityEvents {
    /// The entity.
    pub entity_id: EntityId,
    /// Its kind.
    pub kind: EntityKind,
    /// All cached events for the entity.
    pub events: Vec<Event>,
}

/// The client's durable local store.
pub struct EventCache {
    pool: ConnectionPool,
}

impl EventCache {
    /// Open a file-backed cache, creating the schema if needed.
    pub fn open(path: &str) -> Result<Self, ClientError> {
        let pool = new_file(path, &ConnectionConfig::default())?;
        Self::with_pool(pool)
    }

    /// Open an in-memory cache (tests, ephemeral sessions).
    pub fn open_in_memory() -> Result<Self, ClientError> {
        let pool = new_in_memory(&ConnectionConfig::default())?;
        Self::with_pool(pool)
    }

    fn with_pool(pool: ConnectionPool) -> Result<Self, ClientError> {
        {
            let conn = pool.get()?;
            conn.execute_batch(SCHEMA)?;
        }
        Ok(Self { pool })
    }

    fn conn(&self) -> Result<PooledConnection, ClientError> {
        Ok(self.pool.get()?)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────

    /// Record an event created locally.
    ///
    /// Version-less events flip the entity's `unsynced` flag; when `syncing`
    /// is true (a push is going out right now) the event is also stamped as
    /// in flight.
    pub fn add_local_event(
        &self,
        event: &Event,
        syncing: bool,
        now: DateTime<Utc>,
    ) -> Result<(), ClientError> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        ensure_entity(&tx, &event.entity_id, event.kind())?;
        upsert_event(
            &tx,
            event,
            if event.version.is_none() && syncing {
                Some(now)
            } else {
                None
            },
        )?;

        if event.version.is_none() {
            let _ = tx.execute(
                "UPDATE entities SET unsynced = 1 WHERE entity_id = ?1",
                [event.entity_id.as_str()],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    /// Merge events received from the server.
    ///
    /// The server copy is authoritative: it overwrites any local copy with
    /// the same event ID and clears that event's in-flight marker. Returns
    /// each touched entity's full event set for view rebuilding.
    pub fn merge_synced(&self, events: &[Event]) -> Result<Vec<EntityEvents>, ClientError> {
        // Group by entity, preserving first-appearance order.
        let mut groups: Vec<(EntityId, Vec<&Event>)> = Vec::new();
        for event in events {
            match groups.iter_mut().find(|(id, _)| *id == event.entity_id) {
                Some((_, group)) => group.push(event),
                None => groups.push((event.entity_id.clone(), vec![event])),
            }
        }

        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        let mut updated = Vec::with_capacity(groups.len());
        for (entity_id, group) in groups {
            let kind = group[0].kind();
            ensure_entity(&tx, &entity_id, kind)?;
            for event in group {
                upsert_event(&tx, event, None)?;
            }
            recompute_unsynced(&tx, &entity_id)?;
            updated.push(EntityEvents {
                events: entity_events(&tx, &entity_id)?,
                entity_id,
                kind,
            });
        }

        tx.commit()?;
        Ok(updated)
    }

    /// Drop events the server rejected and return the survivors.
    ///
    /// When nothing remains the entity never existed server-side: its cache
    /// record and view are deleted and the returned list is empty.
    pub fn remove_failed(
        &self,
        entity_id: &EntityId,
        failed: &[EventId],
    ) -> Result<Vec<Event>, ClientError> {
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        for event_id in failed {
            let _ = tx.execute("DELETE FROM events WHERE id = ?1", [event_id.as_str()])?;
        }

        let remaining = entity_events(&tx, entity_id)?;
        if remaining.is_empty() {
            let _ = tx.execute(
                "DELETE FROM entities WHERE entity_id = ?1",
                [entity_id.as_str()],
            )?;
            let _ = tx.execute(
                "DELETE FROM views WHERE entity_id = ?1",
                [entity_id.as_str()],
            )?;
        } else {
            recompute_unsynced(&tx, entity_id)?;
        }

        tx.commit()?;
        Ok(remaining)
    }

    /// Collect pending events eligible for (re-)sending and mark them in
    /// flight as of `now`.
    ///
    /// Eligible means version-less and either never sent or sent longer than
    /// the staleness window ago; the latter recovers pushes lost to a
    /// dropped connection. Events are returned per entity in ascending
    /// timestamp order so the hub assigns versions in client intent order.
    pub fn checkout_unsynced(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<EntityEvents>, ClientError> {
        let stale_before = format_timestamp(&(now - Duration::seconds(SYNC_STALENESS_SECS)));
        let conn = self.conn()?;
        let tx = conn.unchecked_transaction()?;

        let unsynced: Vec<(String, String)> = {
            let mut statement =
                tx.prepare("SELECT entity_id, kind FROM entities WHERE unsynced = 1")?;
            let rows = statement
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<Result<_, _>>()?;
            rows
        };

        let mut checked_out = Vec::new();
        for (entity_id, kind) in unsynced {
            let entity_id = EntityId::from(entity_id);
            let kind = parse_kind(&kind)?;

            let events: Vec<Event> = {
                let mut statement = tx.prepare(
                    "SELECT body FROM events
                     WHERE entity_id = ?1 AND version IS NULL
                       AND (syncing_since IS NULL OR syncing_since < ?2)
                     ORDER BY timestamp",
                )?;
                let bodies: Vec<String> = statement
                    .query_map(
                        rusqlite::params![entity_id.as_str(), stale_before],
                        |row| row.get(0),
                    )?
                    .collect::<Result<_, _>>()?;
                bodies
                    .iter()
                    .map(|body| serde_json::from_str(body))
                    .collect::<Result<_, _>>()?
            };

            if events.is_empty() {
                continue;
            }

            let now_str = format_timestamp(&now);
            for event in &events {
                let _ = tx.execute(
                    "UPDATE events SET syncing_since = ?1 WHERE id = ?2",
                    rusqlite::params![now_str, event.id.as_str()],
                )?;
            }

            checked_out.push(EntityEvents {
                entity_id,
                kind,
                events,
            });
        }

        tx.commit()?;
        Ok(checked_out)
    }

    /// All cached events for one entity.
    pub fn events_for_entity(&self, entity_id: &EntityId) -> Result<Vec<Event>, ClientError> {
        let conn = self.conn()?;
        entity_events(&conn, entity_id)
    }

    /// The cached kind of an entity, if the entity is known.
    pub fn entity_kind(&self, entity_id: &EntityId) -> Result<Option<EntityKind>, ClientError> {
        let conn = self.conn()?;
        let kind: Option<String> = conn
            .query_row(
                "SELECT kind FROM entities WHERE entity_id = ?1",
                [entity_id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        kind.map(|kind| parse_kind(&kind)).transpose()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Cursor
    // ─────────────────────────────────────────────────────────────────────

    /// The last persisted sync cursor.
    pub fn cursor(&self) -> Result<Option<DateTime<Utc>>, ClientError> {
        let conn = self.conn()?;
        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM keyval WHERE key = ?1",
                [KEY_SYNC_CURSOR],
                |row| row.get(0),
            )
            .optional()?;
        value
            .map(|value| {
                parse_timestamp(&value)
                    .map_err(|e| ClientError::CorruptCache(format!("bad cursor: {e}")))
            })
            .transpose()
    }

    /// Persist the sync cursor.
    pub fn set_cursor(&self, cursor: &DateTime<Utc>) -> Result<(), ClientError> {
        let conn = self.conn()?;
        let _ = conn.execute(
            "INSERT OR REPLACE INTO keyval (key, value) VALUES (?1, ?2)",
            rusqlite::params![KEY_SYNC_CURSOR, format_timestamp(cursor)],
        )?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────
    // Views
    // ─────────────────────────────────────────────────────────────────────

    /// The cached view for an entity.
    pub fn view(&self, entity_id: &EntityId) -> Result<Option<View>, ClientError> {
        let conn = self.conn()?;
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT kind, body FROM views WHERE entity_id = ?1",
                [entity_id.as_str()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        row.map(|(kind, body)| {
            let kind = parse_kind(&kind)?;
            View::from_json(kind, &body).map_err(ClientError::from)
        })
        .transpose()
    }

    /// Store the view for an entity.
    pub fn put_view(&self, entity_id: &EntityId, view: &View) -> Result<(), ClientError> {
        let conn = self.conn()?;
        let _ = conn.execute(
            "INSERT OR REPLACE INTO views (entity_id, kind, body) VALUES (?1, ?2, ?3)",
            rusqlite::params![
                entity_id.as_str(),
                view.kind().as_str(),
                view.to_json()?
            ],
        )?;
        Ok(())
    }

    /// Remove the view for an entity.
    pub fn delete_view(&self, entity_id: &EntityId) -> Result<(), ClientError> {
        let conn = self.conn()?;
        let _ = conn.execute(
            "DELETE FROM views WHERE entity_id = ?1",
            [entity_id.as_str()],
        )?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Internal helpers
// ─────────────────────────────────────────────────────────────────────────────

fn ensure_entity(
    conn: &rusqlite::Connection,
    entity_id: &EntityId,
    kind: EntityKind,
) -> Result<(), ClientError> {
    let _ = conn.execute(
        "INSERT OR IGNORE INTO entities (entity_id, kind, unsynced) VALUES (?1, ?2, 0)",
        rusqlite::params![entity_id.as_str(), kind.as_str()],
    )?;
    Ok(())
}

fn upsert_event(
    conn: &rusqlite::Connection,
    event: &Event,
    syncing_since: Option<DateTime<Utc>>,
) -> Result<(), ClientError> {
    let _ = conn.execute(
        "INSERT OR REPLACE INTO events (id, entity_id, version, timestamp, body, syncing_since)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            event.id.as_str(),
            event.entity_id.as_str(),
            event.version,
            format_timestamp(&event.timestamp),
            serde_json::to_string(event)?,
            syncing_since.map(|ts| format_timestamp(&ts)),
        ],
    )?;
    Ok(())
}

fn recompute_unsynced(
    conn: &rusqlite::Connection,
    entity_id: &EntityId,
) -> Result<(), ClientError> {
    let _ = conn.execute(
        "UPDATE entities SET unsynced = EXISTS (
             SELECT 1 FROM events WHERE entity_id = ?1 AND version IS NULL
         ) WHERE entity_id = ?1",
        [entity_id.as_str()],
    )?;
    Ok(())
}

fn entity_events(
    conn: &rusqlite::Connection,
    entity_id: &EntityId,
) -> Result<Vec<Event>, ClientError> {
    let mut statement =
        conn.prepare_cached("SELECT body FROM events WHERE entity_id = ?1 ORDER BY timestamp")?;
    let bodies: Vec<String> = statement
        .query_map([entity_id.as_str()], |row| row.get(0))?
        .collect::<Result<_, _>>()?;
    Ok(bodies
        .iter()
        .map(|body| serde_json::from_str(body))
        .collect::<Result<_, _>>()?)
}

fn parse_kind(kind: &str) -> Result<EntityKind, ClientError> {
    kind.parse().map_err(ClientError::CorruptCache)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
