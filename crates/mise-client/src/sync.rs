//! The client sync engine.
//!
//! Sits between the local [`EventCache`] and a [`ServerApi`] transport.
//! Local mutations apply to the cached view immediately (optimistic UI) and
//! queue for push; server batches merge back authoritatively; rejections
//! roll the entity back to its surviving events or purge it entirely. All
//! state changes surface as [`SyncNotification`]s for the UI layer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use mise_core::api::{SyncEventsRequest, SyncEventsResponse};
use mise_core::event::{EntityKind, Event};
use mise_core::ids::{EntityId, EventId};
use mise_core::view::View;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::cache::{EntityEvents, EventCache};
use crate::errors::ClientError;
use crate::transport::ServerApi;

/// What the engine tells the UI layer.
#[derive(Clone, Debug, PartialEq)]
pub enum SyncNotification {
    /// An entity's view changed (local mutation, server merge, or rollback).
    ViewUpdated {
        /// The entity.
        entity_id: EntityId,
        /// Its rebuilt view.
        view: View,
    },
    /// An entity never made it onto the server and was purged locally.
    EntityDeleted {
        /// The purged entity.
        entity_id: EntityId,
        /// Its kind.
        kind: EntityKind,
    },
    /// The server rejected events; reasons for display.
    SyncFailed {
        /// The entity whose push was rejected.
        entity_id: EntityId,
        /// Human-readable reasons, one per rejected event.
        errors: Vec<String>,
    },
}

/// Orchestrates optimistic local state and server reconciliation.
pub struct SyncEngine {
    cache: EventCache,
    api: Arc<dyn ServerApi>,
    notifications: mpsc::UnboundedSender<SyncNotification>,
    connected: AtomicBool,
}

impl SyncEngine {
    /// Create an engine; the receiver yields UI notifications.
    pub fn new(
        cache: EventCache,
        api: Arc<dyn ServerApi>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<SyncNotification>) {
        let (notifications, receiver) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                cache,
                api,
                notifications,
                connected: AtomicBool::new(false),
            }),
            receiver,
        )
    }

    /// Direct access to the cache (read paths for the UI layer).
    #[must_use]
    pub fn cache(&self) -> &EventCache {
        &self.cache
    }

    /// Whether the engine believes it has a server connection.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Record a locally created event.
    ///
    /// The view updates optimistically before any network traffic; the event
    /// is cached as unsynced and pushed immediately when connected.
    pub async fn submit(&self, event: Event) -> Result<(), ClientError> {
        let entity_id = event.entity_id.clone();
        let kind = event.kind();

        let mut view = self
            .cache
            .view(&entity_id)?
            .unwrap_or_else(|| View::initial(kind));
        view.apply(&event);
        self.cache.put_view(&entity_id, &view)?;
        self.notify(SyncNotification::ViewUpdated {
            entity_id: entity_id.clone(),
            view,
        });

        let connected = self.is_connected();
        self.cache.add_local_event(&event, connected, Utc::now())?;

        if connected && event.version.is_none() {
            self.push(entity_id, kind, vec![event]).await;
        }
        Ok(())
    }

    /// The connection came up: push everything pending whose in-flight
    /// marker is absent or stale.
    pub async fn handle_connected(&self) -> Result<(), ClientError> {
        self.connected.store(true, Ordering::Relaxed);
        let pending = self.cache.checkout_unsynced(Utc::now())?;
        debug!(entities = pending.len(), "re-pushing pending events on connect");
        for EntityEvents {
            entity_id,
            kind,
            events,
        } in pending
        {
            self.push(entity_id, kind, events).await;
        }
        Ok(())
    }

    /// The connection dropped: queue mutations locally until it returns.
    pub fn handle_disconnected(&self) {
        self.connected.store(false, Ordering::Relaxed);
    }

    /// One catch-up pull over the transport.
    pub async fn sync_once(&self) -> Result<(), ClientError> {
        let cursor = self.cache.cursor()?;
        let batch = self.api.sync_events(cursor).await?;
        self.apply_server_batch(batch)
    }

    /// Merge one server batch: persist the cursor, overwrite local copies,
    /// rebuild and report each touched entity's view.
    pub fn apply_server_batch(&self, batch: SyncEventsResponse) -> Result<(), ClientError> {
        if batch.events.is_empty() {
            return Ok(());
        }

        self.cache.set_cursor(&batch.cursor)?;
        let updated = self.cache.merge_synced(&batch.events)?;
        for EntityEvents {
            entity_id,
            kind,
            events,
        } in updated
        {
            let view = View::build(kind, &events);
            self.cache.put_view(&entity_id, &view)?;
            self.notify(SyncNotification::ViewUpdated { entity_id, view });
        }
        Ok(())
    }

    /// The `syncEvents` request payload for the current cursor, used by
    /// subscribing transports to (re-)open the feed.
    pub fn sync_request_data(&self) -> Option<serde_json::Value> {
        let cursor = self.cache.cursor().ok()?;
        serde_json::to_value(SyncEventsRequest { cursor }).ok()
    }

    /// Push one entity's pending events and reconcile the response.
    ///
    /// Transport failures leave the events queued; the staleness window
    /// makes them eligible again; duplicates are dropped server-side by
    /// event ID. Rejections remove the failed events: survivors produce a
    /// rebuilt view, an empty remainder purges the entity.
    async fn push(&self, entity_id: EntityId, kind: EntityKind, events: Vec<Event>) {
        match self.api.add_events(&entity_id, events).await {
            Err(error) => {
                warn!(entity_id = %entity_id, %error, "push failed, events stay queued");
            }
            Ok(failed) if failed.is_empty() => {}
            Ok(failed) => {
                self.notify(SyncNotification::SyncFailed {
                    entity_id: entity_id.clone(),
                    errors: failed.iter().map(|f| f.error.clone()).collect(),
                });

                let failed_ids: Vec<EventId> =
                    failed.into_iter().map(|f| f.event_id).collect();
                match self.cache.remove_failed(&entity_id, &failed_ids) {
                    Ok(remaining) if remaining.is_empty() => {
                        self.notify(SyncNotification::EntityDeleted { entity_id, kind });
                    }
                    Ok(remaining) => {
                        let view = View::build(kind, &remaining);
                        if let Err(error) = self.cache.put_view(&entity_id, &view) {
                            warn!(entity_id = %entity_id, %error, "failed to store rebuilt view");
                        }
                        self.notify(SyncNotification::ViewUpdated { entity_id, view });
                    }
                    Err(error) => {
                        warn!(entity_id = %entity_id, %error, "failed to drop rejected events");
                    }
                }
            }
        }
    }

    fn notify(&self, notification: SyncNotification) {
        // The UI may have gone away; the cache still holds the truth.
        let _ = self.notifications.send(notification);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
