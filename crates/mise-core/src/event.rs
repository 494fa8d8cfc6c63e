//! The immutable unit of change and its canonical ordering.
//!
//! An [`Event`] targets exactly one entity. On the wire it is a flat JSON
//! object: the envelope fields (`id`, `entityId`, `version`, `timestamp`)
//! plus the payload fields of the concrete event type, discriminated by the
//! `type` tag:
//!
//! ```json
//! { "id": "…", "entityId": "…", "version": 3, "timestamp": "…",
//!   "type": "RecipeNameSet", "name": "Toast" }
//! ```
//!
//! `version` is absent until the server accepts the event; once assigned it
//! is permanent. The `type` discriminator is a closed sum over the three
//! entity kinds, so dispatch is exhaustive at compile time.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{EntityId, EventId};
use crate::pinned::events::PinnedRecipesEvent;
use crate::recipe::events::RecipeEvent;
use crate::shopping_list::events::ShoppingListEvent;

/// The entity kinds whose logs this system maintains.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntityKind {
    /// A recipe document; one log per recipe.
    Recipe,
    /// The account's shopping list; a singleton aggregate.
    ShoppingList,
    /// The account's ordered list of pinned recipes; a singleton aggregate.
    PinnedRecipes,
}

impl EntityKind {
    /// Stable string form, used for storage columns and logging.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Recipe => "recipe",
            EntityKind::ShoppingList => "shoppingList",
            EntityKind::PinnedRecipes => "pinnedRecipes",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recipe" => Ok(EntityKind::Recipe),
            "shoppingList" => Ok(EntityKind::ShoppingList),
            "pinnedRecipes" => Ok(EntityKind::PinnedRecipes),
            other => Err(format!("unknown entity kind: {other}")),
        }
    }
}

/// Reserved entity ID of the account's shopping list.
///
/// Singleton aggregates are ordinary entities addressed by a well-known
/// constant ID; there is no special code path for them.
#[must_use]
pub fn shopping_list_id() -> EntityId {
    EntityId::from("1c7f1046-6d2a-4e07-8ffb-03ec71c539b5")
}

/// Reserved entity ID of the account's pinned recipes list.
#[must_use]
pub fn pinned_recipes_id() -> EntityId {
    EntityId::from("9f2d8a3e-5b1c-4f76-9f05-6a1df2f6c0d4")
}

/// Type-specific event payload: a closed sum over the three entity kinds.
///
/// Each inner enum is internally tagged by `type`, and the variants' tag
/// strings are globally unique, so the untagged outer enum deserializes
/// unambiguously.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EventPayload {
    /// A recipe event.
    Recipe(RecipeEvent),
    /// A shopping list event.
    ShoppingList(ShoppingListEvent),
    /// A pinned recipes event.
    PinnedRecipes(PinnedRecipesEvent),
}

impl EventPayload {
    /// The entity kind that owns this payload.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            EventPayload::Recipe(_) => EntityKind::Recipe,
            EventPayload::ShoppingList(_) => EntityKind::ShoppingList,
            EventPayload::PinnedRecipes(_) => EntityKind::PinnedRecipes,
        }
    }

    /// The `type` tag string of the concrete event.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            EventPayload::Recipe(e) => e.type_name(),
            EventPayload::ShoppingList(e) => e.type_name(),
            EventPayload::PinnedRecipes(e) => e.type_name(),
        }
    }
}

/// The immutable unit of change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Globally unique, client-generated. The idempotency key.
    pub id: EventId,
    /// The aggregate this event mutates.
    pub entity_id: EntityId,
    /// Server-assigned sequence position; `None` until accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    /// Client-assigned instant; pre-acceptance ordering tiebreak and the
    /// catch-up cursor.
    #[serde(with = "crate::time::iso_millis")]
    pub timestamp: DateTime<Utc>,
    /// Type-specific payload, flattened into the event object on the wire.
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl Event {
    /// Create a fresh local event: random ID, no version, timestamp now.
    #[must_use]
    pub fn new(entity_id: EntityId, payload: impl Into<EventPayload>) -> Self {
        Self {
            id: EventId::new(),
            entity_id,
            version: None,
            timestamp: Utc::now(),
            payload: payload.into(),
        }
    }

    /// The entity kind that owns this event.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        self.payload.kind()
    }
}

impl From<RecipeEvent> for EventPayload {
    fn from(event: RecipeEvent) -> Self {
        EventPayload::Recipe(event)
    }
}

impl From<ShoppingListEvent> for EventPayload {
    fn from(event: ShoppingListEvent) -> Self {
        EventPayload::ShoppingList(event)
    }
}

impl From<PinnedRecipesEvent> for EventPayload {
    fn from(event: PinnedRecipesEvent) -> Self {
        EventPayload::PinnedRecipes(event)
    }
}

/// Canonical two-tier event ordering.
///
/// Versioned events order by version; version-less events sort after all
/// versioned ones and order among themselves by client timestamp. The
/// timestamp tier is a best-effort, clock-skew-sensitive convention used
/// only before acceptance and is never consulted once a version exists.
#[must_use]
pub fn order_events(a: &Event, b: &Event) -> Ordering {
    match (a.version, b.version) {
        (None, None) => a.timestamp.cmp(&b.timestamp),
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(va), Some(vb)) => va.cmp(&vb),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipe::events::RecipeEvent;
    use crate::shopping_list::events::ShoppingListEvent;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(secs: i64, version: Option<u32>) -> Event {
        Event {
            id: EventId::new(),
            entity_id: EntityId::from("entity-1"),
            version,
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            payload: EventPayload::Recipe(RecipeEvent::RecipeCreated),
        }
    }

    // ── Wire shape ───────────────────────────────────────────────────

    #[test]
    fn serializes_flat_with_camel_case_fields() {
        let event = Event {
            id: EventId::from("evt-1"),
            entity_id: EntityId::from("ent-1"),
            version: Some(3),
            timestamp: Utc.with_ymd_and_hms(2026, 2, 13, 15, 30, 0).unwrap(),
            payload: EventPayload::Recipe(RecipeEvent::RecipeNameSet {
                name: "Toast".into(),
            }),
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["id"], "evt-1");
        assert_eq!(value["entityId"], "ent-1");
        assert_eq!(value["version"], 3);
        assert_eq!(value["timestamp"], "2026-02-13T15:30:00.000Z");
        assert_eq!(value["type"], "RecipeNameSet");
        assert_eq!(value["name"], "Toast");
        // Payload is flattened, not nested.
        assert!(value.get("payload").is_none());
    }

    #[test]
    fn version_omitted_when_unassigned() {
        let event = Event::new(
            EntityId::new(),
            RecipeEvent::RecipeCreated,
        );
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("version"));
    }

    #[test]
    fn deserializes_wire_fixture() {
        let raw = r#"{
            "id": "e7a0f4a4-1df6-4b7e-b68e-1a3a1df6ffab",
            "entityId": "1c7f1046-6d2a-4e07-8ffb-03ec71c539b5",
            "version": 1,
            "timestamp": "2026-02-13T15:30:00.000Z",
            "type": "ShoppingListItemsChecked",
            "itemIds": ["0d0ed9e3-43cb-4342-9329-3e55acb2ec0a"]
        }"#;

        let event: Event = serde_json::from_str(raw).unwrap();
        assert_eq!(event.kind(), EntityKind::ShoppingList);
        assert_eq!(event.version, Some(1));
        assert!(matches!(
            event.payload,
            EventPayload::ShoppingList(ShoppingListEvent::ShoppingListItemsChecked { .. })
        ));
    }

    #[test]
    fn roundtrips_through_json() {
        let event = Event::new(
            shopping_list_id(),
            ShoppingListEvent::ShoppingListItemMoved {
                item_id: uuid::Uuid::new_v4(),
                index: 2,
            },
        );
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn rejects_unknown_type_tag() {
        let raw = r#"{
            "id": "a", "entityId": "b",
            "timestamp": "2026-01-01T00:00:00.000Z",
            "type": "NotARealEvent"
        }"#;
        assert!(serde_json::from_str::<Event>(raw).is_err());
    }

    // ── Constructors ─────────────────────────────────────────────────

    #[test]
    fn new_event_has_no_version() {
        let event = Event::new(EntityId::new(), RecipeEvent::RecipeCreated);
        assert!(event.version.is_none());
        assert_eq!(event.kind(), EntityKind::Recipe);
    }

    #[test]
    fn reserved_ids_are_stable() {
        assert_eq!(shopping_list_id(), shopping_list_id());
        assert_ne!(shopping_list_id(), pinned_recipes_id());
    }

    // ── EntityKind ───────────────────────────────────────────────────

    #[test]
    fn entity_kind_string_roundtrip() {
        for kind in [
            EntityKind::Recipe,
            EntityKind::ShoppingList,
            EntityKind::PinnedRecipes,
        ] {
            let parsed: EntityKind = kind.as_str().parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn entity_kind_parse_rejects_unknown() {
        assert!("mealPlan".parse::<EntityKind>().is_err());
    }

    // ── Ordering ─────────────────────────────────────────────────────

    #[test]
    fn versioned_events_order_by_version() {
        let a = at(100, Some(2));
        let b = at(50, Some(1));
        assert_eq!(order_events(&a, &b), Ordering::Greater);
        assert_eq!(order_events(&b, &a), Ordering::Less);
    }

    #[test]
    fn unversioned_events_sort_after_versioned() {
        let versioned = at(200, Some(7));
        let pending = at(100, None);
        assert_eq!(order_events(&pending, &versioned), Ordering::Greater);
        assert_eq!(order_events(&versioned, &pending), Ordering::Less);
    }

    #[test]
    fn unversioned_events_order_by_timestamp() {
        let earlier = at(100, None);
        let later = at(200, None);
        assert_eq!(order_events(&earlier, &later), Ordering::Less);
    }

    #[test]
    fn sort_puts_pending_tail_after_versioned_history() {
        let mut events = vec![at(10, None), at(5, Some(2)), at(99, Some(1)), at(3, None)];
        events.sort_by(order_events);

        assert_eq!(events[0].version, Some(1));
        assert_eq!(events[1].version, Some(2));
        assert!(events[2].version.is_none());
        assert!(events[2].timestamp < events[3].timestamp);
    }

    proptest! {
        #[test]
        fn ordering_is_total_and_consistent(
            versions in proptest::collection::vec(proptest::option::of(1u32..100), 2..20),
        ) {
            let mut events: Vec<Event> = versions
                .iter()
                .enumerate()
                .map(|(i, v)| at(i as i64, *v))
                .collect();
            events.sort_by(order_events);

            // All versioned events precede all unversioned ones.
            let first_pending = events.iter().position(|e| e.version.is_none());
            if let Some(pos) = first_pending {
                prop_assert!(events[pos..].iter().all(|e| e.version.is_none()));
            }

            // Versions are non-decreasing in the versioned prefix.
            let versioned: Vec<u32> = events.iter().filter_map(|e| e.version).collect();
            prop_assert!(versioned.windows(2).all(|w| w[0] <= w[1]));
        }
    }
}
