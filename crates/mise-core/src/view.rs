//! View dispatch across the entity kinds.
//!
//! A [`View`] is the materialized projection consumers read. The client
//! caches views keyed by entity ID and either folds single events in
//! incrementally (the optimistic path) or rebuilds wholesale from the full
//! event list after server reconciliation.

use crate::event::{EntityKind, Event};
use crate::ids::EntityId;
use crate::recipe::view::Recipe;
use crate::shopping_list::view::ShoppingList;

/// A materialized entity projection, selected by entity kind.
#[derive(Clone, Debug, PartialEq)]
pub enum View {
    /// A recipe document.
    Recipe(Recipe),
    /// The shopping list.
    ShoppingList(ShoppingList),
    /// The ordered pinned recipe IDs.
    PinnedRecipes(Vec<EntityId>),
}

impl View {
    /// The empty view for an entity of the given kind.
    #[must_use]
    pub fn initial(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Recipe => View::Recipe(Recipe::default()),
            EntityKind::ShoppingList => View::ShoppingList(ShoppingList::default()),
            EntityKind::PinnedRecipes => View::PinnedRecipes(Vec::new()),
        }
    }

    /// The entity kind this view projects.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            View::Recipe(_) => EntityKind::Recipe,
            View::ShoppingList(_) => EntityKind::ShoppingList,
            View::PinnedRecipes(_) => EntityKind::PinnedRecipes,
        }
    }

    /// Fold one event into the view (incremental path). Events of another
    /// entity kind are ignored with a warning.
    pub fn apply(&mut self, event: &Event) {
        match self {
            View::Recipe(view) => crate::recipe::view::apply(view, event),
            View::ShoppingList(view) => crate::shopping_list::view::apply(view, event),
            View::PinnedRecipes(view) => crate::pinned::view::apply(view, event),
        }
    }

    /// Rebuild a view wholesale from a full event list (sorted internally by
    /// the canonical order).
    #[must_use]
    pub fn build(kind: EntityKind, events: &[Event]) -> Self {
        match kind {
            EntityKind::Recipe => View::Recipe(crate::recipe::view::build(events)),
            EntityKind::ShoppingList => {
                View::ShoppingList(crate::shopping_list::view::build(events))
            }
            EntityKind::PinnedRecipes => View::PinnedRecipes(crate::pinned::view::build(events)),
        }
    }

    /// Serialize the inner projection to JSON (the kind is stored alongside).
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        match self {
            View::Recipe(view) => serde_json::to_string(view),
            View::ShoppingList(view) => serde_json::to_string(view),
            View::PinnedRecipes(view) => serde_json::to_string(view),
        }
    }

    /// Deserialize a projection of the given kind from JSON.
    pub fn from_json(kind: EntityKind, json: &str) -> Result<Self, serde_json::Error> {
        Ok(match kind {
            EntityKind::Recipe => View::Recipe(serde_json::from_str(json)?),
            EntityKind::ShoppingList => View::ShoppingList(serde_json::from_str(json)?),
            EntityKind::PinnedRecipes => View::PinnedRecipes(serde_json::from_str(json)?),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
