//! Shopping list event vocabulary.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::view::ListItem;

/// Everything that can happen to the shopping list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ShoppingListEvent {
    /// One or more items were added at a position.
    ShoppingListItemsAdded {
        /// The items; their IDs must be new to the list.
        items: Vec<ListItem>,
        /// Insertion position; appends when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    /// An item's text was replaced.
    ShoppingListItemUpdated {
        /// The replacement item; matched by ID.
        item: ListItem,
    },
    /// Items were removed outright.
    ShoppingListItemsRemoved {
        /// IDs of the items to remove.
        item_ids: Vec<Uuid>,
    },
    /// Items were ticked off.
    ShoppingListItemsChecked {
        /// IDs of the items to check; none may already be checked.
        item_ids: Vec<Uuid>,
    },
    /// Checked items were moved back onto the list.
    ShoppingListItemsUnchecked {
        /// IDs of the items to uncheck; all must currently be checked.
        item_ids: Vec<Uuid>,
    },
    /// An unchecked item was moved to a new position.
    ShoppingListItemMoved {
        /// The item to move.
        item_id: Uuid,
        /// Target position.
        index: usize,
    },
}

impl ShoppingListEvent {
    /// The `type` tag string of this event.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            ShoppingListEvent::ShoppingListItemsAdded { .. } => "ShoppingListItemsAdded",
            ShoppingListEvent::ShoppingListItemUpdated { .. } => "ShoppingListItemUpdated",
            ShoppingListEvent::ShoppingListItemsRemoved { .. } => "ShoppingListItemsRemoved",
            ShoppingListEvent::ShoppingListItemsChecked { .. } => "ShoppingListItemsChecked",
            ShoppingListEvent::ShoppingListItemsUnchecked { .. } => "ShoppingListItemsUnchecked",
            ShoppingListEvent::ShoppingListItemMoved { .. } => "ShoppingListItemMoved",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_matches_type_name() {
        let event = ShoppingListEvent::ShoppingListItemsRemoved {
            item_ids: vec![Uuid::new_v4()],
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], event.type_name());
        assert!(value.get("itemIds").is_some());
    }

    #[test]
    fn items_added_roundtrip() {
        let event = ShoppingListEvent::ShoppingListItemsAdded {
            items: vec![ListItem {
                id: Uuid::new_v4(),
                name: "Oat milk".into(),
            }],
            index: Some(0),
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: ShoppingListEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
