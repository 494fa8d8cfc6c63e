//! The materialized shopping list view.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::ShoppingListEvent;
use crate::event::{Event, EventPayload, order_events};

/// A single shopping list entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListItem {
    /// Item identifier, unique within the list.
    pub id: Uuid,
    /// Item text.
    pub name: String,
}

/// The externally consumed shopping list: unchecked items in order, followed
/// by the checked-off pile. Checking an item moves it between the two.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingList {
    /// Unchecked items, in list order.
    pub items: Vec<ListItem>,
    /// Checked-off items, in the order they were checked.
    pub checked: Vec<ListItem>,
}

/// Fold one event into the view. Events of another entity kind are ignored.
pub fn apply(view: &mut ShoppingList, event: &Event) {
    let EventPayload::ShoppingList(payload) = &event.payload else {
        tracing::warn!(
            event_type = event.payload.type_name(),
            "ignoring non-shopping-list event in shopping list view"
        );
        return;
    };

    match payload {
        ShoppingListEvent::ShoppingListItemsAdded { items, index } => {
            let index = index.unwrap_or(view.items.len()).min(view.items.len());
            view.items.splice(index..index, items.iter().cloned());
        }
        ShoppingListEvent::ShoppingListItemUpdated { item } => {
            for existing in view.items.iter_mut().chain(view.checked.iter_mut()) {
                if existing.id == item.id {
                    existing.name = item.name.clone();
                }
            }
        }
        ShoppingListEvent::ShoppingListItemsRemoved { item_ids } => {
            view.items.retain(|item| !item_ids.contains(&item.id));
            view.checked.retain(|item| !item_ids.contains(&item.id));
        }
        ShoppingListEvent::ShoppingListItemsChecked { item_ids } => {
            let mut remaining = Vec::with_capacity(view.items.len());
            for item in view.items.drain(..) {
                if item_ids.contains(&item.id) {
                    view.checked.push(item);
                } else {
                    remaining.push(item);
                }
            }
            view.items = remaining;
        }
        ShoppingListEvent::ShoppingListItemsUnchecked { item_ids } => {
            let mut remaining = Vec::with_capacity(view.checked.len());
            for item in view.checked.drain(..) {
                if item_ids.contains(&item.id) {
                    view.items.push(item);
                } else {
                    remaining.push(item);
                }
            }
            view.checked = remaining;
        }
        ShoppingListEvent::ShoppingListItemMoved { item_id, index } => {
            if let Some(position) = view.items.iter().position(|item| item.id == *item_id) {
                let item = view.items.remove(position);
                let index = (*index).min(view.items.len());
                view.items.insert(index, item);
            }
        }
    }
}

/// Rebuild the shopping list wholesale from its full event list.
#[must_use]
pub fn build(events: &[Event]) -> ShoppingList {
    let mut ordered: Vec<&Event> = events.iter().collect();
    ordered.sort_by(|a, b| order_events(a, b));

    let mut view = ShoppingList::default();
    for event in ordered {
        apply(&mut view, event);
    }
    view
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::shopping_list_id;
    use crate::ids::EventId;
    use chrono::{TimeZone, Utc};

    fn event(version: u32, payload: ShoppingListEvent) -> Event {
        Event {
            id: EventId::new(),
            entity_id: shopping_list_id(),
            version: Some(version),
            timestamp: Utc
                .timestamp_opt(1_760_000_000 + i64::from(version), 0)
                .unwrap(),
            payload: EventPayload::ShoppingList(payload),
        }
    }

    fn item(name: &str) -> ListItem {
        ListItem {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }

    #[test]
    fn add_at_index_splices() {
        let first = item("Eggs");
        let second = item("Milk");
        let third = item("Bread");
        let list = build(&[
            event(
                1,
                ShoppingListEvent::ShoppingListItemsAdded {
                    items: vec![first.clone(), second.clone()],
                    index: None,
                },
            ),
            event(
                2,
                ShoppingListEvent::ShoppingListItemsAdded {
                    items: vec![third.clone()],
                    index: Some(1),
                },
            ),
        ]);

        let names: Vec<&str> = list.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Eggs", "Bread", "Milk"]);
    }

    #[test]
    fn check_moves_item_to_checked_pile() {
        let eggs = item("Eggs");
        let milk = item("Milk");
        let list = build(&[
            event(
                1,
                ShoppingListEvent::ShoppingListItemsAdded {
                    items: vec![eggs.clone(), milk.clone()],
                    index: None,
                },
            ),
            event(
                2,
                ShoppingListEvent::ShoppingListItemsChecked {
                    item_ids: vec![eggs.id],
                },
            ),
        ]);

        assert_eq!(list.items, vec![milk]);
        assert_eq!(list.checked, vec![eggs]);
    }

    #[test]
    fn uncheck_moves_item_back() {
        let eggs = item("Eggs");
        let list = build(&[
            event(
                1,
                ShoppingListEvent::ShoppingListItemsAdded {
                    items: vec![eggs.clone()],
                    index: None,
                },
            ),
            event(
                2,
                ShoppingListEvent::ShoppingListItemsChecked {
                    item_ids: vec![eggs.id],
                },
            ),
            event(
                3,
                ShoppingListEvent::ShoppingListItemsUnchecked {
                    item_ids: vec![eggs.id],
                },
            ),
        ]);

        assert_eq!(list.items, vec![eggs]);
        assert!(list.checked.is_empty());
    }

    #[test]
    fn update_renames_in_both_piles() {
        let eggs = item("Egs");
        let milk = item("Mlk");
        let list = build(&[
            event(
                1,
                ShoppingListEvent::ShoppingListItemsAdded {
                    items: vec![eggs.clone(), milk.clone()],
                    index: None,
                },
            ),
            event(
                2,
                ShoppingListEvent::ShoppingListItemsChecked {
                    item_ids: vec![milk.id],
                },
            ),
            event(
                3,
                ShoppingListEvent::ShoppingListItemUpdated {
                    item: ListItem {
                        id: eggs.id,
                        name: "Eggs".into(),
                    },
                },
            ),
            event(
                4,
                ShoppingListEvent::ShoppingListItemUpdated {
                    item: ListItem {
                        id: milk.id,
                        name: "Milk".into(),
                    },
                },
            ),
        ]);

        assert_eq!(list.items[0].name, "Eggs");
        assert_eq!(list.checked[0].name, "Milk");
    }

    #[test]
    fn remove_clears_both_piles() {
        let eggs = item("Eggs");
        let milk = item("Milk");
        let list = build(&[
            event(
                1,
                ShoppingListEvent::ShoppingListItemsAdded {
                    items: vec![eggs.clone(), milk.clone()],
                    index: None,
                },
            ),
            event(
                2,
                ShoppingListEvent::ShoppingListItemsChecked {
                    item_ids: vec![milk.id],
                },
            ),
            event(
                3,
                ShoppingListEvent::ShoppingListItemsRemoved {
                    item_ids: vec![eggs.id, milk.id],
                },
            ),
        ]);

        assert!(list.items.is_empty());
        assert!(list.checked.is_empty());
    }

    #[test]
    fn move_reorders_items() {
        let eggs = item("Eggs");
        let milk = item("Milk");
        let list = build(&[
            event(
                1,
                ShoppingListEvent::ShoppingListItemsAdded {
                    items: vec![eggs.clone(), milk.clone()],
                    index: None,
                },
            ),
            event(
                2,
                ShoppingListEvent::ShoppingListItemMoved {
                    item_id: milk.id,
                    index: 0,
                },
            ),
        ]);

        assert_eq!(list.items, vec![milk, eggs]);
    }

    #[test]
    fn build_equals_incremental_fold() {
        let eggs = item("Eggs");
        let events = vec![
            event(
                1,
                ShoppingListEvent::ShoppingListItemsAdded {
                    items: vec![eggs.clone()],
                    index: None,
                },
            ),
            event(
                2,
                ShoppingListEvent::ShoppingListItemsChecked {
                    item_ids: vec![eggs.id],
                },
            ),
        ];

        let wholesale = build(&events);
        let mut incremental = ShoppingList::default();
        for e in &events {
            apply(&mut incremental, e);
        }
        assert_eq!(wholesale, incremental);
    }
}
