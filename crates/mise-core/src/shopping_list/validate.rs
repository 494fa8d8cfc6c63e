//! Shopping list validation state machine.
//!
//! The singleton list needs no creation event; the first add brings it into
//! being. Legality only depends on which item IDs exist and which are
//! checked.

use std::collections::HashSet;

use uuid::Uuid;

use super::events::ShoppingListEvent;
use crate::errors::ValidationError;

/// Minimal state for judging shopping list event legality.
#[derive(Clone, Debug, Default)]
pub struct ShoppingListValidation {
    item_ids: HashSet<Uuid>,
    checked_ids: HashSet<Uuid>,
}

/// Apply one event to the validation state, rejecting illegal events.
pub fn apply(
    state: &mut ShoppingListValidation,
    event: &ShoppingListEvent,
) -> Result<(), ValidationError> {
    match event {
        ShoppingListEvent::ShoppingListItemsAdded { items, index } => {
            for item in items {
                if !state.item_ids.insert(item.id) {
                    return Err(ValidationError::new(format!(
                        "shopping list already has item {}",
                        item.id
                    )));
                }
            }
            if let Some(index) = index {
                if *index > state.item_ids.len() {
                    return Err(ValidationError::new(format!("invalid item index {index}")));
                }
            }
        }
        ShoppingListEvent::ShoppingListItemUpdated { item } => {
            if !state.item_ids.contains(&item.id) {
                return Err(ValidationError::new(format!(
                    "shopping list doesn't have item {}",
                    item.id
                )));
            }
        }
        ShoppingListEvent::ShoppingListItemsRemoved { item_ids } => {
            for item_id in item_ids {
                if !state.item_ids.remove(item_id) {
                    return Err(ValidationError::new(format!(
                        "shopping list doesn't have item {item_id}"
                    )));
                }
                let _ = state.checked_ids.remove(item_id);
            }
        }
        ShoppingListEvent::ShoppingListItemsChecked { item_ids } => {
            for item_id in item_ids {
                if !state.item_ids.contains(item_id) {
                    return Err(ValidationError::new(format!(
                        "shopping list doesn't have item {item_id}"
                    )));
                }
                if !state.checked_ids.insert(*item_id) {
                    return Err(ValidationError::new(format!(
                        "shopping list item {item_id} is already checked"
                    )));
                }
            }
        }
        ShoppingListEvent::ShoppingListItemsUnchecked { item_ids } => {
            for item_id in item_ids {
                if !state.item_ids.contains(item_id) {
                    return Err(ValidationError::new(format!(
                        "shopping list doesn't have item {item_id}"
                    )));
                }
                if !state.checked_ids.remove(item_id) {
                    return Err(ValidationError::new(format!(
                        "shopping list item {item_id} isn't checked"
                    )));
                }
            }
        }
        ShoppingListEvent::ShoppingListItemMoved { item_id, index } => {
            if !state.item_ids.contains(item_id) {
                return Err(ValidationError::new(format!(
                    "shopping list doesn't have item {item_id}"
                )));
            }
            if *index > state.item_ids.len() {
                return Err(ValidationError::new(format!("invalid item index {index}")));
            }
        }
    }

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::shopping_list::view::ListItem;

    fn item(name: &str) -> ListItem {
        ListItem {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }

    fn with_items(items: &[ListItem]) -> ShoppingListValidation {
        let mut state = ShoppingListValidation::default();
        apply(
            &mut state,
            &ShoppingListEvent::ShoppingListItemsAdded {
                items: items.to_vec(),
                index: None,
            },
        )
        .unwrap();
        state
    }

    #[test]
    fn duplicate_item_id_fails() {
        let eggs = item("Eggs");
        let mut state = with_items(&[eggs.clone()]);
        let err = apply(
            &mut state,
            &ShoppingListEvent::ShoppingListItemsAdded {
                items: vec![eggs],
                index: None,
            },
        )
        .unwrap_err();
        assert!(err.message.contains("already has item"));
    }

    #[test]
    fn update_missing_item_fails() {
        let mut state = ShoppingListValidation::default();
        let err = apply(
            &mut state,
            &ShoppingListEvent::ShoppingListItemUpdated { item: item("Milk") },
        )
        .unwrap_err();
        assert!(err.message.contains("doesn't have item"));
    }

    #[test]
    fn remove_missing_item_fails() {
        let mut state = ShoppingListValidation::default();
        let err = apply(
            &mut state,
            &ShoppingListEvent::ShoppingListItemsRemoved {
                item_ids: vec![Uuid::new_v4()],
            },
        )
        .unwrap_err();
        assert!(err.message.contains("doesn't have item"));
    }

    #[test]
    fn check_twice_fails() {
        let eggs = item("Eggs");
        let mut state = with_items(&[eggs.clone()]);
        apply(
            &mut state,
            &ShoppingListEvent::ShoppingListItemsChecked {
                item_ids: vec![eggs.id],
            },
        )
        .unwrap();
        let err = apply(
            &mut state,
            &ShoppingListEvent::ShoppingListItemsChecked {
                item_ids: vec![eggs.id],
            },
        )
        .unwrap_err();
        assert!(err.message.contains("already checked"));
    }

    #[test]
    fn uncheck_unchecked_fails() {
        let eggs = item("Eggs");
        let mut state = with_items(&[eggs.clone()]);
        let err = apply(
            &mut state,
            &ShoppingListEvent::ShoppingListItemsUnchecked {
                item_ids: vec![eggs.id],
            },
        )
        .unwrap_err();
        assert!(err.message.contains("isn't checked"));
    }

    #[test]
    fn check_uncheck_check_is_legal() {
        let eggs = item("Eggs");
        let mut state = with_items(&[eggs.clone()]);
        for event in [
            ShoppingListEvent::ShoppingListItemsChecked {
                item_ids: vec![eggs.id],
            },
            ShoppingListEvent::ShoppingListItemsUnchecked {
                item_ids: vec![eggs.id],
            },
            ShoppingListEvent::ShoppingListItemsChecked {
                item_ids: vec![eggs.id],
            },
        ] {
            apply(&mut state, &event).unwrap();
        }
    }

    #[test]
    fn removing_checked_item_clears_checked_state() {
        let eggs = item("Eggs");
        let mut state = with_items(&[eggs.clone()]);
        apply(
            &mut state,
            &ShoppingListEvent::ShoppingListItemsChecked {
                item_ids: vec![eggs.id],
            },
        )
        .unwrap();
        apply(
            &mut state,
            &ShoppingListEvent::ShoppingListItemsRemoved {
                item_ids: vec![eggs.id],
            },
        )
        .unwrap();

        // Re-adding the same ID is legal and starts unchecked.
        apply(
            &mut state,
            &ShoppingListEvent::ShoppingListItemsAdded {
                items: vec![eggs.clone()],
                index: None,
            },
        )
        .unwrap();
        apply(
            &mut state,
            &ShoppingListEvent::ShoppingListItemsChecked {
                item_ids: vec![eggs.id],
            },
        )
        .unwrap();
    }

    #[test]
    fn move_index_out_of_bounds_fails() {
        let eggs = item("Eggs");
        let mut state = with_items(&[eggs.clone()]);
        let err = apply(
            &mut state,
            &ShoppingListEvent::ShoppingListItemMoved {
                item_id: eggs.id,
                index: 2,
            },
        )
        .unwrap_err();
        assert!(err.message.contains("invalid item index"));
    }
}
