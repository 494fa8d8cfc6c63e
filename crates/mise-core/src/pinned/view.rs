//! The materialized pinned recipes view: an ordered list of recipe IDs.

use super::events::PinnedRecipesEvent;
use crate::event::{Event, EventPayload, order_events};
use crate::ids::EntityId;

/// Fold one event into the view. Events of another entity kind are ignored.
pub fn apply(view: &mut Vec<EntityId>, event: &Event) {
    let EventPayload::PinnedRecipes(payload) = &event.payload else {
        tracing::warn!(
            event_type = event.payload.type_name(),
            "ignoring non-pinned-recipes event in pinned recipes view"
        );
        return;
    };

    match payload {
        PinnedRecipesEvent::RecipePinned { recipe_id } => {
            view.push(recipe_id.clone());
        }
        PinnedRecipesEvent::RecipeUnpinned { recipe_id } => {
            view.retain(|id| id != recipe_id);
        }
        PinnedRecipesEvent::PinnedRecipeMoved { recipe_id, index } => {
            if let Some(position) = view.iter().position(|id| id == recipe_id) {
                let id = view.remove(position);
                let index = (*index).min(view.len());
                view.insert(index, id);
            }
        }
    }
}

/// Rebuild the pinned list wholesale from its full event list.
#[must_use]
pub fn build(events: &[Event]) -> Vec<EntityId> {
    let mut ordered: Vec<&Event> = events.iter().collect();
    ordered.sort_by(|a, b| order_events(a, b));

    let mut view = Vec::new();
    for event in ordered {
        apply(&mut view, event);
    }
    view
}
