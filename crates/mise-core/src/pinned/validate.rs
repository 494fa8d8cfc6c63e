//! Pinned recipes validation state machine.

use std::collections::HashSet;

use super::events::PinnedRecipesEvent;
use crate::errors::ValidationError;
use crate::ids::EntityId;

/// Minimal state for judging pinned recipes event legality: the set of
/// currently pinned recipe IDs.
#[derive(Clone, Debug, Default)]
pub struct PinnedRecipesValidation {
    pinned: HashSet<EntityId>,
}

/// Apply one event to the validation state, rejecting illegal events.
pub fn apply(
    state: &mut PinnedRecipesValidation,
    event: &PinnedRecipesEvent,
) -> Result<(), ValidationError> {
    match event {
        PinnedRecipesEvent::RecipePinned { recipe_id } => {
            if !state.pinned.insert(recipe_id.clone()) {
                return Err(ValidationError::new(format!(
                    "recipe {recipe_id} is already pinned"
                )));
            }
        }
        PinnedRecipesEvent::RecipeUnpinned { recipe_id } => {
            if !state.pinned.remove(recipe_id) {
                return Err(ValidationError::new(format!(
                    "recipe {recipe_id} is not pinned"
                )));
            }
        }
        PinnedRecipesEvent::PinnedRecipeMoved { recipe_id, index } => {
            if !state.pinned.contains(recipe_id) {
                return Err(ValidationError::new(format!(
                    "recipe {recipe_id} is not pinned"
                )));
            }
            if *index > state.pinned.len() {
                return Err(ValidationError::new(format!("invalid item index {index}")));
            }
        }
    }

    Ok(())
}
