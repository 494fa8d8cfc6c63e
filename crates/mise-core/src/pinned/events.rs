//! Pinned recipes event vocabulary.

use serde::{Deserialize, Serialize};

use crate::ids::EntityId;

/// Everything that can happen to the pinned recipes list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum PinnedRecipesEvent {
    /// A recipe was pinned to the end of the list.
    RecipePinned {
        /// The recipe's entity ID.
        recipe_id: EntityId,
    },
    /// A recipe was unpinned.
    RecipeUnpinned {
        /// The recipe's entity ID.
        recipe_id: EntityId,
    },
    /// A pinned recipe was moved to a new position.
    PinnedRecipeMoved {
        /// The recipe's entity ID.
        recipe_id: EntityId,
        /// Target position.
        index: usize,
    },
}

impl PinnedRecipesEvent {
    /// The `type` tag string of this event.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            PinnedRecipesEvent::RecipePinned { .. } => "RecipePinned",
            PinnedRecipesEvent::RecipeUnpinned { .. } => "RecipeUnpinned",
            PinnedRecipesEvent::PinnedRecipeMoved { .. } => "PinnedRecipeMoved",
        }
    }
}
