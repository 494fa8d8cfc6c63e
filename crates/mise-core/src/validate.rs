//! Validation dispatch across the entity kinds.
//!
//! [`ValidationState`] wraps the per-kind state machines behind one
//! exhaustive match, so the hub can replay and check any entity's history
//! without knowing which kind it is. A payload of the wrong kind is itself a
//! validation failure; batches may not mix entity kinds.

use crate::errors::ValidationError;
use crate::event::{EntityKind, EventPayload};
use crate::pinned::validate::PinnedRecipesValidation;
use crate::recipe::validate::RecipeValidation;
use crate::shopping_list::validate::ShoppingListValidation;

/// Per-entity validation state, selected by entity kind.
#[derive(Clone, Debug)]
pub enum ValidationState {
    /// Recipe state machine.
    Recipe(RecipeValidation),
    /// Shopping list state machine.
    ShoppingList(ShoppingListValidation),
    /// Pinned recipes state machine.
    PinnedRecipes(PinnedRecipesValidation),
}

impl ValidationState {
    /// Fresh state for an entity of the given kind.
    #[must_use]
    pub fn initial(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Recipe => ValidationState::Recipe(RecipeValidation::default()),
            EntityKind::ShoppingList => {
                ValidationState::ShoppingList(ShoppingListValidation::default())
            }
            EntityKind::PinnedRecipes => {
                ValidationState::PinnedRecipes(PinnedRecipesValidation::default())
            }
        }
    }

    /// The entity kind this state judges.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            ValidationState::Recipe(_) => EntityKind::Recipe,
            ValidationState::ShoppingList(_) => EntityKind::ShoppingList,
            ValidationState::PinnedRecipes(_) => EntityKind::PinnedRecipes,
        }
    }

    /// Apply one payload, advancing the state or rejecting the event.
    pub fn apply(&mut self, payload: &EventPayload) -> Result<(), ValidationError> {
        match (self, payload) {
            (ValidationState::Recipe(state), EventPayload::Recipe(event)) => {
                crate::recipe::validate::apply(state, event)
            }
            (ValidationState::ShoppingList(state), EventPayload::ShoppingList(event)) => {
                crate::shopping_list::validate::apply(state, event)
            }
            (ValidationState::PinnedRecipes(state), EventPayload::PinnedRecipes(event)) => {
                crate::pinned::validate::apply(state, event)
            }
            (state, payload) => Err(ValidationError::new(format!(
                "{} event doesn't belong to a {} entity",
                payload.kind(),
                state.kind(),
            ))),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
