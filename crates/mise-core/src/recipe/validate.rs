//! Recipe validation state machine.
//!
//! Tracks the minimal summary needed to judge the next event: whether the
//! recipe exists, which ingredient items it has (and their kind), which tags
//! are set, and whether it is in the bin. Rebuilt by replay on every
//! validation cycle; never persisted.

use std::collections::HashMap;

use uuid::Uuid;

use super::events::RecipeEvent;
use super::types::{IngredientItemKind, RecipeTag};
use crate::errors::ValidationError;

/// Minimal state for judging recipe event legality.
#[derive(Clone, Debug, Default)]
pub struct RecipeValidation {
    created: bool,
    ingredients: HashMap<Uuid, IngredientItemKind>,
    tags: Vec<RecipeTag>,
    deleted: bool,
}

/// Apply one event to the validation state, rejecting illegal events.
pub fn apply(state: &mut RecipeValidation, event: &RecipeEvent) -> Result<(), ValidationError> {
    match event {
        RecipeEvent::RecipeCreated => {
            if state.created {
                return Err(ValidationError::new("recipe has already been created"));
            }
            state.created = true;
            return Ok(());
        }
        RecipeEvent::RecipeImported { ingredients, .. } => {
            if state.created {
                return Err(ValidationError::new("recipe has already been created"));
            }
            state.created = true;
            for item in ingredients {
                let _ = state.ingredients.insert(item.id(), item.item_kind());
            }
            return Ok(());
        }
        _ => {}
    }

    if !state.created {
        return Err(ValidationError::new("recipe hasn't been created"));
    }

    match event {
        RecipeEvent::RecipeIngredientItemAdded {
            item_id,
            item_type,
            index,
        } => {
            if state.ingredients.contains_key(item_id) {
                return Err(ValidationError::new(format!(
                    "recipe already has ingredient {item_id}"
                )));
            }
            if let Some(index) = index {
                if *index > state.ingredients.len() {
                    return Err(ValidationError::new(format!(
                        "invalid ingredient index {index}"
                    )));
                }
            }
            let _ = state.ingredients.insert(*item_id, *item_type);
        }
        RecipeEvent::RecipeIngredientItemMoved { item_id, index } => {
            if !state.ingredients.contains_key(item_id) {
                return Err(ValidationError::new(format!(
                    "recipe doesn't have ingredient {item_id}"
                )));
            }
            if *index > state.ingredients.len() {
                return Err(ValidationError::new(format!(
                    "invalid ingredient index {index}"
                )));
            }
        }
        RecipeEvent::RecipeIngredientItemRemoved { item_id } => {
            if state.ingredients.remove(item_id).is_none() {
                return Err(ValidationError::new(format!(
                    "recipe doesn't have ingredient {item_id}"
                )));
            }
        }
        RecipeEvent::RecipeIngredientUpdated { item_id, .. } => {
            match state.ingredients.get(item_id) {
                None => {
                    return Err(ValidationError::new(format!(
                        "recipe doesn't have ingredient {item_id}"
                    )));
                }
                Some(IngredientItemKind::Heading) => {
                    return Err(ValidationError::new(format!(
                        "recipe item {item_id} is a heading, not an ingredient"
                    )));
                }
                Some(IngredientItemKind::Ingredient) => {}
            }
        }
        RecipeEvent::RecipeIngredientHeadingUpdated { item_id, .. } => {
            match state.ingredients.get(item_id) {
                None => {
                    return Err(ValidationError::new(format!(
                        "recipe doesn't have ingredient {item_id}"
                    )));
                }
                Some(IngredientItemKind::Ingredient) => {
                    return Err(ValidationError::new(format!(
                        "recipe item {item_id} is an ingredient, not a heading"
                    )));
                }
                Some(IngredientItemKind::Heading) => {}
            }
        }
        RecipeEvent::RecipeTagAdded { tag } => {
            if state.tags.contains(tag) {
                return Err(ValidationError::new(format!(
                    "recipe already has tag {tag:?}"
                )));
            }
            state.tags.push(*tag);
        }
        RecipeEvent::RecipeTagRemoved { tag } => {
            let Some(position) = state.tags.iter().position(|t| t == tag) else {
                return Err(ValidationError::new(format!(
                    "recipe doesn't have tag {tag:?}"
                )));
            };
            let _ = state.tags.remove(position);
        }
        RecipeEvent::RecipeDeleted => {
            if state.deleted {
                return Err(ValidationError::new("recipe has already been deleted"));
            }
            state.deleted = true;
        }
        RecipeEvent::RecipeRestored => {
            if !state.deleted {
                return Err(ValidationError::new("recipe has not been deleted"));
            }
            state.deleted = false;
        }
        // Name, image, instructions, and times are unconditionally legal on
        // an existing recipe.
        RecipeEvent::RecipeNameSet { .. }
        | RecipeEvent::RecipeImageSet { .. }
        | RecipeEvent::RecipeInstructionsSet { .. }
        | RecipeEvent::RecipeCookTimeSet { .. }
        | RecipeEvent::RecipePrepTimeSet { .. }
        | RecipeEvent::RecipeCompleted => {}
        RecipeEvent::RecipeCreated | RecipeEvent::RecipeImported { .. } => unreachable!(),
    }

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
