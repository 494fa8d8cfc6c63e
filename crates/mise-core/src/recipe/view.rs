//! The materialized recipe view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::RecipeEvent;
use super::types::{IngredientItem, IngredientItemKind, Instruction, RecipeTag};
use crate::event::{Event, EventPayload, order_events};
use crate::ids::EntityId;

/// The externally consumed recipe document, folded from the event log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    /// Entity ID, set by the creation event.
    pub id: EntityId,
    /// Recipe name.
    pub name: String,
    /// Number of events applied; the view's revision counter.
    pub version: u64,
    /// Ordered ingredient list, headings and ingredients interleaved.
    pub ingredients: Vec<IngredientItem>,
    /// Instructions.
    pub instructions: Vec<Instruction>,
    /// Image, if one has been set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_id: Option<Uuid>,
    /// When the recipe was created.
    #[serde(default, with = "crate::time::iso_millis_opt")]
    pub created_on: Option<DateTime<Utc>>,
    /// Timestamp of the latest applied event.
    #[serde(default, with = "crate::time::iso_millis_opt")]
    pub updated_on: Option<DateTime<Utc>>,
    /// Cook time in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cook_time: Option<u32>,
    /// Preparation time in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prep_time: Option<u32>,
    /// How many times the recipe has been cooked.
    pub completed_count: u32,
    /// When the recipe was last cooked.
    #[serde(default, with = "crate::time::iso_millis_opt")]
    pub completed_on: Option<DateTime<Utc>>,
    /// Tags, kept sorted.
    pub tags: Vec<RecipeTag>,
    /// Whether the recipe is in the bin.
    pub deleted: bool,
}

impl Default for Recipe {
    fn default() -> Self {
        Self {
            id: EntityId::from(""),
            name: String::new(),
            version: 0,
            ingredients: Vec::new(),
            instructions: Vec::new(),
            image_id: None,
            created_on: None,
            updated_on: None,
            cook_time: None,
            prep_time: None,
            completed_count: 0,
            completed_on: None,
            tags: Vec::new(),
            deleted: false,
        }
    }
}

/// Fold one event into the view. Events of another entity kind are ignored.
pub fn apply(view: &mut Recipe, event: &Event) {
    let EventPayload::Recipe(payload) = &event.payload else {
        tracing::warn!(
            event_type = event.payload.type_name(),
            "ignoring non-recipe event in recipe view"
        );
        return;
    };

    view.version += 1;
    view.updated_on = Some(event.timestamp);

    match payload {
        RecipeEvent::RecipeCreated => {
            view.id = event.entity_id.clone();
            view.created_on = Some(event.timestamp);
        }
        RecipeEvent::RecipeImported {
            name,
            ingredients,
            instructions,
            cook_time,
            prep_time,
            image_id,
            tags,
            ..
        } => {
            view.id = event.entity_id.clone();
            view.created_on = Some(event.timestamp);
            view.name = name.clone();
            view.ingredients = ingredients.clone();
            view.instructions = instructions.clone();
            view.cook_time = *cook_time;
            view.prep_time = *prep_time;
            view.image_id = *image_id;
            view.tags = tags.clone();
            view.tags.sort();
        }
        RecipeEvent::RecipeNameSet { name } => {
            view.name = name.clone();
        }
        RecipeEvent::RecipeImageSet { image_id } => {
            view.image_id = Some(*image_id);
        }
        RecipeEvent::RecipeIngredientItemAdded {
            item_id,
            item_type,
            index,
        } => {
            let item = match item_type {
                IngredientItemKind::Heading => IngredientItem::Heading {
                    id: *item_id,
                    name: String::new(),
                },
                IngredientItemKind::Ingredient => IngredientItem::Ingredient {
                    id: *item_id,
                    name: None,
                    amount: None,
                    measurement: None,
                },
            };
            let index = index
                .unwrap_or(view.ingredients.len())
                .min(view.ingredients.len());
            view.ingredients.insert(index, item);
        }
        RecipeEvent::RecipeIngredientItemMoved { item_id, index } => {
            if let Some(position) = view.ingredients.iter().position(|i| i.id() == *item_id) {
                let item = view.ingredients.remove(position);
                let index = (*index).min(view.ingredients.len());
                view.ingredients.insert(index, item);
            }
        }
        RecipeEvent::RecipeIngredientItemRemoved { item_id } => {
            view.ingredients.retain(|i| i.id() != *item_id);
        }
        RecipeEvent::RecipeIngredientUpdated {
            item_id,
            name,
            amount,
            measurement,
        } => {
            for item in &mut view.ingredients {
                if let IngredientItem::Ingredient {
                    id,
                    name: item_name,
                    amount: item_amount,
                    measurement: item_measurement,
                } = item
                {
                    if id == item_id {
                        *item_name = name.clone();
                        *item_amount = amount.clone();
                        *item_measurement = *measurement;
                    }
                }
            }
        }
        RecipeEvent::RecipeIngredientHeadingUpdated { item_id, name } => {
            for item in &mut view.ingredients {
                if let IngredientItem::Heading {
                    id,
                    name: item_name,
                } = item
                {
                    if id == item_id {
                        *item_name = name.clone();
                    }
                }
            }
        }
        RecipeEvent::RecipeInstructionsSet { instructions } => {
            view.instructions = instructions.clone();
        }
        RecipeEvent::RecipeCookTimeSet { time } => {
            view.cook_time = *time;
        }
        RecipeEvent::RecipePrepTimeSet { time } => {
            view.prep_time = *time;
        }
        RecipeEvent::RecipeCompleted => {
            view.completed_count += 1;
            view.completed_on = Some(event.timestamp);
        }
        RecipeEvent::RecipeTagAdded { tag } => {
            if !view.tags.contains(tag) {
                view.tags.push(*tag);
                view.tags.sort();
            }
        }
        RecipeEvent::RecipeTagRemoved { tag } => {
            view.tags.retain(|t| t != tag);
        }
        RecipeEvent::RecipeDeleted => {
            view.deleted = true;
        }
        RecipeEvent::RecipeRestored => {
            view.deleted = false;
        }
    }
}

/// Rebuild a recipe wholesale from its full event list.
///
/// Events are sorted by the canonical two-tier order first, so callers may
/// pass history in any order.
#[must_use]
pub fn build(events: &[Event]) -> Recipe {
    let mut ordered: Vec<&Event> = events.iter().collect();
    ordered.sort_by(|a, b| order_events(a, b));

    let mut view = Recipe::default();
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
    use crate::ids::EventId;
    use chrono::TimeZone;

    fn event(entity: &EntityId, version: u32, payload: RecipeEvent) -> Event {
        Event {
            id: EventId::new(),
            entity_id: entity.clone(),
            version: Some(version),
            timestamp: Utc
                .timestamp_opt(1_760_000_000 + i64::from(version), 0)
                .unwrap(),
            payload: EventPayload::Recipe(payload),
        }
    }

    #[test]
    fn created_sets_identity() {
        let entity = EntityId::new();
        let recipe = build(&[event(&entity, 1, RecipeEvent::RecipeCreated)]);
        assert_eq!(recipe.id, entity);
        assert_eq!(recipe.version, 1);
        assert!(recipe.created_on.is_some());
        assert_eq!(recipe.created_on, recipe.updated_on);
    }

    #[test]
    fn build_equals_incremental_fold() {
        let entity = EntityId::new();
        let events = vec![
            event(&entity, 1, RecipeEvent::RecipeCreated),
            event(
                &entity,
                2,
                RecipeEvent::RecipeNameSet {
                    name: "Toast".into(),
                },
            ),
        ];

        let wholesale = build(&events);

        let mut incremental = Recipe::default();
        for e in &events {
            apply(&mut incremental, e);
        }

        assert_eq!(wholesale, incremental);
        assert_eq!(wholesale.name, "Toast");
    }

    #[test]
    fn build_sorts_before_folding() {
        let entity = EntityId::new();
        let events = vec![
            event(
                &entity,
                2,
                RecipeEvent::RecipeNameSet {
                    name: "Second".into(),
                },
            ),
            event(
                &entity,
                3,
                RecipeEvent::RecipeNameSet {
                    name: "Final".into(),
                },
            ),
            event(&entity, 1, RecipeEvent::RecipeCreated),
        ];
        let recipe = build(&events);
        assert_eq!(recipe.name, "Final");
        assert_eq!(recipe.version, 3);
    }

    #[test]
    fn ingredient_add_move_remove() {
        let entity = EntityId::new();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        let mut view = Recipe::default();
        apply(&mut view, &event(&entity, 1, RecipeEvent::RecipeCreated));
        apply(
            &mut view,
            &event(
                &entity,
                2,
                RecipeEvent::RecipeIngredientItemAdded {
                    item_id: first,
                    item_type: IngredientItemKind::Ingredient,
                    index: None,
                },
            ),
        );
        apply(
            &mut view,
            &event(
                &entity,
                3,
                RecipeEvent::RecipeIngredientItemAdded {
                    item_id: second,
                    item_type: IngredientItemKind::Heading,
                    index: Some(0),
                },
            ),
        );
        assert_eq!(view.ingredients[0].id(), second);
        assert_eq!(view.ingredients[1].id(), first);

        apply(
            &mut view,
            &event(
                &entity,
                4,
                RecipeEvent::RecipeIngredientItemMoved {
                    item_id: second,
                    index: 1,
                },
            ),
        );
        assert_eq!(view.ingredients[0].id(), first);
        assert_eq!(view.ingredients[1].id(), second);

        apply(
            &mut view,
            &event(
                &entity,
                5,
                RecipeEvent::RecipeIngredientItemRemoved { item_id: first },
            ),
        );
        assert_eq!(view.ingredients.len(), 1);
        assert_eq!(view.ingredients[0].id(), second);
    }

    #[test]
    fn ingredient_update_replaces_fields() {
        let entity = EntityId::new();
        let item_id = Uuid::new_v4();

        let mut view = Recipe::default();
        apply(&mut view, &event(&entity, 1, RecipeEvent::RecipeCreated));
        apply(
            &mut view,
            &event(
                &entity,
                2,
                RecipeEvent::RecipeIngredientItemAdded {
                    item_id,
                    item_type: IngredientItemKind::Ingredient,
                    index: None,
                },
            ),
        );
        apply(
            &mut view,
            &event(
                &entity,
                3,
                RecipeEvent::RecipeIngredientUpdated {
                    item_id,
                    name: Some("Butter".into()),
                    amount: Some("2".into()),
                    measurement: Some(super::super::types::Measurement::Tablespoon),
                },
            ),
        );

        let IngredientItem::Ingredient { name, amount, .. } = &view.ingredients[0] else {
            panic!("expected ingredient");
        };
        assert_eq!(name.as_deref(), Some("Butter"));
        assert_eq!(amount.as_deref(), Some("2"));
    }

    #[test]
    fn tags_stay_sorted_and_unique() {
        let entity = EntityId::new();
        let mut view = Recipe::default();
        apply(&mut view, &event(&entity, 1, RecipeEvent::RecipeCreated));
        apply(
            &mut view,
            &event(
                &entity,
                2,
                RecipeEvent::RecipeTagAdded {
                    tag: RecipeTag::Soup,
                },
            ),
        );
        apply(
            &mut view,
            &event(
                &entity,
                3,
                RecipeEvent::RecipeTagAdded {
                    tag: RecipeTag::Baking,
                },
            ),
        );
        assert_eq!(view.tags, vec![RecipeTag::Baking, RecipeTag::Soup]);

        apply(
            &mut view,
            &event(
                &entity,
                4,
                RecipeEvent::RecipeTagRemoved {
                    tag: RecipeTag::Baking,
                },
            ),
        );
        assert_eq!(view.tags, vec![RecipeTag::Soup]);
    }

    #[test]
    fn completed_counts_and_stamps() {
        let entity = EntityId::new();
        let mut view = Recipe::default();
        apply(&mut view, &event(&entity, 1, RecipeEvent::RecipeCreated));
        apply(&mut view, &event(&entity, 2, RecipeEvent::RecipeCompleted));
        apply(&mut view, &event(&entity, 3, RecipeEvent::RecipeCompleted));
        assert_eq!(view.completed_count, 2);
        assert_eq!(view.completed_on, view.updated_on);
    }

    #[test]
    fn delete_and_restore_toggle_flag() {
        let entity = EntityId::new();
        let mut view = Recipe::default();
        apply(&mut view, &event(&entity, 1, RecipeEvent::RecipeCreated));
        apply(&mut view, &event(&entity, 2, RecipeEvent::RecipeDeleted));
        assert!(view.deleted);
        apply(&mut view, &event(&entity, 3, RecipeEvent::RecipeRestored));
        assert!(!view.deleted);
    }

    #[test]
    fn non_recipe_event_is_ignored() {
        let entity = EntityId::new();
        let mut view = Recipe::default();
        apply(&mut view, &event(&entity, 1, RecipeEvent::RecipeCreated));

        let foreign = Event {
            id: EventId::new(),
            entity_id: entity,
            version: Some(2),
            timestamp: Utc::now(),
            payload: EventPayload::PinnedRecipes(
                crate::pinned::events::PinnedRecipesEvent::RecipePinned {
                    recipe_id: EntityId::new(),
                },
            ),
        };
        apply(&mut view, &foreign);
        assert_eq!(view.version, 1);
    }
}
