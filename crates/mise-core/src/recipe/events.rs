//! Recipe event vocabulary.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::{IngredientItem, IngredientItemKind, Instruction, Measurement, RecipeTag};

/// Everything that can happen to a recipe.
///
/// Internally tagged by `type`; payload fields flatten into the event object
/// on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum RecipeEvent {
    /// A blank recipe was created.
    RecipeCreated,
    /// A recipe was imported from an external source in one shot.
    RecipeImported {
        /// Recipe name.
        name: String,
        /// Imported ingredient list.
        ingredients: Vec<IngredientItem>,
        /// Imported instructions.
        instructions: Vec<Instruction>,
        /// Cook time in minutes.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cook_time: Option<u32>,
        /// Preparation time in minutes.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        prep_time: Option<u32>,
        /// Previously uploaded image.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_id: Option<Uuid>,
        /// Where the recipe came from (URL or free text).
        source: String,
        /// Tags assigned during import.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tags: Vec<RecipeTag>,
    },
    /// The recipe was renamed.
    RecipeNameSet {
        /// The new name.
        name: String,
    },
    /// The recipe image was set or replaced.
    RecipeImageSet {
        /// The uploaded image's ID.
        image_id: Uuid,
    },
    /// A heading or ingredient was inserted into the ingredient list.
    RecipeIngredientItemAdded {
        /// New item's ID, chosen by the client.
        item_id: Uuid,
        /// Whether the item is a heading or an ingredient.
        item_type: IngredientItemKind,
        /// Insertion position; appends when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
    },
    /// An ingredient list item was moved to a new position.
    RecipeIngredientItemMoved {
        /// The item to move.
        item_id: Uuid,
        /// Target position.
        index: usize,
    },
    /// An ingredient list item was removed.
    RecipeIngredientItemRemoved {
        /// The item to remove.
        item_id: Uuid,
    },
    /// An ingredient's text fields were replaced.
    RecipeIngredientUpdated {
        /// The ingredient to update; must be an `Ingredient`, not a heading.
        item_id: Uuid,
        /// New name; clears when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// New amount; clears when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amount: Option<String>,
        /// New measurement; clears when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        measurement: Option<Measurement>,
    },
    /// A heading's text was replaced.
    RecipeIngredientHeadingUpdated {
        /// The heading to update; must be a `Heading`, not an ingredient.
        item_id: Uuid,
        /// New heading text.
        name: String,
    },
    /// The full instruction list was replaced.
    RecipeInstructionsSet {
        /// The new instructions.
        instructions: Vec<Instruction>,
    },
    /// Cook time was set or cleared.
    RecipeCookTimeSet {
        /// Minutes; clears when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time: Option<u32>,
    },
    /// Preparation time was set or cleared.
    RecipePrepTimeSet {
        /// Minutes; clears when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time: Option<u32>,
    },
    /// The recipe was cooked.
    RecipeCompleted,
    /// A tag was added.
    RecipeTagAdded {
        /// The tag.
        tag: RecipeTag,
    },
    /// A tag was removed.
    RecipeTagRemoved {
        /// The tag.
        tag: RecipeTag,
    },
    /// The recipe was moved to the bin.
    RecipeDeleted,
    /// The recipe was restored from the bin.
    RecipeRestored,
}

impl RecipeEvent {
    /// The `type` tag string of this event.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            RecipeEvent::RecipeCreated => "RecipeCreated",
            RecipeEvent::RecipeImported { .. } => "RecipeImported",
            RecipeEvent::RecipeNameSet { .. } => "RecipeNameSet",
            RecipeEvent::RecipeImageSet { .. } => "RecipeImageSet",
            RecipeEvent::RecipeIngredientItemAdded { .. } => "RecipeIngredientItemAdded",
            RecipeEvent::RecipeIngredientItemMoved { .. } => "RecipeIngredientItemMoved",
            RecipeEvent::RecipeIngredientItemRemoved { .. } => "RecipeIngredientItemRemoved",
            RecipeEvent::RecipeIngredientUpdated { .. } => "RecipeIngredientUpdated",
            RecipeEvent::RecipeIngredientHeadingUpdated { .. } => {
                "RecipeIngredientHeadingUpdated"
            }
            RecipeEvent::RecipeInstructionsSet { .. } => "RecipeInstructionsSet",
            RecipeEvent::RecipeCookTimeSet { .. } => "RecipeCookTimeSet",
            RecipeEvent::RecipePrepTimeSet { .. } => "RecipePrepTimeSet",
            RecipeEvent::RecipeCompleted => "RecipeCompleted",
            RecipeEvent::RecipeTagAdded { .. } => "RecipeTagAdded",
            RecipeEvent::RecipeTagRemoved { .. } => "RecipeTagRemoved",
            RecipeEvent::RecipeDeleted => "RecipeDeleted",
            RecipeEvent::RecipeRestored => "RecipeRestored",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_matches_type_name() {
        let events = [
            RecipeEvent::RecipeCreated,
            RecipeEvent::RecipeNameSet { name: "x".into() },
            RecipeEvent::RecipeCompleted,
            RecipeEvent::RecipeDeleted,
            RecipeEvent::RecipeRestored,
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], event.type_name());
        }
    }

    #[test]
    fn fields_are_camel_case() {
        let event = RecipeEvent::RecipeIngredientItemAdded {
            item_id: Uuid::new_v4(),
            item_type: IngredientItemKind::Ingredient,
            index: Some(0),
        };
        let value = serde_json::to_value(&event).unwrap();
        assert!(value.get("itemId").is_some());
        assert!(value.get("itemType").is_some());
        assert!(value.get("item_id").is_none());
    }

    #[test]
    fn imported_roundtrip() {
        let event = RecipeEvent::RecipeImported {
            name: "Sourdough".into(),
            ingredients: vec![IngredientItem::Ingredient {
                id: Uuid::new_v4(),
                name: Some("Flour".into()),
                amount: Some("500".into()),
                measurement: Some(Measurement::Gram),
            }],
            instructions: vec![],
            cook_time: Some(45),
            prep_time: None,
            image_id: None,
            source: "https://example.com/sourdough".into(),
            tags: vec![RecipeTag::Bread],
        };
        let json = serde_json::to_string(&event).unwrap();
        let back: RecipeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn optional_index_absent_on_wire() {
        let event = RecipeEvent::RecipeIngredientItemAdded {
            item_id: Uuid::new_v4(),
            item_type: IngredientItemKind::Heading,
            index: None,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("index"));
    }

    #[test]
    fn invalid_uuid_field_is_rejected() {
        let raw = r#"{"type": "RecipeImageSet", "imageId": "not-a-uuid"}"#;
        assert!(serde_json::from_str::<RecipeEvent>(raw).is_err());
    }
}
