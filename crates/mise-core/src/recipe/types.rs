//! Value types shared by recipe events and the recipe view.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of ingredient measurements.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Measurement {
    /// Teaspoon (tsp).
    Teaspoon,
    /// Tablespoon (tbsp).
    Tablespoon,
    /// Cup.
    Cup,
    /// Millilitre.
    Millilitre,
    /// Litre.
    Litre,
    /// Gram.
    Gram,
    /// Pound.
    Pound,
    /// Ounce.
    Ounce,
}

/// Closed set of recipe tags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RecipeTag {
    /// Baking.
    Baking,
    /// Bread.
    Bread,
    /// Breakfast.
    Breakfast,
    /// Main course.
    Main,
    /// Pasta.
    Pasta,
    /// Pudding.
    Pudding,
    /// Salad.
    Salad,
    /// Side dish.
    Side,
    /// Soup.
    Soup,
    /// Vegetarian.
    Vegetarian,
}

/// Discriminates the two kinds of entries in the ingredient list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IngredientItemKind {
    /// A section heading within the ingredient list.
    Heading,
    /// An actual ingredient.
    Ingredient,
}

/// One entry in a recipe's ingredient list: either a section heading or an
/// ingredient. Headings and ingredients interleave in a single ordered list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum IngredientItem {
    /// A section heading.
    Heading {
        /// Item identifier, unique within the recipe.
        id: Uuid,
        /// Heading text.
        name: String,
    },
    /// An ingredient line.
    Ingredient {
        /// Item identifier, unique within the recipe.
        id: Uuid,
        /// Ingredient name, absent while still being typed.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        /// Free-form amount (kept as entered, e.g. `"1 1/2"`).
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amount: Option<String>,
        /// Unit of measurement.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        measurement: Option<Measurement>,
    },
}

impl IngredientItem {
    /// The item's identifier.
    #[must_use]
    pub fn id(&self) -> Uuid {
        match self {
            IngredientItem::Heading { id, .. } | IngredientItem::Ingredient { id, .. } => *id,
        }
    }

    /// Which kind of entry this is.
    #[must_use]
    pub fn item_kind(&self) -> IngredientItemKind {
        match self {
            IngredientItem::Heading { .. } => IngredientItemKind::Heading,
            IngredientItem::Ingredient { .. } => IngredientItemKind::Ingredient,
        }
    }
}

/// One span of an instruction: styled text, or an inline reference to an
/// ingredient by item ID (rendered as the ingredient's current text).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InstructionSpan {
    /// A run of styled text.
    Text {
        /// The text content.
        text: String,
        /// Bold styling.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        bold: Option<bool>,
        /// Italic styling.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        italic: Option<bool>,
    },
    /// A reference to an ingredient item.
    IngredientRef {
        /// The referenced ingredient item ID.
        at: Uuid,
    },
}

/// A single instruction, as an ordered list of spans.
pub type Instruction = Vec<InstructionSpan>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingredient_item_tagged_serde() {
        let item = IngredientItem::Heading {
            id: Uuid::new_v4(),
            name: "For the dough".into(),
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["type"], "Heading");
        assert_eq!(value["name"], "For the dough");

        let back: IngredientItem = serde_json::from_value(value).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn ingredient_omits_empty_fields() {
        let item = IngredientItem::Ingredient {
            id: Uuid::new_v4(),
            name: None,
            amount: None,
            measurement: None,
        };
        let json = serde_json::to_string(&item).unwrap();
        assert!(!json.contains("name"));
        assert!(!json.contains("amount"));
        assert!(!json.contains("measurement"));
    }

    #[test]
    fn item_kind_accessor() {
        let heading = IngredientItem::Heading {
            id: Uuid::new_v4(),
            name: String::new(),
        };
        assert_eq!(heading.item_kind(), IngredientItemKind::Heading);
    }

    #[test]
    fn instruction_span_text_and_ref() {
        let at = Uuid::new_v4();
        let instruction: Instruction = vec![
            InstructionSpan::Text {
                text: "Fold in the ".into(),
                bold: None,
                italic: None,
            },
            InstructionSpan::IngredientRef { at },
        ];

        let json = serde_json::to_string(&instruction).unwrap();
        let back: Instruction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, instruction);
    }

    #[test]
    fn measurement_serializes_as_name() {
        let json = serde_json::to_string(&Measurement::Tablespoon).unwrap();
        assert_eq!(json, "\"Tablespoon\"");
    }

    #[test]
    fn unknown_tag_is_rejected() {
        assert!(serde_json::from_str::<RecipeTag>("\"Molecular\"").is_err());
    }

    #[test]
    fn tags_sort_alphabetically() {
        let mut tags = vec![RecipeTag::Soup, RecipeTag::Baking, RecipeTag::Main];
        tags.sort();
        assert_eq!(
            tags,
            vec![RecipeTag::Baking, RecipeTag::Main, RecipeTag::Soup]
        );
    }
}
