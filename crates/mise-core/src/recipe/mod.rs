//! Recipe entity domain: typed events, validation state machine, and the
//! materialized recipe view.

pub mod events;
pub mod types;
pub mod validate;
pub mod view;

pub use events::RecipeEvent;
pub use types::{IngredientItem, IngredientItemKind, Instruction, Measurement, RecipeTag};
pub use validate::RecipeValidation;
pub use view::Recipe;
