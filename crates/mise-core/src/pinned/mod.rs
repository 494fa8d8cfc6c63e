//! Pinned recipes entity domain. The pinned list is a singleton aggregate
//! addressed by [`crate::event::pinned_recipes_id`]; its view is just the
//! ordered list of pinned recipe IDs.

pub mod events;
pub mod validate;
pub mod view;

pub use events::PinnedRecipesEvent;
pub use validate::PinnedRecipesValidation;
