//! Shopping list entity domain: typed events, validation state machine, and
//! the materialized list view. The list is a singleton aggregate addressed
//! by [`crate::event::shopping_list_id`].

pub mod events;
pub mod validate;
pub mod view;

pub use events::ShoppingListEvent;
pub use validate::ShoppingListValidation;
pub use view::{ListItem, ShoppingList};
