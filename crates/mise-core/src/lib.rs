//! # mise-core
//!
//! Shared data model for the mise sync engine, used by both the server and
//! the client:
//!
//! - **Event model**: the immutable [`event::Event`] unit of change with its
//!   camelCase wire shape, branded IDs, and the two-tier canonical ordering
//! - **Entity domains**: typed event enums, validation state machines, and
//!   view reducers for the three entity kinds (recipe, shopping list,
//!   pinned recipes)
//! - **API types**: the transport-agnostic request/response envelope and the
//!   `addEvents` / `syncEvents` / `ping` payload shapes

#![deny(unsafe_code)]

pub mod api;
pub mod errors;
pub mod event;
pub mod ids;
pub mod pinned;
pub mod recipe;
pub mod shopping_list;
pub mod time;
pub mod validate;
pub mod view;

pub use errors::ValidationError;
pub use event::{EntityKind, Event, EventPayload, order_events};
pub use ids::{EntityId, EventId};
pub use validate::ValidationState;
pub use view::View;
