//! Validation error type shared by the entity state machines.

use thiserror::Error;

/// An event was rejected by an entity validation state machine.
///
/// The message is human-readable and is surfaced verbatim to clients in the
/// per-event failure list, so it should describe the rule that was violated.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Why the event is illegal given the entity's current state.
    pub message: String,
}

impl ValidationError {
    /// Create a validation error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
