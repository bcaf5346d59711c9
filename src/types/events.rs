//! Authentication Events
//!
//! Notifications broadcast to listeners when the authenticated state changes.

use crate::types::Session;

/// Authentication state transition.
#[derive(Clone, Debug)]
pub enum AuthEvent {
    /// A session became current (sign-in or restore from storage).
    Ready(Session),
    /// The current session was discarded.
    Cleared,
}

impl AuthEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready(_) => "authReady",
            Self::Cleared => "authCleared",
        }
    }
}
