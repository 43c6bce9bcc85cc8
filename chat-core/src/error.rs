//! Errors raised by core operations whose preconditions are not met.

use thiserror::Error;

/// Precondition failures for core operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Identity is missing one of user id, preferred, first or last name.
    #[error("identity is incomplete")]
    IncompleteIdentity,

    /// No channel is connected.
    #[error("not connected")]
    NotConnected,

    /// Neither the live session nor the identity provider yields a user id.
    #[error("current user could not be resolved")]
    NoCurrentUser,
}
