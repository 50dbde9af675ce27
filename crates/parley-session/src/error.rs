//! Error types for the session layer.

use parley_transport::ConnectionId;

/// Errors returned by [`SessionRegistry`](crate::SessionRegistry) operations.
///
/// None of these mutate the registry: a failed operation leaves every
/// session exactly as it was.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// The name is already held by a live session.
    #[error("name {0:?} is already registered")]
    DuplicateName(String),

    /// The name is not acceptable as a session identity.
    #[error("invalid name: {0}")]
    InvalidName(&'static str),

    /// The connection already owns a session.
    #[error("{0} already owns session {1:?}")]
    ConnectionBound(ConnectionId, String),

    /// No live session has this name.
    #[error("no session named {0:?}")]
    UnknownSession(String),
}
