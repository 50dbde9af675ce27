//! Unified error type for the relay.

use parley_protocol::ProtocolError;
use parley_session::RegistryError;
use parley_transport::{ConnectionId, TransportError};

/// Top-level error that wraps all crate-specific errors plus the failures
/// a signaling handler can hit.
///
/// Only [`RelayError::Transport`] is fatal to the connection it happened on;
/// every other variant ends the handling of a single inbound frame.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Reading from or writing to the sender's own connection failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A frame could not be decoded, or a reply could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A registry operation was refused.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A frame other than `login` arrived on a connection with no session.
    #[error("{0} sent a message before logging in")]
    UnregisteredSender(ConnectionId),

    /// The target name has no live session.
    #[error("no session named {0:?} to deliver to")]
    UnknownPeer(String),

    /// Forwarding to another session's connection failed.
    #[error("delivery to {to:?} failed: {source}")]
    Delivery {
        to: String,
        #[source]
        source: TransportError,
    },
}

impl RelayError {
    /// Returns `true` if the error means the sender's own connection is
    /// unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
