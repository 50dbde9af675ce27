//! Session types: the server's record of one logged-in participant.
//!
//! A session tracks:
//! - WHO the participant is (`name`, unique and immutable)
//! - WHOM they are negotiating with (`peer`, by name, possibly stale)
//! - HOW to reach them (`connection`, owned by this session alone)

use std::fmt;
use std::sync::Arc;

use parley_transport::{Connection, ConnectionId};

use crate::RegistryError;

/// Longest name a participant may claim, in characters.
pub const MAX_NAME_LEN: usize = 64;

/// Checks that `name` can identify a session.
///
/// # Errors
/// Returns [`RegistryError::InvalidName`] for blank names and names longer
/// than [`MAX_NAME_LEN`] characters.
pub fn validate_name(name: &str) -> Result<(), RegistryError> {
    if name.trim().is_empty() {
        return Err(RegistryError::InvalidName("name is empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(RegistryError::InvalidName("name is too long"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// PairingStatus
// ---------------------------------------------------------------------------

/// Where a session stands in the offer/answer exchange.
///
/// ```text
///   Unpaired ──(offer or answer sent)──→ Pairing ──(counterpart points back)──→ Paired
/// ```
///
/// Derived from the `peer` fields of both sides; it is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingStatus {
    /// No peer recorded.
    Unpaired,
    /// A peer is recorded, but it does not point back (or has left).
    Pairing,
    /// Both sessions are live and name each other.
    Paired,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A single participant's session.
///
/// Values handed out by the registry are snapshots: mutating a returned
/// `Session` does not change the registry.
pub struct Session<C> {
    name: String,
    pub(crate) peer: Option<String>,
    pub(crate) announced: bool,
    connection: Arc<C>,
}

impl<C: Connection> Session<C> {
    pub(crate) fn new(name: String, connection: Arc<C>) -> Self {
        Self {
            name,
            peer: None,
            announced: false,
            connection,
        }
    }

    /// The participant's public identity.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name this session is currently negotiating with, if any.
    ///
    /// The named session may have left; resolve it before use.
    pub fn peer(&self) -> Option<&str> {
        self.peer.as_deref()
    }

    /// Whether the client has been told its login succeeded. Roster
    /// broadcasts skip the session until then.
    pub fn is_announced(&self) -> bool {
        self.announced
    }

    /// The connection this session owns.
    pub fn connection(&self) -> &Arc<C> {
        &self.connection
    }

    /// Shorthand for `self.connection().id()`.
    pub fn connection_id(&self) -> ConnectionId {
        self.connection.id()
    }
}

impl<C> Clone for Session<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            peer: self.peer.clone(),
            announced: self.announced,
            connection: Arc::clone(&self.connection),
        }
    }
}

impl<C: Connection> fmt::Debug for Session<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.name)
            .field("peer", &self.peer)
            .field("announced", &self.announced)
            .field("connection", &self.connection.id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_name_accepts_ordinary_names() {
        assert!(validate_name("alice").is_ok());
        assert!(validate_name("Bob Smith").is_ok());
        assert!(validate_name(&"x".repeat(MAX_NAME_LEN)).is_ok());
    }

    #[test]
    fn test_validate_name_rejects_blank() {
        assert!(matches!(
            validate_name(""),
            Err(RegistryError::InvalidName(_))
        ));
        assert!(matches!(
            validate_name("   "),
            Err(RegistryError::InvalidName(_))
        ));
    }

    #[test]
    fn test_validate_name_counts_chars_not_bytes() {
        // 64 two-byte characters is still within the limit.
        assert!(validate_name(&"é".repeat(MAX_NAME_LEN)).is_ok());
        assert!(validate_name(&"é".repeat(MAX_NAME_LEN + 1)).is_err());
    }
}
